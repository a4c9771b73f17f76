//! Simulation clock tests
//!
//! Covers advancement under speed multipliers, pause/resume, speed
//! validation and the two end-of-timeline behaviours.

use journey_sim_core::{ClockError, ClockState, PlaybackMode, SimClock};
use proptest::prelude::*;

const SPEEDS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

fn clock(total: f64) -> SimClock {
    SimClock::new(total, SPEEDS.to_vec())
}

// ============================================================================
// Advancement
// ============================================================================

proptest! {
    #[test]
    fn test_time_is_ticks_times_interval_times_speed(
        ticks in 0usize..60,
        interval in prop::sample::select(vec![0.25, 0.5, 1.0]),
        speed in prop::sample::select(SPEEDS.to_vec()),
    ) {
        let mut clock = clock(1_000.0);
        clock.set_speed(speed).unwrap();
        let lease = clock.start();
        for _ in 0..ticks {
            clock.tick(lease, interval).unwrap();
        }
        let expected = ticks as f64 * interval * speed;
        prop_assert!((clock.time_minutes() - expected).abs() < 1e-9);
        prop_assert!(clock.time_minutes() <= clock.total_duration_minutes());
    }

    #[test]
    fn test_time_never_exceeds_total(
        ticks in 1usize..200,
        speed in prop::sample::select(SPEEDS.to_vec()),
        stop_at_end in any::<bool>(),
    ) {
        let mode = if stop_at_end { PlaybackMode::StopAtEnd } else { PlaybackMode::Loop };
        let mut clock = clock(45.0).with_mode(mode);
        clock.set_speed(speed).unwrap();
        let lease = clock.start();
        for _ in 0..ticks {
            clock.tick(lease, 1.0);
            prop_assert!(clock.time_minutes() >= 0.0);
            prop_assert!(clock.time_minutes() <= 45.0);
        }
    }
}

#[test]
fn test_starts_stopped_at_zero() {
    let clock = clock(80.0);
    assert_eq!(clock.time_minutes(), 0.0);
    assert_eq!(clock.state(), ClockState::Stopped);
    assert_eq!(clock.speed(), 1.0);
}

#[test]
fn test_tick_while_stopped_is_noop() {
    let mut clock = clock(80.0);
    let lease = clock.start();
    clock.pause();

    assert!(clock.tick(lease, 1.0).is_none());
    assert_eq!(clock.time_minutes(), 0.0);
}

#[test]
fn test_pause_keeps_time_and_resume_continues() {
    let mut clock = clock(80.0);
    let lease = clock.start();
    clock.tick(lease, 1.0);
    clock.tick(lease, 1.0);
    clock.pause();
    assert_eq!(clock.time_minutes(), 2.0);

    let lease = clock.start();
    clock.tick(lease, 1.0);
    assert_eq!(clock.time_minutes(), 3.0);
}

#[test]
fn test_start_twice_keeps_same_lease() {
    let mut clock = clock(80.0);
    let first = clock.start();
    let second = clock.start();
    assert_eq!(first, second);
}

#[test]
fn test_reset_invalidates_running_timer() {
    let mut clock = clock(80.0);
    let lease = clock.start();
    clock.tick(lease, 5.0);
    clock.reset();

    assert_eq!(clock.time_minutes(), 0.0);
    assert_eq!(clock.state(), ClockState::Stopped);
    clock.start();
    assert!(clock.tick(lease, 1.0).is_none());
}

// ============================================================================
// Speed
// ============================================================================

#[test]
fn test_rejects_speed_outside_allowed_set() {
    let mut clock = clock(80.0);
    clock.set_speed(2.0).unwrap();

    let err = clock.set_speed(3.0).unwrap_err();
    assert_eq!(
        err,
        ClockError::InvalidSpeed {
            requested: 3.0,
            allowed: SPEEDS.to_vec(),
        }
    );
    assert_eq!(clock.speed(), 2.0);
}

#[test]
fn test_rejects_non_positive_speed() {
    let mut clock = SimClock::new(80.0, vec![0.0, 1.0]);
    assert!(clock.set_speed(0.0).is_err());
    assert!(clock.set_speed(-1.0).is_err());
    assert!(clock.set_speed(f64::NAN).is_err());
    assert_eq!(clock.speed(), 1.0);
}

#[test]
fn test_speed_change_applies_from_next_tick() {
    let mut clock = clock(80.0);
    let lease = clock.start();
    clock.tick(lease, 1.0);
    clock.set_speed(4.0).unwrap();
    clock.tick(lease, 1.0);
    assert_eq!(clock.time_minutes(), 5.0);
}

// ============================================================================
// End of timeline
// ============================================================================

#[test]
fn test_reaching_total_exactly_does_not_wrap() {
    let mut clock = clock(10.0);
    clock.set_speed(2.0).unwrap();
    let lease = clock.start();
    for _ in 0..5 {
        let advance = clock.tick(lease, 1.0).unwrap();
        assert!(!advance.wrapped);
    }
    assert_eq!(clock.time_minutes(), 10.0);

    let advance = clock.tick(lease, 1.0).unwrap();
    assert!(advance.wrapped);
    assert_eq!(advance.previous_minutes, 10.0);
    assert_eq!(clock.time_minutes(), 0.0);
    assert!(clock.is_running());
}

#[test]
fn test_loop_wraps_to_zero_not_remainder() {
    let mut clock = clock(10.0);
    clock.set_speed(4.0).unwrap();
    let lease = clock.start();
    clock.tick(lease, 1.0);
    clock.tick(lease, 1.0);
    let advance = clock.tick(lease, 1.0).unwrap();

    assert!(advance.wrapped);
    assert_eq!(advance.current_minutes, 0.0);
}

#[test]
fn test_stop_at_end_clamps_and_needs_reset() {
    let mut clock = clock(10.0).with_mode(PlaybackMode::StopAtEnd);
    clock.set_speed(4.0).unwrap();
    let lease = clock.start();
    clock.tick(lease, 2.0);
    let advance = clock.tick(lease, 2.0).unwrap();

    assert!(advance.finished);
    assert!(!advance.wrapped);
    assert_eq!(clock.time_minutes(), 10.0);
    assert_eq!(clock.state(), ClockState::Finished);

    clock.reset();
    let lease = clock.start();
    assert!(clock.tick(lease, 1.0).is_some());
    assert_eq!(clock.time_minutes(), 4.0);
}

#[test]
fn test_stop_at_end_finishes_on_exact_landing() {
    let mut clock = clock(80.0).with_mode(PlaybackMode::StopAtEnd);
    let lease = clock.start();
    for _ in 0..79 {
        assert!(!clock.tick(lease, 1.0).unwrap().finished);
    }

    let advance = clock.tick(lease, 1.0).unwrap();
    assert!(advance.finished);
    assert_eq!(advance.current_minutes, 80.0);
    assert_eq!(clock.state(), ClockState::Finished);
    assert!(clock.tick(lease, 1.0).is_none());
}
