//! Simulation clock for playback
//!
//! The simulation timeline is a single minute counter advanced in discrete
//! ticks. One second of tick interval corresponds to one simulated minute
//! at speed 1.0, so a tick of `interval_seconds` advances the timeline by
//! `interval_seconds * speed` minutes.
//!
//! # State machine
//!
//! ```text
//!            start()              tick() at end (StopAtEnd)
//! Stopped ───────────▶ Running ────────────────────────────▶ Finished
//!    ▲                   │  ▲                                   │
//!    │     pause()       │  │ start()                           │
//!    └───────────────────┘  └──── (Stopped) ◀── reset() ────────┘
//! ```
//!
//! # Cancellation
//!
//! Each `start()` hands out a [`TimerLease`] stamped with the current
//! generation. `pause()` and `reset()` bump the generation, so a tick that
//! arrives with an old lease (a timer callback that fired after
//! cancellation) never changes time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by clock control operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    #[error("Invalid speed multiplier {requested}: allowed values are {allowed:?}")]
    InvalidSpeed { requested: f64, allowed: Vec<f64> },
}

/// What happens when the timeline reaches the end of the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Wrap back to minute 0 and keep playing
    #[default]
    Loop,
    /// Clamp at the end and stop in the `Finished` state
    StopAtEnd,
}

/// Clock run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    Stopped,
    Running,
    Finished,
}

/// Proof that the holder was issued by a particular `start()` call.
///
/// Tick sources must present the lease with every tick. A lease goes stale
/// as soon as the clock is paused or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerLease {
    generation: u64,
}

impl TimerLease {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of a tick that actually moved the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockAdvance {
    pub previous_minutes: f64,
    pub current_minutes: f64,
    /// Timeline passed the scenario end and restarted at 0
    pub wrapped: bool,
    /// Timeline reached the end in `StopAtEnd` mode
    pub finished: bool,
}

/// Authoritative simulation time for one session
///
/// # Example
/// ```
/// use journey_sim_core::SimClock;
///
/// let mut clock = SimClock::new(45.0, vec![0.5, 1.0, 2.0, 4.0]);
/// let lease = clock.start();
/// clock.tick(lease, 5.0);
/// assert_eq!(clock.time_minutes(), 5.0);
///
/// clock.set_speed(2.0).unwrap();
/// clock.tick(lease, 5.0);
/// assert_eq!(clock.time_minutes(), 15.0);
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    time_minutes: f64,
    speed: f64,
    total_duration_minutes: f64,
    allowed_speeds: Vec<f64>,
    state: ClockState,
    generation: u64,
    mode: PlaybackMode,
}

impl SimClock {
    /// Create a stopped clock at minute 0 and speed 1.0.
    ///
    /// If 1.0 is not among `allowed_speeds`, the smallest allowed speed is
    /// used instead.
    ///
    /// # Panics
    /// Panics if `total_duration_minutes` is not positive. Scenario
    /// validation rejects such scenarios before a clock is built.
    pub fn new(total_duration_minutes: f64, allowed_speeds: Vec<f64>) -> Self {
        assert!(
            total_duration_minutes > 0.0,
            "total_duration_minutes must be positive"
        );
        let speed = if allowed_speeds.iter().any(|s| *s == 1.0) || allowed_speeds.is_empty() {
            1.0
        } else {
            allowed_speeds
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min)
        };
        Self {
            time_minutes: 0.0,
            speed,
            total_duration_minutes,
            allowed_speeds,
            state: ClockState::Stopped,
            generation: 0,
            mode: PlaybackMode::Loop,
        }
    }

    pub fn with_mode(mut self, mode: PlaybackMode) -> Self {
        self.mode = mode;
        self
    }

    /// Begin advancing time.
    ///
    /// Calling `start()` while already running keeps the current generation
    /// and returns the lease that is already live. Starting a finished clock
    /// returns a lease too, but ticks stay no-ops until `reset()`.
    pub fn start(&mut self) -> TimerLease {
        if self.state == ClockState::Stopped {
            self.state = ClockState::Running;
        }
        TimerLease {
            generation: self.generation,
        }
    }

    /// Stop advancing time and invalidate outstanding leases.
    ///
    /// Time is retained exactly.
    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Stopped;
            self.generation += 1;
        }
    }

    /// Return to minute 0, stopped, and invalidate outstanding leases.
    pub fn reset(&mut self) {
        self.time_minutes = 0.0;
        self.state = ClockState::Stopped;
        self.generation += 1;
    }

    /// Change the playback speed.
    ///
    /// The multiplier must be positive and one of the scenario's allowed
    /// speeds; otherwise the speed is left unchanged.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), ClockError> {
        let allowed = multiplier > 0.0
            && multiplier.is_finite()
            && self.allowed_speeds.iter().any(|s| *s == multiplier);
        if !allowed {
            return Err(ClockError::InvalidSpeed {
                requested: multiplier,
                allowed: self.allowed_speeds.clone(),
            });
        }
        self.speed = multiplier;
        Ok(())
    }

    /// Advance by `interval_seconds * speed` minutes.
    ///
    /// Returns `None` (and leaves time untouched) when the clock is not
    /// running or the lease is stale.
    pub fn tick(&mut self, lease: TimerLease, interval_seconds: f64) -> Option<ClockAdvance> {
        if self.state != ClockState::Running || lease.generation != self.generation {
            return None;
        }
        if interval_seconds.is_nan() || interval_seconds <= 0.0 {
            return None;
        }

        let previous = self.time_minutes;
        let next = previous + interval_seconds * self.speed;

        let mut advance = ClockAdvance {
            previous_minutes: previous,
            current_minutes: next,
            wrapped: false,
            finished: false,
        };

        match self.mode {
            PlaybackMode::Loop if next > self.total_duration_minutes => {
                advance.current_minutes = 0.0;
                advance.wrapped = true;
            }
            PlaybackMode::StopAtEnd if next >= self.total_duration_minutes => {
                advance.current_minutes = self.total_duration_minutes;
                advance.finished = true;
                self.state = ClockState::Finished;
                self.generation += 1;
            }
            _ => {}
        }

        self.time_minutes = advance.current_minutes;
        Some(advance)
    }

    pub fn time_minutes(&self) -> f64 {
        self.time_minutes
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.total_duration_minutes
    }

    pub fn allowed_speeds(&self) -> &[f64] {
        &self.allowed_speeds
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Generation of the currently valid lease
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
