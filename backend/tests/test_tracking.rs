//! Entity tracker tests
//!
//! Position lookup over a three stage pipeline [10, 20, 15] and the status
//! classification against the default 20/50 tolerances.

use journey_sim_core::{
    EntitySpec, EntityStatus, EntityTracker, Entity, PipelineError, Stage, StageMetrics,
    StagePipeline, TrackingConfig,
};
use proptest::prelude::*;

fn metrics(wait: f64) -> StageMetrics {
    StageMetrics {
        throughput_per_hour: 300.0,
        wait_time_minutes: wait,
        efficiency_percent: 80.0,
    }
}

fn pipeline() -> StagePipeline {
    StagePipeline::new(vec![
        Stage::new("a", "Stage A", 10.0, metrics(5.0)),
        Stage::new("b", "Stage B", 20.0, metrics(5.0)),
        Stage::new("c", "Stage C", 15.0, metrics(5.0)),
    ])
}

fn entity(pace: f64) -> Entity {
    Entity::from_spec(&EntitySpec::new("e-1", "standard").with_pace(pace))
}

fn tracker() -> EntityTracker {
    EntityTracker::new(TrackingConfig::default())
}

#[test]
fn test_position_mid_second_stage() {
    let position = tracker().locate(&entity(1.0), &pipeline(), 25.0).unwrap();

    assert_eq!(position.stage_index, 1);
    assert_eq!(position.elapsed_in_stage, 15.0);
    assert_eq!(position.total_elapsed, 25.0);
    assert_eq!(position.status, EntityStatus::OnTrack);
}

#[test]
fn test_stage_boundary_belongs_to_next_stage() {
    let position = tracker().locate(&entity(1.0), &pipeline(), 10.0).unwrap();
    assert_eq!(position.stage_index, 1);
    assert_eq!(position.elapsed_in_stage, 0.0);
}

#[test]
fn test_end_of_journey_stays_on_last_stage() {
    let tracker = tracker();
    let pipeline = pipeline();

    let at_end = tracker.locate(&entity(1.0), &pipeline, 45.0).unwrap();
    assert_eq!(at_end.stage_index, 2);
    assert_eq!(at_end.elapsed_in_stage, 15.0);

    let past_end = tracker.locate(&entity(1.0), &pipeline, 60.0).unwrap();
    assert_eq!(past_end.stage_index, 2);
}

#[test]
fn test_not_started_entity_is_on_track_at_stage_zero() {
    let late = Entity::from_spec(&EntitySpec::new("late", "standard").with_offset(5.0).with_pace(2.0));
    let position = tracker().locate(&late, &pipeline(), 3.0).unwrap();

    assert_eq!(position.stage_index, 0);
    assert_eq!(position.total_elapsed, 0.0);
    assert_eq!(position.status, EntityStatus::OnTrack);
}

#[test]
fn test_offset_shifts_position() {
    let late = Entity::from_spec(&EntitySpec::new("late", "standard").with_offset(5.0));
    let position = tracker().locate(&late, &pipeline(), 25.0).unwrap();
    assert_eq!(position.stage_index, 1);
    assert_eq!(position.elapsed_in_stage, 10.0);
}

#[test]
fn test_status_follows_pace() {
    let tracker = tracker();
    let pipeline = pipeline();
    let status = |pace| tracker.locate(&entity(pace), &pipeline, 20.0).unwrap().status;

    assert_eq!(status(0.9), EntityStatus::OnTrack);
    assert_eq!(status(1.0), EntityStatus::OnTrack);
    assert_eq!(status(1.3), EntityStatus::Delayed);
    assert_eq!(status(1.5), EntityStatus::Delayed);
    assert_eq!(status(1.6), EntityStatus::Critical);
}

#[test]
fn test_congestion_from_excess_wait() {
    let mut stages = pipeline().stages().to_vec();
    stages[0].metrics.wait_time_minutes = 9.0;
    let pipeline = StagePipeline::new(stages);
    let tracker = tracker();

    // 4 excess minutes over 10 elapsed
    let position = tracker.locate(&entity(1.0), &pipeline, 10.0).unwrap();
    assert!((position.overrun_percent - 40.0).abs() < 1e-9);
    assert_eq!(position.status, EntityStatus::Delayed);
    assert!(tracker.flags_stage(&position));

    // Half of stage A traversed: half the excess
    let position = tracker.locate(&entity(1.0), &pipeline, 5.0).unwrap();
    assert!((position.overrun_percent - 40.0).abs() < 1e-9);
}

#[test]
fn test_custom_tolerances() {
    let strict = EntityTracker::new(TrackingConfig {
        delay_tolerance_percent: 5.0,
        critical_tolerance_percent: 10.0,
    });
    let position = strict.locate(&entity(1.2), &pipeline(), 20.0).unwrap();
    assert_eq!(position.status, EntityStatus::Critical);
    assert!(strict.flags_stage(&position));
}

#[test]
fn test_update_reports_changes_once() {
    let tracker = tracker();
    let pipeline = pipeline();
    let mut e = entity(1.3);

    let change = tracker.update(&mut e, &pipeline, 12.0).unwrap();
    assert_eq!(change.stage, Some((0, 1)));
    assert_eq!(change.status, Some((EntityStatus::OnTrack, EntityStatus::Delayed)));
    assert_eq!(e.current_stage_index, 1);

    let again = tracker.update(&mut e, &pipeline, 12.0).unwrap();
    assert_eq!(again.stage, None);
    assert_eq!(again.status, None);
}

#[test]
fn test_empty_pipeline_is_an_error() {
    let empty = StagePipeline::new(Vec::new());
    let result = tracker().locate(&entity(1.0), &empty, 5.0);
    assert!(matches!(result, Err(PipelineError::IndexOutOfRange { .. })));
}

proptest! {
    #[test]
    fn test_index_always_in_range(time in 0.0f64..200.0, pace in 0.5f64..2.0) {
        let pipeline = pipeline();
        let position = tracker().locate(&entity(pace), &pipeline, time).unwrap();
        prop_assert!(position.stage_index < pipeline.len());
        prop_assert!(position.elapsed_in_stage >= 0.0);
    }

    #[test]
    fn test_locate_is_idempotent(time in 0.0f64..45.0) {
        let tracker = tracker();
        let pipeline = pipeline();
        let mut e = entity(1.1);
        tracker.update(&mut e, &pipeline, time).unwrap();
        let first = e.clone();
        tracker.update(&mut e, &pipeline, time).unwrap();
        prop_assert_eq!(first, e);
    }
}
