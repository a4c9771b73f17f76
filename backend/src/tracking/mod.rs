//! Entity tracker
//!
//! Maps the clock's current time to each entity's position in the stage
//! pipeline and derives its status.
//!
//! # Algorithm
//!
//! For an entity with start offset `o` and pace factor `p` at time `t`:
//!
//! ```text
//! elapsed  = max(0, t - o)
//! index    = greatest i with cumulative_duration_before(i) <= elapsed
//! expected = elapsed
//! actual   = elapsed * p + Σ congestion(j) for visited stages j
//! ```
//!
//! `congestion(j)` is the stage's wait time above its baseline, prorated by
//! how much of stage `j` the entity has traversed. An entity that has not
//! started yet is always on track.
//!
//! Recomputation is a pure function of (time, pipeline, entity parameters),
//! so it can run on every tick without drift and is idempotent.

use crate::config::TrackingConfig;
use crate::models::entity::{Entity, EntityStatus};
use crate::models::pipeline::{PipelineError, StagePipeline};

/// Derived position of one entity at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub stage_index: usize,
    pub elapsed_in_stage: f64,
    pub total_elapsed: f64,
    pub status: EntityStatus,
    /// Percent by which actual exceeds expected (0 when on track)
    pub overrun_percent: f64,
}

/// Change produced by applying a position to an entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityChange {
    pub stage: Option<(usize, usize)>,
    pub status: Option<(EntityStatus, EntityStatus)>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityTracker {
    config: TrackingConfig,
}

impl EntityTracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Compute where `entity` is at `time_minutes`. Does not mutate anything.
    pub fn locate(
        &self,
        entity: &Entity,
        pipeline: &StagePipeline,
        time_minutes: f64,
    ) -> Result<Position, PipelineError> {
        let elapsed = (time_minutes - entity.start_offset_minutes).max(0.0);
        let stage_index = pipeline.stage_index_at(elapsed);
        let stage_start = pipeline.cumulative_duration_before(stage_index)?;
        let elapsed_in_stage = elapsed - stage_start;

        if elapsed <= 0.0 {
            return Ok(Position {
                stage_index,
                elapsed_in_stage,
                total_elapsed: elapsed,
                status: EntityStatus::OnTrack,
                overrun_percent: 0.0,
            });
        }

        let mut congestion = 0.0;
        for j in 0..=stage_index {
            let stage = pipeline.get_stage(j)?;
            let traversed = if j < stage_index {
                1.0
            } else {
                (elapsed_in_stage / stage.base_duration_minutes).clamp(0.0, 1.0)
            };
            congestion += stage.excess_wait_minutes() * traversed;
        }

        let expected = elapsed;
        let actual = elapsed * entity.pace_factor + congestion;
        let overrun_percent = ((actual - expected) / expected * 100.0).max(0.0);

        Ok(Position {
            stage_index,
            elapsed_in_stage,
            total_elapsed: elapsed,
            status: self.classify(overrun_percent),
            overrun_percent,
        })
    }

    fn classify(&self, overrun_percent: f64) -> EntityStatus {
        if overrun_percent <= 0.0 {
            EntityStatus::OnTrack
        } else if overrun_percent <= self.config.critical_tolerance_percent {
            EntityStatus::Delayed
        } else {
            EntityStatus::Critical
        }
    }

    /// Whether a position is far enough over to flag its stage as delayed
    pub fn flags_stage(&self, position: &Position) -> bool {
        position.overrun_percent > self.config.delay_tolerance_percent
    }

    /// Recompute `entity` in place and report what changed.
    pub fn update(
        &self,
        entity: &mut Entity,
        pipeline: &StagePipeline,
        time_minutes: f64,
    ) -> Result<EntityChange, PipelineError> {
        let position = self.locate(entity, pipeline, time_minutes)?;
        let mut change = EntityChange::default();

        if position.stage_index != entity.current_stage_index {
            change.stage = Some((entity.current_stage_index, position.stage_index));
        }
        if position.status != entity.status {
            change.status = Some((entity.status, position.status));
        }

        entity.current_stage_index = position.stage_index;
        entity.elapsed_minutes_in_stage = position.elapsed_in_stage;
        entity.total_elapsed_minutes = position.total_elapsed;
        entity.status = position.status;
        Ok(change)
    }
}
