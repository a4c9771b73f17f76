//! Stage pipeline
//!
//! Ordered, fixed list of stages for one scenario. The order never changes
//! after load; only stage metrics, statuses and intervention records do.
//!
//! # Critical Invariants
//!
//! 1. Stage order is fixed for the lifetime of the pipeline
//! 2. Every `base_duration_minutes` is positive
//! 3. Stage ids are unique

use crate::models::stage::Stage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Stage index {index} out of range for pipeline of {len} stages")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Stage not found: {0}")]
    UnknownStage(String),
}

/// Ordered stage list with accessor behavior
///
/// # Example
/// ```
/// use journey_sim_core::models::{Stage, StageMetrics, StagePipeline};
///
/// let m = StageMetrics { throughput_per_hour: 100.0, wait_time_minutes: 5.0, efficiency_percent: 80.0 };
/// let pipeline = StagePipeline::new(vec![
///     Stage::new("checkin", "Check-in", 10.0, m),
///     Stage::new("security", "Security", 20.0, m),
///     Stage::new("boarding", "Boarding", 15.0, m),
/// ]);
///
/// assert_eq!(pipeline.cumulative_duration_before(2).unwrap(), 30.0);
/// assert_eq!(pipeline.stage_index_at(25.0), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePipeline {
    stages: Vec<Stage>,
}

impl StagePipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stage> {
        self.stages.iter_mut()
    }

    pub fn get_stage(&self, index: usize) -> Result<&Stage, PipelineError> {
        let len = self.stages.len();
        self.stages
            .get(index)
            .ok_or(PipelineError::IndexOutOfRange { index, len })
    }

    pub(crate) fn get_stage_mut(&mut self, index: usize) -> Result<&mut Stage, PipelineError> {
        let len = self.stages.len();
        self.stages
            .get_mut(index)
            .ok_or(PipelineError::IndexOutOfRange { index, len })
    }

    pub fn stage_index(&self, stage_id: &str) -> Result<usize, PipelineError> {
        self.stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or_else(|| PipelineError::UnknownStage(stage_id.to_string()))
    }

    /// Sum of base durations of stages `[0, index)`.
    ///
    /// `index == len` is accepted and yields the full pipeline duration.
    pub fn cumulative_duration_before(&self, index: usize) -> Result<f64, PipelineError> {
        if index > self.stages.len() {
            return Err(PipelineError::IndexOutOfRange {
                index,
                len: self.stages.len(),
            });
        }
        Ok(self.stages[..index]
            .iter()
            .map(|s| s.base_duration_minutes)
            .sum())
    }

    /// Sum of all base durations
    pub fn total_base_duration(&self) -> f64 {
        self.stages.iter().map(|s| s.base_duration_minutes).sum()
    }

    /// Greatest stage index whose cumulative start time is `<= elapsed`.
    ///
    /// Elapsed time past the end of the pipeline stays on the last stage.
    /// Returns 0 for an empty pipeline.
    pub fn stage_index_at(&self, elapsed_minutes: f64) -> usize {
        let mut cumulative = 0.0;
        let mut index = 0;
        for (i, stage) in self.stages.iter().enumerate() {
            if cumulative <= elapsed_minutes {
                index = i;
            } else {
                break;
            }
            cumulative += stage.base_duration_minutes;
        }
        index
    }
}
