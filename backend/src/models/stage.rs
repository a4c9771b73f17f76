//! Processing stages
//!
//! A stage is one ordered step of the modeled journey (check-in, security,
//! boarding, ...). Stages carry their current performance metrics, the
//! metrics they were loaded with, and at most one applied intervention.
//!
//! # Status transitions
//!
//! ```text
//! Pending → Active → Completed
//!                 ↘ Delayed → Completed
//! ```
//!
//! A stage never moves backwards. The only way back to `Pending` is an
//! explicit restart, which the session performs on reset or when the
//! timeline loops.

use crate::models::intervention::InterventionRecord;
use serde::{Deserialize, Serialize};

/// Performance metrics of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub throughput_per_hour: f64,
    pub wait_time_minutes: f64,
    pub efficiency_percent: f64,
}

/// Lifecycle status of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Delayed,
}

impl StageStatus {
    /// Check whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same status is always legal.
    ///
    /// # Example
    /// ```
    /// use journey_sim_core::models::StageStatus;
    ///
    /// assert!(StageStatus::Pending.can_transition_to(StageStatus::Active));
    /// assert!(StageStatus::Delayed.can_transition_to(StageStatus::Completed));
    /// assert!(!StageStatus::Completed.can_transition_to(StageStatus::Active));
    /// ```
    pub fn can_transition_to(self, next: StageStatus) -> bool {
        use StageStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Active, Active)
                | (Completed, Completed)
                | (Delayed, Delayed)
                | (Pending, Active)
                | (Active, Completed)
                | (Active, Delayed)
                | (Delayed, Completed)
        )
    }
}

/// One ordered step of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub base_duration_minutes: f64,
    #[serde(default)]
    pub status: StageStatus,
    pub metrics: StageMetrics,

    /// Metrics as loaded, before any intervention.
    ///
    /// Filled from `metrics` when the scenario is loaded if absent.
    #[serde(default)]
    pub baseline_metrics: Option<StageMetrics>,

    #[serde(default)]
    pub intervention: Option<InterventionRecord>,
}

impl Stage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_duration_minutes: f64,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_duration_minutes,
            status: StageStatus::Pending,
            metrics,
            baseline_metrics: Some(metrics),
            intervention: None,
        }
    }

    /// Metrics the stage started the session with
    pub fn baseline(&self) -> StageMetrics {
        self.baseline_metrics.unwrap_or(self.metrics)
    }

    /// Freeze the current metrics as the baseline if none was recorded
    pub fn capture_baseline(&mut self) {
        if self.baseline_metrics.is_none() {
            self.baseline_metrics = Some(self.metrics);
        }
    }

    /// Extra queueing minutes relative to the baseline (never negative)
    pub fn excess_wait_minutes(&self) -> f64 {
        (self.metrics.wait_time_minutes - self.baseline().wait_time_minutes).max(0.0)
    }

    /// Move to `next` if the transition is legal.
    ///
    /// Returns true if the status changed.
    pub fn transition_to(&mut self, next: StageStatus) -> bool {
        if self.status == next || !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Put the stage back to `Pending` for a new run of the timeline
    pub fn restart(&mut self) {
        self.status = StageStatus::Pending;
    }
}
