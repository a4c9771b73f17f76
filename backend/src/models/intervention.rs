//! Intervention catalog types
//!
//! A catalog entry describes an intervention that can be applied to one
//! stage and the effect it has on that stage's metrics. Once applied, the
//! stage keeps an [`InterventionRecord`] for provenance.

use crate::models::stage::StageMetrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    Optimization,
    Alert,
    Prediction,
    Automation,
}

/// Declared effect of an intervention on stage metrics
///
/// All deltas default to zero, so a catalog entry only needs to name the
/// metrics it changes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionEffect {
    /// Added to efficiency, result clamped to [0, 100]
    pub efficiency_delta_points: f64,
    /// Added to wait time, result clamped at 0
    pub wait_time_delta_minutes: f64,
    /// Relative throughput change, e.g. 15.0 for +15%
    pub throughput_delta_percent: f64,
}

impl InterventionEffect {
    /// Metrics after applying this effect to `metrics`
    ///
    /// # Example
    /// ```
    /// use journey_sim_core::models::{InterventionEffect, StageMetrics};
    ///
    /// let effect = InterventionEffect {
    ///     efficiency_delta_points: 30.0,
    ///     wait_time_delta_minutes: -10.0,
    ///     throughput_delta_percent: 50.0,
    /// };
    /// let before = StageMetrics {
    ///     throughput_per_hour: 100.0,
    ///     wait_time_minutes: 6.0,
    ///     efficiency_percent: 85.0,
    /// };
    /// let after = effect.apply_to(&before);
    /// assert_eq!(after.efficiency_percent, 100.0);
    /// assert_eq!(after.wait_time_minutes, 0.0);
    /// assert_eq!(after.throughput_per_hour, 150.0);
    /// ```
    pub fn apply_to(&self, metrics: &StageMetrics) -> StageMetrics {
        StageMetrics {
            throughput_per_hour: (metrics.throughput_per_hour
                * (1.0 + self.throughput_delta_percent / 100.0))
                .max(0.0),
            wait_time_minutes: (metrics.wait_time_minutes + self.wait_time_delta_minutes).max(0.0),
            efficiency_percent: (metrics.efficiency_percent + self.efficiency_delta_points)
                .clamp(0.0, 100.0),
        }
    }
}

/// An intervention available for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub stage_id: String,
    pub intervention_type: InterventionType,
    pub description: String,
    pub impact_description: String,
    pub confidence_percent: f64,
    #[serde(default)]
    pub effect: InterventionEffect,
}

impl CatalogEntry {
    /// Provenance record for this entry applied at `time_minutes`
    pub fn record(&self, time_minutes: f64) -> InterventionRecord {
        InterventionRecord {
            intervention_id: self.id.clone(),
            intervention_type: self.intervention_type,
            description: self.description.clone(),
            impact_description: self.impact_description.clone(),
            confidence_percent: self.confidence_percent,
            applied_at_minutes: time_minutes,
        }
    }
}

/// Intervention attached to a stage once applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub intervention_id: String,
    pub intervention_type: InterventionType,
    pub description: String,
    pub impact_description: String,
    pub confidence_percent: f64,
    pub applied_at_minutes: f64,
}

/// Lookup of available interventions keyed by stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterventionCatalog {
    entries: Vec<CatalogEntry>,
}

impl InterventionCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// All interventions applicable to `stage_id`. Empty is a valid answer.
    pub fn interventions_for(&self, stage_id: &str) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.stage_id == stage_id)
            .collect()
    }

    pub fn find(&self, stage_id: &str, intervention_id: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.stage_id == stage_id && entry.id == intervention_id)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
