//! Scenario definitions
//!
//! A scenario is supplied by an external collaborator (configuration file or
//! UI) and loaded once per session. It is the only input the engine needs
//! to build a pipeline, a catalog and an entity set.

use crate::models::entity::{EntitySpec, PopulationConfig};
use crate::models::intervention::{CatalogEntry, InterventionCatalog};
use crate::models::pipeline::StagePipeline;
use crate::models::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("Scenario has no stages")]
    EmptyPipeline,

    #[error("Duplicate stage id: {0}")]
    DuplicateStage(String),

    #[error("Stage {stage} has non-positive base duration {value}")]
    NonPositiveDuration { stage: String, value: f64 },

    #[error("Total duration must be positive, got {0}")]
    NonPositiveTotal(f64),

    #[error("Invalid speed multipliers: {0}")]
    InvalidSpeeds(String),

    #[error("Intervention {intervention} references unknown stage {stage}")]
    UnknownStageInCatalog { intervention: String, stage: String },

    #[error("Intervention {intervention} has confidence {value} outside [0, 100]")]
    InvalidConfidence { intervention: String, value: f64 },

    #[error("Duplicate entity id: {0}")]
    DuplicateEntity(String),

    #[error("Entity {entity} is invalid: {reason}")]
    InvalidEntity { entity: String, reason: String },
}

fn default_speeds() -> Vec<f64> {
    vec![0.5, 1.0, 2.0, 4.0]
}

/// Complete scenario definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub stages: Vec<Stage>,
    pub total_duration_minutes: f64,

    #[serde(default = "default_speeds")]
    pub available_speed_multipliers: Vec<f64>,

    #[serde(default)]
    pub interventions: Vec<CatalogEntry>,

    /// Explicit entities. Combined with `population` when both are given.
    #[serde(default)]
    pub entities: Vec<EntitySpec>,

    #[serde(default)]
    pub population: Option<PopulationConfig>,
}

impl Scenario {
    /// Check structural invariants.
    ///
    /// Stage durations are not required to sum to `total_duration_minutes`;
    /// the total is the loop length of the timeline.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.stages.is_empty() {
            return Err(ScenarioError::EmptyPipeline);
        }

        let mut stage_ids = HashSet::new();
        for stage in &self.stages {
            if !stage_ids.insert(stage.id.as_str()) {
                return Err(ScenarioError::DuplicateStage(stage.id.clone()));
            }
            if !(stage.base_duration_minutes > 0.0 && stage.base_duration_minutes.is_finite()) {
                return Err(ScenarioError::NonPositiveDuration {
                    stage: stage.id.clone(),
                    value: stage.base_duration_minutes,
                });
            }
        }

        if !(self.total_duration_minutes > 0.0 && self.total_duration_minutes.is_finite()) {
            return Err(ScenarioError::NonPositiveTotal(self.total_duration_minutes));
        }

        if self.available_speed_multipliers.is_empty() {
            return Err(ScenarioError::InvalidSpeeds(
                "at least one speed multiplier is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .available_speed_multipliers
            .iter()
            .find(|s| !(**s > 0.0 && s.is_finite()))
        {
            return Err(ScenarioError::InvalidSpeeds(format!(
                "multiplier {} is not positive",
                bad
            )));
        }

        for entry in &self.interventions {
            if !stage_ids.contains(entry.stage_id.as_str()) {
                return Err(ScenarioError::UnknownStageInCatalog {
                    intervention: entry.id.clone(),
                    stage: entry.stage_id.clone(),
                });
            }
            if !(0.0..=100.0).contains(&entry.confidence_percent) {
                return Err(ScenarioError::InvalidConfidence {
                    intervention: entry.id.clone(),
                    value: entry.confidence_percent,
                });
            }
        }

        let mut entity_ids = HashSet::new();
        for spec in self.entity_specs() {
            if !entity_ids.insert(spec.id.clone()) {
                return Err(ScenarioError::DuplicateEntity(spec.id));
            }
            if !(spec.pace_factor > 0.0 && spec.pace_factor.is_finite()) {
                return Err(ScenarioError::InvalidEntity {
                    entity: spec.id,
                    reason: format!("pace factor {} is not positive", spec.pace_factor),
                });
            }
            if !(spec.start_offset_minutes >= 0.0) {
                return Err(ScenarioError::InvalidEntity {
                    entity: spec.id,
                    reason: format!("start offset {} is negative", spec.start_offset_minutes),
                });
            }
        }

        Ok(())
    }

    /// Explicit entities followed by the generated population.
    ///
    /// A scenario with neither gets a single nominal-pace entity starting
    /// at minute 0, so playback always has something to track.
    pub fn entity_specs(&self) -> Vec<EntitySpec> {
        let mut specs = self.entities.clone();
        if let Some(population) = &self.population {
            specs.extend(population.generate("entity"));
        }
        if specs.is_empty() {
            specs.push(EntitySpec::new("entity-1", "standard"));
        }
        specs
    }

    pub fn catalog(&self) -> InterventionCatalog {
        InterventionCatalog::new(self.interventions.clone())
    }

    /// Pipeline with baselines captured and every stage pending.
    ///
    /// Status and intervention records present in the scenario file are
    /// discarded; a session always starts from untouched stages.
    pub fn pipeline(&self) -> StagePipeline {
        let mut stages = self.stages.clone();
        for stage in &mut stages {
            stage.capture_baseline();
            stage.restart();
            stage.intervention = None;
        }
        StagePipeline::new(stages)
    }

    /// Parse a scenario from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, crate::SimulationError> {
        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| crate::SimulationError::Serialization(format!("Scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }
}
