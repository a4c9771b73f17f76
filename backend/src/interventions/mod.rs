//! Intervention engine
//!
//! Applies catalog interventions to stages. Application mutates the stage's
//! metrics by the declared effect and attaches a provenance record. It never
//! advances simulated time.
//!
//! # Idempotence
//!
//! Applying the intervention a stage already carries is a no-op that returns
//! the existing record. Applying a different intervention to a stage that
//! already has one is rejected, so effects never stack silently.
//!
//! # Status policy
//!
//! A `Delayed` stage is resolved to `Completed` by an intervention. Every
//! other status is left as it is.

use crate::models::intervention::{InterventionCatalog, InterventionRecord};
use crate::models::pipeline::{PipelineError, StagePipeline};
use crate::models::stage::StageStatus;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterventionError {
    #[error("No intervention {intervention_id} for stage {stage_id}")]
    NoSuchIntervention {
        stage_id: String,
        intervention_id: String,
    },

    #[error("Stage {stage_id} already carries intervention {existing}")]
    StageAlreadyIntervened { stage_id: String, existing: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result of an `apply` call
#[derive(Debug, Clone, PartialEq)]
pub enum Application {
    /// Effect applied now
    Applied {
        record: InterventionRecord,
        status_change: Option<(StageStatus, StageStatus)>,
    },
    /// Same intervention was already in place; nothing changed
    AlreadyApplied(InterventionRecord),
}

impl Application {
    pub fn record(&self) -> &InterventionRecord {
        match self {
            Application::Applied { record, .. } => record,
            Application::AlreadyApplied(record) => record,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Application::Applied { .. })
    }
}

/// Applies interventions from a catalog to a pipeline
#[derive(Debug, Clone, Default)]
pub struct InterventionEngine {
    catalog: InterventionCatalog,
}

impl InterventionEngine {
    pub fn new(catalog: InterventionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &InterventionCatalog {
        &self.catalog
    }

    pub fn apply(
        &self,
        pipeline: &mut StagePipeline,
        stage_id: &str,
        intervention_id: &str,
        time_minutes: f64,
    ) -> Result<Application, InterventionError> {
        let index = pipeline
            .stage_index(stage_id)
            .map_err(|_| InterventionError::NoSuchIntervention {
                stage_id: stage_id.to_string(),
                intervention_id: intervention_id.to_string(),
            })?;
        let entry = self.catalog.find(stage_id, intervention_id).ok_or_else(|| {
            InterventionError::NoSuchIntervention {
                stage_id: stage_id.to_string(),
                intervention_id: intervention_id.to_string(),
            }
        })?;

        let stage = pipeline.get_stage_mut(index)?;

        if let Some(existing) = &stage.intervention {
            if existing.intervention_id == intervention_id {
                debug!(stage_id, intervention_id, "intervention already applied");
                return Ok(Application::AlreadyApplied(existing.clone()));
            }
            return Err(InterventionError::StageAlreadyIntervened {
                stage_id: stage_id.to_string(),
                existing: existing.intervention_id.clone(),
            });
        }

        stage.metrics = entry.effect.apply_to(&stage.metrics);
        let record = entry.record(time_minutes);
        stage.intervention = Some(record.clone());

        let before = stage.status;
        let status_change = if before == StageStatus::Delayed
            && stage.transition_to(StageStatus::Completed)
        {
            Some((before, StageStatus::Completed))
        } else {
            None
        };

        info!(
            stage_id,
            intervention_id,
            confidence = entry.confidence_percent,
            time_minutes,
            "intervention applied"
        );

        Ok(Application::Applied {
            record,
            status_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intervention::{CatalogEntry, InterventionEffect, InterventionType};
    use crate::models::stage::{Stage, StageMetrics};

    fn setup() -> (InterventionEngine, StagePipeline) {
        let m = StageMetrics {
            throughput_per_hour: 200.0,
            wait_time_minutes: 12.0,
            efficiency_percent: 70.0,
        };
        let pipeline = StagePipeline::new(vec![
            Stage::new("checkin", "Check-in", 10.0, m),
            Stage::new("security", "Security", 20.0, m),
        ]);
        let catalog = InterventionCatalog::new(vec![
            CatalogEntry {
                id: "extra-lane".to_string(),
                stage_id: "security".to_string(),
                intervention_type: InterventionType::Optimization,
                description: "Open lane 5".to_string(),
                impact_description: "-6 min wait".to_string(),
                confidence_percent: 92.0,
                effect: InterventionEffect {
                    efficiency_delta_points: 10.0,
                    wait_time_delta_minutes: -6.0,
                    throughput_delta_percent: 25.0,
                },
            },
            CatalogEntry {
                id: "queue-alert".to_string(),
                stage_id: "security".to_string(),
                intervention_type: InterventionType::Alert,
                description: "Alert supervisor".to_string(),
                impact_description: "Faster response".to_string(),
                confidence_percent: 70.0,
                effect: InterventionEffect::default(),
            },
        ]);
        (InterventionEngine::new(catalog), pipeline)
    }

    #[test]
    fn test_apply_changes_metrics() {
        let (engine, mut pipeline) = setup();
        let outcome = engine
            .apply(&mut pipeline, "security", "extra-lane", 14.0)
            .unwrap();
        assert!(outcome.is_new());
        assert_eq!(outcome.record().applied_at_minutes, 14.0);

        let stage = pipeline.get_stage(1).unwrap();
        assert_eq!(stage.metrics.wait_time_minutes, 6.0);
        assert_eq!(stage.metrics.efficiency_percent, 80.0);
        assert_eq!(stage.metrics.throughput_per_hour, 250.0);
        assert_eq!(stage.baseline().wait_time_minutes, 12.0);
    }

    #[test]
    fn test_unknown_intervention() {
        let (engine, mut pipeline) = setup();
        let err = engine
            .apply(&mut pipeline, "checkin", "extra-lane", 0.0)
            .unwrap_err();
        assert!(matches!(err, InterventionError::NoSuchIntervention { .. }));

        let err = engine
            .apply(&mut pipeline, "gate", "extra-lane", 0.0)
            .unwrap_err();
        assert!(matches!(err, InterventionError::NoSuchIntervention { .. }));
    }

    #[test]
    fn test_second_different_intervention_rejected() {
        let (engine, mut pipeline) = setup();
        engine
            .apply(&mut pipeline, "security", "extra-lane", 0.0)
            .unwrap();
        let err = engine
            .apply(&mut pipeline, "security", "queue-alert", 1.0)
            .unwrap_err();
        assert_eq!(
            err,
            InterventionError::StageAlreadyIntervened {
                stage_id: "security".to_string(),
                existing: "extra-lane".to_string(),
            }
        );
    }

    #[test]
    fn test_delayed_stage_resolves_to_completed() {
        let (engine, mut pipeline) = setup();
        {
            let stage = pipeline.get_stage_mut(1).unwrap();
            stage.transition_to(StageStatus::Active);
            stage.transition_to(StageStatus::Delayed);
        }
        let outcome = engine
            .apply(&mut pipeline, "security", "extra-lane", 0.0)
            .unwrap();
        assert_eq!(
            outcome,
            Application::Applied {
                record: pipeline.get_stage(1).unwrap().intervention.clone().unwrap(),
                status_change: Some((StageStatus::Delayed, StageStatus::Completed)),
            }
        );
    }

    #[test]
    fn test_active_stage_status_unchanged() {
        let (engine, mut pipeline) = setup();
        pipeline
            .get_stage_mut(1)
            .unwrap()
            .transition_to(StageStatus::Active);
        engine
            .apply(&mut pipeline, "security", "extra-lane", 0.0)
            .unwrap();
        assert_eq!(pipeline.get_stage(1).unwrap().status, StageStatus::Active);
    }
}
