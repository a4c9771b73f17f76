//! Snapshots - full stage and entity state at one simulated time
//!
//! Snapshots are what the presentation layer renders and what the results
//! aggregator compares. Each snapshot carries a fingerprint of the scenario
//! structure so that a baseline taken from one scenario is never compared
//! against a snapshot of another.
//!
//! # Critical Invariants
//!
//! - **Fingerprint matching**: two snapshots are comparable only if their
//!   fingerprints are equal
//! - **Index validity**: every entity's stage index is within the stage list

use crate::core::time::ClockState;
use crate::models::entity::Entity;
use crate::models::pipeline::PipelineError;
use crate::models::scenario::Scenario;
use crate::models::stage::Stage;
use crate::orchestrator::SimulationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub scenario_id: String,
    /// SHA256 of the scenario structure (see [`scenario_fingerprint`])
    pub scenario_fingerprint: String,
    pub time_minutes: f64,
    pub clock_state: ClockState,
    pub speed: f64,
    pub stages: Vec<Stage>,
    pub entities: Vec<Entity>,
}

impl Snapshot {
    pub fn stage(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == entity_id)
    }
}

/// The parts of a scenario that must match for two snapshots to compare
#[derive(Serialize)]
struct ScenarioShape<'a> {
    id: &'a str,
    stages: Vec<StageShape<'a>>,
}

#[derive(Serialize)]
struct StageShape<'a> {
    id: &'a str,
    name: &'a str,
    base_duration_minutes: f64,
}

/// Fingerprint of the scenario's structure.
///
/// Hex SHA-256 over the JSON of the scenario id and the ordered stage ids,
/// names and durations. Field order is fixed by the shape structs, so the
/// same structure always yields the same fingerprint. Metrics, statuses and
/// interventions are excluded, since they are what changes between a
/// baseline and an optimized snapshot.
pub fn scenario_fingerprint(scenario: &Scenario) -> Result<String, SimulationError> {
    let shape = ScenarioShape {
        id: &scenario.id,
        stages: scenario
            .stages
            .iter()
            .map(|s| StageShape {
                id: &s.id,
                name: &s.name,
                base_duration_minutes: s.base_duration_minutes,
            })
            .collect(),
    };
    let bytes = serde_json::to_vec(&shape)
        .map_err(|e| SimulationError::Serialization(format!("Fingerprint: {}", e)))?;

    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Check that every entity points at an existing stage.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<(), SimulationError> {
    let len = snapshot.stages.len();
    for entity in &snapshot.entities {
        if entity.current_stage_index >= len {
            return Err(PipelineError::IndexOutOfRange {
                index: entity.current_stage_index,
                len,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::airport_departure_scenario;

    #[test]
    fn test_fingerprint_ignores_metrics() {
        let a = airport_departure_scenario();
        let mut b = a.clone();
        b.stages[0].metrics.wait_time_minutes += 10.0;

        assert_eq!(
            scenario_fingerprint(&a).unwrap(),
            scenario_fingerprint(&b).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_tracks_structure() {
        let a = airport_departure_scenario();
        let mut b = a.clone();
        b.stages[0].base_duration_minutes += 1.0;

        assert_ne!(
            scenario_fingerprint(&a).unwrap(),
            scenario_fingerprint(&b).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = scenario_fingerprint(&airport_departure_scenario()).unwrap();
        let b = scenario_fingerprint(&airport_departure_scenario()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
