//! Engine - session registry behind the public playback API
//!
//! The presentation layer never holds a [`Session`] directly. It loads a
//! scenario, receives a [`SessionHandle`] and passes that handle to every
//! call. Sessions are independent of each other; the engine does not share
//! state between them.
//!
//! # Example
//!
//! ```rust
//! use journey_sim_core::{EngineConfig, FinancialInputs, SimulationEngine};
//! use journey_sim_core::sample::airport_departure_scenario;
//!
//! let mut engine = SimulationEngine::new(EngineConfig::default()).unwrap();
//! let session = engine.load_scenario(airport_departure_scenario()).unwrap();
//!
//! engine.start(session).unwrap();
//! engine.tick(session, 5.0).unwrap();
//! engine.apply_intervention(session, "security", "open-fast-track").unwrap();
//!
//! let baseline = engine.baseline_snapshot(session).unwrap();
//! let current = engine.get_snapshot(session).unwrap();
//! let report = engine
//!     .compute_results(session, &baseline, &current, &FinancialInputs::default())
//!     .unwrap();
//! assert!(!report.metrics.is_empty());
//! ```

use crate::config::EngineConfig;
use crate::models::event::Event;
use crate::models::scenario::Scenario;
use crate::models::stage::Stage;
use crate::orchestrator::session::{Session, SimulationError, TickResult};
use crate::orchestrator::snapshot::Snapshot;
use crate::results::{FinancialInputs, ResultsReport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Opaque reference to a loaded session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

pub struct SimulationEngine {
    config: EngineConfig,
    sessions: HashMap<SessionHandle, Session>,
}

impl SimulationEngine {
    pub fn new(config: EngineConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn load_scenario(&mut self, scenario: Scenario) -> Result<SessionHandle, SimulationError> {
        let session = Session::new(scenario, self.config.clone())?;
        let handle = SessionHandle::new();
        info!(%handle, scenario = %session.scenario().id, "scenario loaded");
        self.sessions.insert(handle, session);
        Ok(handle)
    }

    /// Drop a session and everything it owns.
    pub fn close_session(&mut self, handle: SessionHandle) -> Result<(), SimulationError> {
        self.sessions
            .remove(&handle)
            .map(|_| info!(%handle, "session closed"))
            .ok_or_else(|| SimulationError::SessionNotFound(handle.to_string()))
    }

    pub fn session(&self, handle: SessionHandle) -> Result<&Session, SimulationError> {
        self.sessions
            .get(&handle)
            .ok_or_else(|| SimulationError::SessionNotFound(handle.to_string()))
    }

    pub fn session_mut(&mut self, handle: SessionHandle) -> Result<&mut Session, SimulationError> {
        self.sessions
            .get_mut(&handle)
            .ok_or_else(|| SimulationError::SessionNotFound(handle.to_string()))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn start(&mut self, handle: SessionHandle) -> Result<(), SimulationError> {
        self.session_mut(handle)?.start();
        Ok(())
    }

    pub fn pause(&mut self, handle: SessionHandle) -> Result<(), SimulationError> {
        self.session_mut(handle)?.pause();
        Ok(())
    }

    pub fn reset(&mut self, handle: SessionHandle) -> Result<(), SimulationError> {
        self.session_mut(handle)?.reset();
        Ok(())
    }

    pub fn set_speed(&mut self, handle: SessionHandle, multiplier: f64) -> Result<(), SimulationError> {
        self.session_mut(handle)?.set_speed(multiplier)
    }

    pub fn tick(
        &mut self,
        handle: SessionHandle,
        interval_seconds: f64,
    ) -> Result<TickResult, SimulationError> {
        self.session_mut(handle)?.tick(interval_seconds)
    }

    pub fn apply_intervention(
        &mut self,
        handle: SessionHandle,
        stage_id: &str,
        intervention_id: &str,
    ) -> Result<Stage, SimulationError> {
        self.session_mut(handle)?
            .apply_intervention(stage_id, intervention_id)
    }

    pub fn get_snapshot(&self, handle: SessionHandle) -> Result<Snapshot, SimulationError> {
        Ok(self.session(handle)?.snapshot())
    }

    pub fn baseline_snapshot(&self, handle: SessionHandle) -> Result<Snapshot, SimulationError> {
        Ok(self.session(handle)?.baseline_snapshot().clone())
    }

    pub fn compute_results(
        &self,
        handle: SessionHandle,
        baseline: &Snapshot,
        current: &Snapshot,
        inputs: &FinancialInputs,
    ) -> Result<ResultsReport, SimulationError> {
        self.session(handle)?
            .compute_results(baseline, current, inputs)
    }

    pub fn events(&self, handle: SessionHandle) -> Result<Vec<Event>, SimulationError> {
        Ok(self.session(handle)?.events().to_vec())
    }
}
