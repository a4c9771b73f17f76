//! Simulation session - one scenario played back on one timeline
//!
//! A session owns all mutable state of a playback: the clock, the stage
//! pipeline, the entity set and the event log. Every mutation goes through
//! `&mut Session`, so interventions are always serialized with ticks and
//! never observe a half-updated pipeline.
//!
//! # Tick sequence
//!
//! ```text
//! For each tick:
//! 1. Advance the clock (no-op if paused or the lease is stale)
//! 2. On wrap: restart every stage at Pending
//! 3. Recompute every entity's position and status
//! 4. Sync stage statuses to the lead entity
//! 5. Log events
//! ```
//!
//! # Example
//!
//! ```rust
//! use journey_sim_core::{EngineConfig, Session};
//! use journey_sim_core::sample::airport_departure_scenario;
//!
//! let mut session = Session::new(airport_departure_scenario(), EngineConfig::default()).unwrap();
//! session.start();
//! for _ in 0..10 {
//!     session.tick(1.0).unwrap();
//! }
//! assert_eq!(session.time_minutes(), 10.0);
//! ```

use crate::config::{ConfigError, EngineConfig};
use crate::core::time::{ClockError, ClockState, SimClock, TimerLease};
use crate::interventions::{Application, InterventionEngine, InterventionError};
use crate::models::entity::{Entity, EntitySpec};
use crate::models::event::{Event, EventLog};
use crate::models::intervention::CatalogEntry;
use crate::models::pipeline::{PipelineError, StagePipeline};
use crate::models::scenario::{Scenario, ScenarioError};
use crate::models::stage::{Stage, StageStatus};
use crate::orchestrator::snapshot::{scenario_fingerprint, validate_snapshot, Snapshot};
use crate::results::{FinancialInputs, ResultsAggregator, ResultsError, ResultsReport};
use crate::tracking::EntityTracker;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(#[from] ScenarioError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Intervention(#[from] InterventionError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Playback driver is no longer running")]
    DriverClosed,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    pub time_minutes: f64,
    /// False when the tick was ignored (paused, finished, stale lease)
    pub advanced: bool,
    pub wrapped: bool,
    pub finished: bool,
    pub entities_moved: usize,
    pub status_changes: usize,
}

impl TickResult {
    fn idle(time_minutes: f64) -> Self {
        Self {
            time_minutes,
            advanced: false,
            wrapped: false,
            finished: false,
            entities_moved: 0,
            status_changes: 0,
        }
    }
}

pub struct Session {
    scenario: Scenario,
    fingerprint: String,
    clock: SimClock,
    lease: Option<TimerLease>,
    pipeline: StagePipeline,
    entities: Vec<Entity>,
    tracker: EntityTracker,
    interventions: InterventionEngine,
    aggregator: ResultsAggregator,
    events: EventLog,
    baseline: Snapshot,
}

impl Session {
    /// Validate the inputs and build a stopped session at minute 0.
    ///
    /// The baseline snapshot is taken here, before any intervention.
    pub fn new(scenario: Scenario, config: EngineConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        scenario.validate()?;

        let fingerprint = scenario_fingerprint(&scenario)?;
        let entities = scenario
            .entity_specs()
            .iter()
            .map(Entity::from_spec)
            .collect();
        let clock = SimClock::new(
            scenario.total_duration_minutes,
            scenario.available_speed_multipliers.clone(),
        )
        .with_mode(config.playback_mode);

        let mut session = Self {
            pipeline: scenario.pipeline(),
            interventions: InterventionEngine::new(scenario.catalog()),
            tracker: EntityTracker::new(config.tracking),
            aggregator: ResultsAggregator::new(config.results),
            events: EventLog::with_capacity(config.event_log_capacity),
            lease: None,
            entities,
            clock,
            fingerprint,
            baseline: Snapshot {
                scenario_id: scenario.id.clone(),
                scenario_fingerprint: String::new(),
                time_minutes: 0.0,
                clock_state: ClockState::Stopped,
                speed: 1.0,
                stages: Vec::new(),
                entities: Vec::new(),
            },
            scenario,
        };

        session.recompute()?;
        session.baseline = session.snapshot();

        info!(
            scenario = %session.scenario.id,
            stages = session.pipeline.len(),
            entities = session.entities.len(),
            "session loaded"
        );
        Ok(session)
    }

    /// Begin playback. No-op if already playing.
    pub fn start(&mut self) -> TimerLease {
        let was_running = self.clock.is_running();
        let lease = self.clock.start();
        if self.clock.is_running() && !was_running {
            self.lease = Some(lease);
            self.events.log(Event::ClockStarted {
                time_minutes: self.clock.time_minutes(),
                speed: self.clock.speed(),
            });
            info!(time = self.clock.time_minutes(), speed = self.clock.speed(), "playback started");
        }
        lease
    }

    /// Stop playback, keeping the current time.
    pub fn pause(&mut self) {
        if self.clock.is_running() {
            self.clock.pause();
            self.lease = None;
            self.events.log(Event::ClockPaused {
                time_minutes: self.clock.time_minutes(),
            });
            info!(time = self.clock.time_minutes(), "playback paused");
        }
    }

    /// Back to minute 0, stopped, every entity at stage 0 and on track.
    ///
    /// Applied interventions stay in place.
    pub fn reset(&mut self) {
        let previous = self.clock.time_minutes();
        self.clock.reset();
        self.lease = None;
        for entity in &mut self.entities {
            entity.reset();
        }
        self.restart_stages();
        self.events.log(Event::ClockReset {
            time_minutes: previous,
        });
        info!(from = previous, "playback reset");
    }

    /// Change playback speed. Rejected values leave the speed unchanged.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), SimulationError> {
        let from = self.clock.speed();
        if let Err(e) = self.clock.set_speed(multiplier) {
            warn!(requested = multiplier, "rejected speed change");
            return Err(e.into());
        }
        if from != multiplier {
            self.events.log(Event::SpeedChanged {
                time_minutes: self.clock.time_minutes(),
                from,
                to: multiplier,
            });
            info!(from, to = multiplier, "speed changed");
        }
        Ok(())
    }

    /// Advance using the lease from the last `start()`.
    pub fn tick(&mut self, interval_seconds: f64) -> Result<TickResult, SimulationError> {
        match self.lease {
            Some(lease) => self.tick_with_lease(lease, interval_seconds),
            None => Ok(TickResult::idle(self.clock.time_minutes())),
        }
    }

    /// Advance on behalf of a timer holding `lease`.
    ///
    /// A stale lease (issued before a pause or reset) is ignored.
    pub fn tick_with_lease(
        &mut self,
        lease: TimerLease,
        interval_seconds: f64,
    ) -> Result<TickResult, SimulationError> {
        let Some(advance) = self.clock.tick(lease, interval_seconds) else {
            return Ok(TickResult::idle(self.clock.time_minutes()));
        };
        let now = advance.current_minutes;

        if advance.wrapped {
            self.events.log(Event::TimelineWrapped { time_minutes: now });
            self.restart_stages();
            debug!(from = advance.previous_minutes, "timeline wrapped");
        }

        let (entities_moved, status_changes) = self.recompute()?;

        if advance.finished {
            self.lease = None;
            self.events.log(Event::TimelineFinished { time_minutes: now });
            info!(time = now, "timeline finished");
        }

        debug!(time = now, entities_moved, status_changes, "tick");
        Ok(TickResult {
            time_minutes: now,
            advanced: true,
            wrapped: advance.wrapped,
            finished: advance.finished,
            entities_moved,
            status_changes,
        })
    }

    /// Apply a catalog intervention to a stage and return the updated stage.
    ///
    /// Does not advance time. Entity statuses are recomputed, since the
    /// stage's wait time may have changed.
    pub fn apply_intervention(
        &mut self,
        stage_id: &str,
        intervention_id: &str,
    ) -> Result<Stage, SimulationError> {
        let now = self.clock.time_minutes();
        let application = match self
            .interventions
            .apply(&mut self.pipeline, stage_id, intervention_id, now)
        {
            Ok(application) => application,
            Err(e) => {
                warn!(stage_id, intervention_id, error = %e, "intervention rejected");
                return Err(e.into());
            }
        };

        if let Application::Applied {
            record,
            status_change,
        } = &application
        {
            self.events.log(Event::InterventionApplied {
                time_minutes: now,
                stage_id: stage_id.to_string(),
                intervention_id: record.intervention_id.clone(),
                confidence_percent: record.confidence_percent,
            });
            if let Some((from, to)) = status_change {
                self.events.log(Event::StageStatusChanged {
                    time_minutes: now,
                    stage_id: stage_id.to_string(),
                    from: *from,
                    to: *to,
                });
            }
            self.recompute()?;
        }

        let index = self.pipeline.stage_index(stage_id)?;
        Ok(self.pipeline.get_stage(index)?.clone())
    }

    /// Current stage and entity state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            scenario_id: self.scenario.id.clone(),
            scenario_fingerprint: self.fingerprint.clone(),
            time_minutes: self.clock.time_minutes(),
            clock_state: self.clock.state(),
            speed: self.clock.speed(),
            stages: self.pipeline.stages().to_vec(),
            entities: self.entities.clone(),
        }
    }

    /// Snapshot taken when the session was loaded
    pub fn baseline_snapshot(&self) -> &Snapshot {
        &self.baseline
    }

    /// Compare two snapshots of this session's scenario.
    pub fn compute_results(
        &self,
        baseline: &Snapshot,
        current: &Snapshot,
        inputs: &FinancialInputs,
    ) -> Result<ResultsReport, SimulationError> {
        validate_snapshot(baseline)?;
        validate_snapshot(current)?;
        if baseline.scenario_fingerprint != self.fingerprint {
            return Err(ResultsError::ScenarioMismatch {
                baseline: baseline.scenario_fingerprint.clone(),
                current: self.fingerprint.clone(),
            }
            .into());
        }
        let report = self.aggregator.compare(baseline, current, inputs)?;
        info!(
            metrics = report.metrics.len(),
            total_annual_value = report.total_annual_value,
            "results computed"
        );
        Ok(report)
    }

    /// Compare the load-time baseline against the current state.
    pub fn results_against_baseline(
        &self,
        inputs: &FinancialInputs,
    ) -> Result<ResultsReport, SimulationError> {
        self.compute_results(&self.baseline, &self.snapshot(), inputs)
    }

    pub fn interventions_for(&self, stage_id: &str) -> Vec<&CatalogEntry> {
        self.interventions.catalog().interventions_for(stage_id)
    }

    pub fn time_minutes(&self) -> f64 {
        self.clock.time_minutes()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_specs(&self) -> Vec<EntitySpec> {
        self.scenario.entity_specs()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Recompute entities, then stage statuses. Returns (moved, status changes).
    fn recompute(&mut self) -> Result<(usize, usize), SimulationError> {
        let now = self.clock.time_minutes();
        let mut moved = 0;
        let mut status_changes = 0;

        for entity in &mut self.entities {
            let change = match self.tracker.update(entity, &self.pipeline, now) {
                Ok(change) => change,
                Err(e) => {
                    error!(entity = %entity.id, error = %e, "entity tracker out of sync with pipeline");
                    return Err(e.into());
                }
            };
            if let Some((from_stage, to_stage)) = change.stage {
                moved += 1;
                self.events.log(Event::EntityStageChanged {
                    time_minutes: now,
                    entity_id: entity.id.clone(),
                    from_stage,
                    to_stage,
                });
            }
            if let Some((from, to)) = change.status {
                status_changes += 1;
                self.events.log(Event::EntityStatusChanged {
                    time_minutes: now,
                    entity_id: entity.id.clone(),
                    from,
                    to,
                });
            }
        }

        self.sync_stage_statuses()?;
        Ok((moved, status_changes))
    }

    /// Drive stage statuses from the lead (first) entity.
    ///
    /// Stages behind the lead are completed, the lead's stage is active (or
    /// delayed when the lead is over the delay tolerance), stages ahead stay
    /// pending. Illegal transitions are skipped, so a delayed stage stays
    /// delayed until the lead leaves it or an intervention resolves it.
    fn sync_stage_statuses(&mut self) -> Result<(), SimulationError> {
        let Some(lead) = self.entities.first() else {
            return Ok(());
        };
        let now = self.clock.time_minutes();
        let position = self.tracker.locate(lead, &self.pipeline, now)?;
        let started = now > lead.start_offset_minutes;

        let mut changes = Vec::new();
        for (index, stage) in self.pipeline.iter_mut().enumerate() {
            let target = if !started || index > position.stage_index {
                continue;
            } else if index < position.stage_index {
                StageStatus::Completed
            } else if self.tracker.flags_stage(&position) {
                StageStatus::Delayed
            } else {
                StageStatus::Active
            };

            let from = stage.status;
            if from == StageStatus::Pending {
                stage.transition_to(StageStatus::Active);
            }
            stage.transition_to(target);
            if stage.status != from {
                changes.push((stage.id.clone(), from, stage.status));
            }
        }

        for (stage_id, from, to) in changes {
            self.events.log(Event::StageStatusChanged {
                time_minutes: now,
                stage_id,
                from,
                to,
            });
        }
        Ok(())
    }

    fn restart_stages(&mut self) {
        let now = self.clock.time_minutes();
        let mut changes = Vec::new();
        for stage in self.pipeline.iter_mut() {
            if stage.status != StageStatus::Pending {
                changes.push((stage.id.clone(), stage.status));
                stage.restart();
            }
        }
        for (stage_id, from) in changes {
            self.events.log(Event::StageStatusChanged {
                time_minutes: now,
                stage_id,
                from,
                to: StageStatus::Pending,
            });
        }
    }
}
