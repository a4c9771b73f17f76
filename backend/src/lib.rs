//! Journey Simulation Core - Rust Engine
//!
//! Tick-driven playback of entities moving through a pipeline of stages,
//! with what-if interventions and baseline-versus-optimized results.
//!
//! # Architecture
//!
//! - **core**: Simulation clock and playback state machine
//! - **models**: Domain types (Stage, Entity, Scenario, Event)
//! - **tracking**: Entity position and delay classification
//! - **interventions**: Catalog lookup and stage metric updates
//! - **results**: Baseline vs optimized metric comparison
//! - **orchestrator**: Sessions, snapshots and the handle-based engine API
//! - **driver**: Real-time tokio playback (feature `runtime`)
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Simulated time never exceeds the scenario's total duration
//! 2. Ticks are ignored unless the clock is running under a current lease
//! 3. Interventions and ticks never interleave within one session
//! 4. All randomness is deterministic (seeded RNG)

// Module declarations
pub mod config;
pub mod core;
pub mod interventions;
pub mod models;
pub mod orchestrator;
pub mod results;
pub mod rng;
pub mod sample;
pub mod tracking;

#[cfg(feature = "runtime")]
pub mod driver;

// Re-exports for convenience
pub use config::{ConfigError, EngineConfig, ResultsConfig, TrackingConfig};
pub use core::time::{ClockError, ClockState, PlaybackMode, SimClock, TimerLease};
pub use interventions::{Application, InterventionEngine, InterventionError};
pub use models::{
    entity::{Entity, EntitySpec, EntityStatus},
    event::{Event, EventLog},
    intervention::{CatalogEntry, InterventionCatalog, InterventionEffect, InterventionType},
    pipeline::{PipelineError, StagePipeline},
    scenario::{Scenario, ScenarioError},
    stage::{Stage, StageMetrics, StageStatus},
};
pub use orchestrator::{
    Session, SessionHandle, SimulationEngine, SimulationError, Snapshot, TickResult,
};
pub use results::{
    FinancialInputs, ImpactLevel, MetricCategory, MetricDirection, MetricPair, ResultMetric,
    ResultsAggregator, ResultsError, ResultsReport,
};
pub use rng::SampleRng;
pub use tracking::{EntityTracker, Position};

#[cfg(feature = "runtime")]
pub use driver::PlaybackDriver;
