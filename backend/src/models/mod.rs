//! Domain models for the journey playback engine

pub mod entity;
pub mod event;
pub mod intervention;
pub mod pipeline;
pub mod scenario;
pub mod stage;

// Re-exports
pub use entity::{Entity, EntitySpec, EntityStatus, PopulationConfig, ProfileMix};
pub use event::{Event, EventLog};
pub use intervention::{
    CatalogEntry, InterventionCatalog, InterventionEffect, InterventionRecord, InterventionType,
};
pub use pipeline::{PipelineError, StagePipeline};
pub use scenario::{Scenario, ScenarioError};
pub use stage::{Stage, StageMetrics, StageStatus};
