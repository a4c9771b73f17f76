//! Orchestrator - sessions, snapshots and the public engine API
//!
//! See `session.rs` for the tick sequence and `engine.rs` for the
//! handle-based API consumed by the presentation layer.

pub mod engine;
pub mod session;
pub mod snapshot;

// Re-export main types for convenience
pub use engine::{SessionHandle, SimulationEngine};
pub use session::{Session, SimulationError, TickResult};
pub use snapshot::{scenario_fingerprint, validate_snapshot, Snapshot};
