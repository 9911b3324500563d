//! Orchestrator - the upgrade workflow
//!
//! Drives one run through recall, capture, sell, upgrade, rebuild and start.
//!
//! See `engine.rs` for the pump and failure handler, `phase.rs` for the
//! state machine.

pub mod checkpoint;
pub mod engine;
pub mod phase;

mod liquidate;
mod rebuild;
mod recall;

// Re-export main types for convenience
pub use engine::{Orchestrator, StartError, WorkflowError};
pub use phase::{Flow, Phase, PhaseTag, RebuildCursor, RebuildStage, RecallPass};

// Re-export checkpoint types
pub use checkpoint::{validate_snapshot, RunSnapshot, SnapshotError};
