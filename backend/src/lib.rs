//! Auto Upgrade Core - Rust Engine
//!
//! Upgrades a company's whole rail fleet to a new track type: every train is
//! recalled to a depot, its composition and shared orders are captured, the
//! fleet is sold, all track is converted, and equivalent trains are rebuilt
//! from the best units available on the new track before everything is
//! started again.
//!
//! # Architecture
//!
//! - **core**: Tick clock
//! - **config**: Timing and retry parameters
//! - **models**: Domain types (ids, captured fleet, events, run state)
//! - **host**: Traits for the game world and its command channel
//! - **task**: Suspension/continuation primitive
//! - **selection**: Engine and wagon selection
//! - **orchestrator**: Phase state machine and failure handling
//!
//! # Critical Invariants
//!
//! 1. At most one command is outstanding on the channel
//! 2. At most one run is active; its captured state dies with it
//! 3. Every failure ends in a bail-out back to idle

// Module declarations
pub mod config;
pub mod core;
pub mod host;
pub mod models;
pub mod orchestrator;
pub mod selection;
pub mod task;

// Re-exports for convenience
pub use config::{ConfigError, WorkflowConfig};
pub use core::time::TickClock;
pub use host::{Command, CommandChannel, CommandOutcome, CommandTicket, WorldView};
pub use models::{
    capture::{CapturedFleet, DepotSet, Route, VehicleProperties},
    event::{Event, EventLog, Severity},
    ids::{RailType, UnitSlot},
    state::{RunId, WorkflowState},
};
pub use orchestrator::{Orchestrator, PhaseTag, RunSnapshot, StartError, WorkflowError};
pub use selection::{EngineSelector, SelectionError, UnitChoice, UnitRole};
pub use task::{Resume, SuspendableTask};
