//! Host interfaces
//!
//! Traits and value types describing the running simulation the workflow is
//! embedded in: the read-only [`WorldView`] and the single-flight
//! [`CommandChannel`].

pub mod command;
pub mod world;

pub use command::{Command, CommandChannel, CommandOutcome, CommandTicket, TileXY};
pub use world::{EngineSpec, MapBounds, WorldView};
