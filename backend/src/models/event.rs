//! Event logging for progress reporting and auditing.
//!
//! This module defines the Event enum which captures every significant step
//! of an upgrade run. The [`EventLog`] is the write-only reporting sink the
//! host drains into its console: each event renders as a message line and
//! carries a [`Severity`].
//!
//! # Event Types
//!
//! Events are categorized by phase:
//! - **Run**: start, completion, bail-out
//! - **Recall**: depot recall issued, deferred vehicles, all stopped
//! - **Capture**: fleet blueprint saved
//! - **Sell / Upgrade**: depots liquidated, track converted
//! - **Rebuild**: replacement trains bought
//!
//! # Example
//!
//! ```rust
//! use auto_upgrade_core_rs::models::{Event, Severity};
//!
//! let event = Event::RunCompleted { tick: 420 };
//! assert_eq!(event.severity(), Severity::Info);
//! assert_eq!(event.to_string(), "[Auto Upgrade] Auto upgrade complete!");
//! ```

use crate::models::ids::{OwnerId, RailType, TileIndex, VehicleId};
use crate::orchestrator::PhaseTag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message severity, mirrored onto the host console colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Workflow event capturing a step of the run.
///
/// All events include the tick (as counted by the orchestrator) at which
/// they were logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Start accepted
    RunStarted {
        tick: u64,
        owner: OwnerId,
        rail_type: RailType,
    },

    /// Start refused before any phase ran
    StartRejected { tick: u64, reason: String },

    /// Mass "send to depot" about to be issued
    RecallIssued { tick: u64 },

    /// Per-vehicle recall failed; retried on the next pass
    RecallDeferred {
        tick: u64,
        vehicle: VehicleId,
        reason: String,
    },

    /// Every train is heading to a depot
    RecallComplete { tick: u64 },

    /// Polling for every train to stop in depot
    WaitingForStop { tick: u64 },

    AllStopped { tick: u64 },

    /// Blueprint saved
    FleetCaptured {
        tick: u64,
        routes: usize,
        vehicles: usize,
        depots: usize,
        digest: String,
    },

    SellingStarted { tick: u64 },

    DepotSold { tick: u64, depot: TileIndex },

    AllSold { tick: u64 },

    RailConverted { tick: u64, rail_type: RailType },

    RebuildStarted { tick: u64 },

    /// Replacement for a captured record is ready
    VehicleRebuilt {
        tick: u64,
        record: usize,
        vehicle: VehicleId,
        cloned: bool,
    },

    RunCompleted { tick: u64 },

    /// Unrecoverable error, logged right before the bail-out
    Failure {
        tick: u64,
        phase: PhaseTag,
        reason: String,
    },

    BailedOut { tick: u64 },
}

impl Event {
    /// Get the tick when this event occurred
    pub fn tick(&self) -> u64 {
        match self {
            Event::RunStarted { tick, .. }
            | Event::StartRejected { tick, .. }
            | Event::RecallIssued { tick }
            | Event::RecallDeferred { tick, .. }
            | Event::RecallComplete { tick }
            | Event::WaitingForStop { tick }
            | Event::AllStopped { tick }
            | Event::FleetCaptured { tick, .. }
            | Event::SellingStarted { tick }
            | Event::DepotSold { tick, .. }
            | Event::AllSold { tick }
            | Event::RailConverted { tick, .. }
            | Event::RebuildStarted { tick }
            | Event::VehicleRebuilt { tick, .. }
            | Event::RunCompleted { tick }
            | Event::Failure { tick, .. }
            | Event::BailedOut { tick } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "RunStarted",
            Event::StartRejected { .. } => "StartRejected",
            Event::RecallIssued { .. } => "RecallIssued",
            Event::RecallDeferred { .. } => "RecallDeferred",
            Event::RecallComplete { .. } => "RecallComplete",
            Event::WaitingForStop { .. } => "WaitingForStop",
            Event::AllStopped { .. } => "AllStopped",
            Event::FleetCaptured { .. } => "FleetCaptured",
            Event::SellingStarted { .. } => "SellingStarted",
            Event::DepotSold { .. } => "DepotSold",
            Event::AllSold { .. } => "AllSold",
            Event::RailConverted { .. } => "RailConverted",
            Event::RebuildStarted { .. } => "RebuildStarted",
            Event::VehicleRebuilt { .. } => "VehicleRebuilt",
            Event::RunCompleted { .. } => "RunCompleted",
            Event::Failure { .. } => "Failure",
            Event::BailedOut { .. } => "BailedOut",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::RecallDeferred { .. } => Severity::Warning,
            Event::StartRejected { .. } | Event::Failure { .. } | Event::BailedOut { .. } => {
                Severity::Error
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[Auto Upgrade] ")?;
        match self {
            Event::RunStarted { owner, rail_type, .. } => {
                write!(f, "Upgrading company {} to {}.", owner.0, rail_type)
            }
            Event::StartRejected { reason, .. } => f.write_str(reason),
            Event::RecallIssued { .. } => {
                f.write_str("Issuing orders for all trains to go to depot...")
            }
            Event::RecallDeferred { vehicle, reason, .. } => {
                write!(f, "Could not send {vehicle} to depot ({reason}), will retry.")
            }
            Event::RecallComplete { .. } => {
                f.write_str("Done issuing all orders to go to depot.")
            }
            Event::WaitingForStop { .. } => {
                f.write_str("Waiting for all trains to stop in depot...")
            }
            Event::AllStopped { .. } => f.write_str("All trains are now stopped in depot."),
            Event::FleetCaptured {
                routes,
                vehicles,
                depots,
                ..
            } => write!(
                f,
                "Saved order lists ({vehicles} trains, {routes} routes, {depots} depots)."
            ),
            Event::SellingStarted { .. } => f.write_str("Selling all trains..."),
            Event::DepotSold { depot, .. } => write!(f, "Sold all trains in depot at {depot}."),
            Event::AllSold { .. } => f.write_str("All trains have been sold."),
            Event::RailConverted { .. } => f.write_str("Tracks have been upgraded."),
            Event::RebuildStarted { .. } => f.write_str("Buying new vehicles..."),
            Event::VehicleRebuilt {
                vehicle, cloned, ..
            } => {
                if *cloned {
                    write!(f, "Cloned {vehicle} with shared orders.")
                } else {
                    write!(f, "Built {vehicle}.")
                }
            }
            Event::RunCompleted { .. } => f.write_str("Auto upgrade complete!"),
            Event::Failure { reason, .. } => f.write_str(reason),
            Event::BailedOut { .. } => f.write_str("Bailed out."),
        }
    }
}

/// Event log for storing and querying workflow events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events at or above a severity
    pub fn events_at_least(&self, severity: Severity) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.severity() >= severity)
            .collect()
    }

    /// Hand every logged event to the host, emptying the log
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
