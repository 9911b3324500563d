//! Workflow State
//!
//! The run-scoped aggregate of an upgrade in progress: who is being
//! upgraded, to what, where in the phase sequence the run is, and the fleet
//! blueprint captured along the way.
//!
//! # Critical Invariants
//!
//! 1. **Single run**: at most one `WorkflowState` exists per orchestrator;
//!    it is created by a successful start and dropped on completion or
//!    bail-out, taking the captured fleet with it
//! 2. **Owner binding**: the run only ever acts for `owner`

use crate::models::capture::CapturedFleet;
use crate::models::ids::{OwnerId, RailType};
use crate::orchestrator::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one run; command tickets carry it so stale results from an
/// earlier run are recognisable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Complete state of the active run
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub run_id: RunId,

    /// Owner whose fleet is being upgraded
    pub owner: OwnerId,

    /// Track type the run converts to
    pub rail_type: RailType,

    /// Current phase, with its cursor
    pub phase: Phase,

    /// Blueprint captured before selling; empty until the capture phase
    pub fleet: CapturedFleet,

    /// Tick the run started at
    pub started_at: u64,
}

impl WorkflowState {
    pub fn new(owner: OwnerId, rail_type: RailType, started_at: u64) -> Self {
        Self {
            run_id: RunId::new(),
            owner,
            rail_type,
            phase: Phase::RecallAll,
            fleet: CapturedFleet::default(),
            started_at,
        }
    }
}
