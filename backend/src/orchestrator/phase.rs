//! Phase state machine
//!
//! A run is an explicit tagged [`Phase`] plus a cursor. The pump hands the
//! current phase a [`Resume`] value (fresh entry / delay elapsed, or the
//! result of the command the phase issued) and the phase answers with a
//! [`Flow`]. Every phase that issues a command suspends immediately, which
//! is what keeps the command channel single-flight.
//!
//! ```text
//! Idle ─start─▶ RecallAll ─▶ RecallCleanup ─▶ WaitStopped ─▶ Capture
//!                                                              │
//!   Idle ◀─complete── Start ◀── Rebuild ◀── Upgrade ◀── Sell ◀─┘
//!
//! any failure / owner change ─▶ bail-out ─▶ Idle
//! ```

use super::engine::WorkflowError;
use super::{liquidate, rebuild, recall};
use crate::config::WorkflowConfig;
use crate::host::{Command, CommandChannel, CommandOutcome, WorldView};
use crate::models::event::{Event, EventLog};
use crate::models::ids::VehicleId;
use crate::models::state::WorkflowState;
use crate::task::{Resume, SuspendableTask};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Observable name of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseTag {
    Idle,
    RecallAll,
    RecallCleanup,
    WaitStopped,
    Capture,
    Sell,
    Upgrade,
    Rebuild,
    Start,
}

/// Phase of an active run, with its iteration cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Mass "send to depot" for the owner
    RecallAll,
    /// Per-vehicle recall of trains not yet heading to a depot
    RecallCleanup(RecallPass),
    /// Poll until every train is stopped in a depot
    WaitStopped,
    /// Save routes and blueprints
    Capture,
    /// Sell the depots' contents one depot at a time
    Sell { next_depot: usize },
    /// Whole-map track conversion
    Upgrade,
    /// Rebuild one captured record at a time
    Rebuild(RebuildCursor),
    /// Mass start, then complete
    StartAll,
}

impl Phase {
    pub fn tag(&self) -> PhaseTag {
        match self {
            Phase::RecallAll => PhaseTag::RecallAll,
            Phase::RecallCleanup(_) => PhaseTag::RecallCleanup,
            Phase::WaitStopped => PhaseTag::WaitStopped,
            Phase::Capture => PhaseTag::Capture,
            Phase::Sell { .. } => PhaseTag::Sell,
            Phase::Upgrade => PhaseTag::Upgrade,
            Phase::Rebuild(_) => PhaseTag::Rebuild,
            Phase::StartAll => PhaseTag::Start,
        }
    }
}

/// One pass of the recall clean-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecallPass {
    /// 1-based pass number
    pub pass: u32,
    /// Vehicles already tried during this pass
    pub attempted: BTreeSet<VehicleId>,
    /// Vehicle whose recall is outstanding
    pub in_flight: Option<VehicleId>,
    /// Recalls that failed during this pass
    pub failed: usize,
}

impl RecallPass {
    pub fn new(pass: u32) -> Self {
        Self {
            pass,
            ..Self::default()
        }
    }
}

/// Position within the rebuild phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildCursor {
    /// Index into the captured vehicle blueprints
    pub record: usize,
    pub stage: RebuildStage,
}

impl RebuildCursor {
    pub fn at(record: usize) -> Self {
        Self {
            record,
            stage: RebuildStage::Begin,
        }
    }
}

/// Sub-step of rebuilding one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStage {
    /// Check the depot and choose clone or build
    Begin,
    /// Clone of the route's first shared vehicle outstanding
    Cloning,
    /// Building unit `slot`; `head` is the train built so far
    BuildUnit {
        slot: usize,
        head: Option<VehicleId>,
    },
    /// Attaching the freshly built `unit` behind `head`
    AttachUnit {
        slot: usize,
        head: VehicleId,
        unit: VehicleId,
    },
    /// Inserting route order `index` into `head`
    InsertOrder { head: VehicleId, index: usize },
    /// Skipping `train` to its depot order
    SkipToDepot { train: VehicleId },
}

/// What the pump does after a phase step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// A suspension is pending; wait for the host
    Suspended,
    /// Step the (possibly new) phase again right away
    Continue,
    /// The run finished
    Complete,
}

/// Everything a phase step may touch besides the run state
pub(crate) struct StepContext<'a> {
    pub world: &'a dyn WorldView,
    pub channel: &'a mut dyn CommandChannel,
    pub task: &'a mut SuspendableTask,
    pub events: &'a mut EventLog,
    pub config: &'a WorkflowConfig,
    pub tick: u64,
    /// Settle delay converted by the run's clock
    pub settle_ticks: u32,
}

impl StepContext<'_> {
    /// Submit `command` and suspend on its result
    pub fn issue(&mut self, command: Command, action: &'static str) -> Result<Flow, WorkflowError> {
        self.task
            .suspend_on_command(&mut *self.channel, &command)
            .map_err(|_| WorkflowError::CommandRejected { action })?;
        Ok(Flow::Suspended)
    }

    /// Suspend for the settle delay
    pub fn settle(&mut self) -> Flow {
        self.task.suspend_on_ticks(self.settle_ticks);
        Flow::Suspended
    }

    /// Suspend for one poll interval
    pub fn poll(&mut self) -> Flow {
        self.task.suspend_on_ticks(self.config.poll_interval_ticks);
        Flow::Suspended
    }

    pub fn log(&mut self, event: Event) {
        self.events.log(event);
    }
}

/// Unwrap a command result, turning failure into an abort
pub(crate) fn expect_success(
    outcome: CommandOutcome,
    action: &'static str,
) -> Result<Option<VehicleId>, WorkflowError> {
    match outcome {
        CommandOutcome::Succeeded { new_vehicle } => Ok(new_vehicle),
        CommandOutcome::Failed { reason } => Err(WorkflowError::CommandFailed { action, reason }),
    }
}

/// A command result reached a step that never issued a command
pub(crate) fn unexpected_result(tag: PhaseTag) -> WorkflowError {
    WorkflowError::Precondition(format!("unexpected command result during {tag:?}"))
}

/// Advance the run by one step
pub(crate) fn step(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    let before = state.phase.tag();
    let flow = match before {
        PhaseTag::RecallAll => recall::recall_all(state, ctx, resume),
        PhaseTag::RecallCleanup => recall::recall_cleanup(state, ctx, resume),
        PhaseTag::WaitStopped => recall::wait_stopped(state, ctx, resume),
        PhaseTag::Capture => liquidate::capture(state, ctx, resume),
        PhaseTag::Sell => liquidate::sell(state, ctx, resume),
        PhaseTag::Upgrade => liquidate::upgrade(state, ctx, resume),
        PhaseTag::Rebuild => rebuild::rebuild(state, ctx, resume),
        PhaseTag::Start => liquidate::start_all(state, ctx, resume),
        PhaseTag::Idle => Ok(Flow::Complete),
    }?;

    let after = state.phase.tag();
    if after != before {
        info!(run = %state.run_id, from = ?before, to = ?after, "phase transition");
    }
    Ok(flow)
}
