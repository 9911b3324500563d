//! Orchestrator Engine
//!
//! Owns the single active run and drives it from the host's tick clock.
//!
//! # Architecture
//!
//! The host calls into the orchestrator at three points:
//!
//! ```text
//! start(token)           validate, create the run, step to the first suspension
//! on_command_result(..)  store the result of the outstanding command
//! on_tick()              advance the clock, check the owner, resume the task
//! ```
//!
//! Every resumption goes through one pump that steps the current phase
//! until it suspends, completes or fails. Failures of any kind end in
//! [`Orchestrator::bail_out`], which logs the reason, cancels the pending
//! suspension and drops the run with everything it captured.
//!
//! # Example
//!
//! ```rust
//! use auto_upgrade_core_rs::{Orchestrator, WorkflowConfig};
//! use auto_upgrade_core_rs::orchestrator::PhaseTag;
//!
//! let orchestrator = Orchestrator::new(WorkflowConfig::default()).unwrap();
//! assert!(!orchestrator.is_running());
//! assert_eq!(orchestrator.phase(), PhaseTag::Idle);
//! ```

use super::checkpoint::RunSnapshot;
use super::phase::{self, Flow, PhaseTag, StepContext};
use crate::config::{ConfigError, WorkflowConfig};
use crate::core::time::TickClock;
use crate::host::{CommandChannel, CommandOutcome, CommandTicket, WorldView};
use crate::models::event::{Event, EventLog};
use crate::models::ids::{OwnerId, ParseRailTypeError, RailType};
use crate::models::state::{RunId, WorkflowState};
use crate::selection::SelectionError;
use crate::task::{Resume, SuspendableTask};
use thiserror::Error;
use tracing::{error, info, warn};

// ============================================================================
// Errors
// ============================================================================

/// Reasons a start request is refused. Apart from `Aborted`, nothing has
/// been issued when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    #[error("You must be in a company to do this action.")]
    NoActiveOwner,

    #[error(transparent)]
    UnknownRailType(#[from] ParseRailTypeError),

    #[error("Auto upgrade is already in progress.")]
    AlreadyRunning,

    /// A command of an earlier, aborted run has not reported back yet
    #[error("Previous auto upgrade command is still being processed.")]
    CommandInFlight,

    /// The run bailed out before reaching its first suspension
    #[error(transparent)]
    Aborted(WorkflowError),
}

/// Reasons an active run is aborted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The channel refused to accept a submission
    #[error("{action}: command refused by the server")]
    CommandRejected { action: &'static str },

    /// An accepted command reported failure
    #[error("{action}: {reason}")]
    CommandFailed {
        action: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Precondition(String),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The acting owner is no longer the run's owner
    #[error("Company changed.")]
    OwnerChanged,

    /// The host withdrew the run's context
    #[error("Auto upgrade aborted.")]
    Aborted,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives at most one upgrade run at a time
#[derive(Debug)]
pub struct Orchestrator {
    config: WorkflowConfig,

    /// Counts pumped ticks
    clock: TickClock,

    task: SuspendableTask,

    /// The active run; `None` while idle
    run: Option<WorkflowState>,

    event_log: EventLog,
}

impl Orchestrator {
    /// Create an idle orchestrator
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - ready to accept a start request
    /// * `Err(ConfigError)` - configuration validation failed
    pub fn new(config: WorkflowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            clock: TickClock::new(config.ticks_per_second),
            config,
            task: SuspendableTask::new(),
            run: None,
            event_log: EventLog::new(),
        })
    }

    /// Start upgrading the acting owner's fleet to the track type named by
    /// `token`.
    ///
    /// On success the run has already stepped up to its first suspension
    /// (the mass recall is outstanding on `channel`). If the run fails
    /// before that, it has already bailed out and the failure is returned
    /// as [`StartError::Aborted`].
    pub fn start(
        &mut self,
        token: &str,
        world: &dyn WorldView,
        channel: &mut dyn CommandChannel,
    ) -> Result<RunId, StartError> {
        let (owner, rail_type) = match self.validate_start(token, world) {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%token, error = %err, "start rejected");
                self.event_log.log(Event::StartRejected {
                    tick: self.clock.current_tick(),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let state = WorkflowState::new(owner, rail_type, self.clock.current_tick());
        let run_id = state.run_id;
        info!(run = %run_id, owner = owner.0, %rail_type, "auto upgrade started");

        self.task.begin(run_id);
        self.event_log.log(Event::RunStarted {
            tick: self.clock.current_tick(),
            owner,
            rail_type,
        });
        self.run = Some(state);
        match self.pump(world, channel, Resume::Continue) {
            Some(err) => Err(StartError::Aborted(err)),
            None => Ok(run_id),
        }
    }

    fn validate_start(
        &self,
        token: &str,
        world: &dyn WorldView,
    ) -> Result<(OwnerId, RailType), StartError> {
        let owner = world.acting_owner().ok_or(StartError::NoActiveOwner)?;
        let rail_type: RailType = token.parse()?;
        if self.run.is_some() {
            return Err(StartError::AlreadyRunning);
        }
        if self.task.orphaned_command().is_some() {
            return Err(StartError::CommandInFlight);
        }
        Ok((owner, rail_type))
    }

    /// Host tick: the only place a suspended run resumes
    pub fn on_tick(&mut self, world: &dyn WorldView, channel: &mut dyn CommandChannel) {
        self.clock.advance_tick();

        let Some(state) = &self.run else {
            return;
        };
        if world.acting_owner() != Some(state.owner) {
            self.bail_out(WorkflowError::OwnerChanged);
            return;
        }

        if let Some(resume) = self.task.on_tick() {
            self.pump(world, channel, resume);
        }
    }

    /// Host callback for an accepted command. Returns `false` when the
    /// result was ignored as stale.
    pub fn on_command_result(&mut self, ticket: CommandTicket, outcome: CommandOutcome) -> bool {
        self.task.deliver(ticket, outcome)
    }

    /// Abort the active run from outside. Returns whether a run was active.
    pub fn abort(&mut self) -> bool {
        self.bail_out(WorkflowError::Aborted)
    }

    /// Step the run until it suspends, completes or fails. Returns the
    /// error the run bailed out with, if it failed.
    fn pump(
        &mut self,
        world: &dyn WorldView,
        channel: &mut dyn CommandChannel,
        resume: Resume,
    ) -> Option<WorkflowError> {
        let mut resume = resume;
        loop {
            let Some(state) = self.run.as_mut() else {
                return None;
            };
            let mut ctx = StepContext {
                world,
                channel: &mut *channel,
                task: &mut self.task,
                events: &mut self.event_log,
                config: &self.config,
                tick: self.clock.current_tick(),
                settle_ticks: self.clock.seconds_to_ticks(self.config.settle_seconds),
            };

            match phase::step(state, &mut ctx, resume) {
                Ok(Flow::Continue) => resume = Resume::Continue,
                Ok(Flow::Suspended) => {
                    debug_assert!(self.task.is_suspended());
                    return None;
                }
                Ok(Flow::Complete) => {
                    self.complete();
                    return None;
                }
                Err(err) => {
                    self.bail_out(err.clone());
                    return Some(err);
                }
            }
        }
    }

    fn complete(&mut self) {
        let tick = self.clock.current_tick();
        if let Some(state) = self.run.take() {
            info!(
                run = %state.run_id,
                ticks = tick - state.started_at,
                vehicles = state.fleet.vehicles.len(),
                "auto upgrade complete"
            );
        }
        self.task.cancel();
        self.event_log.log(Event::RunCompleted { tick });
    }

    /// Failure handler: log `err`, cancel the pending suspension and drop
    /// the run. Calling it while idle does nothing.
    ///
    /// Returns whether a run was active.
    pub fn bail_out(&mut self, err: WorkflowError) -> bool {
        let Some(state) = self.run.take() else {
            return false;
        };
        let tick = self.clock.current_tick();
        let phase = state.phase.tag();
        error!(run = %state.run_id, ?phase, error = %err, "bailing out");

        self.task.cancel();
        self.event_log.log(Event::Failure {
            tick,
            phase,
            reason: err.to_string(),
        });
        self.event_log.log(Event::BailedOut { tick });
        true
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Current phase, `Idle` when no run is active
    pub fn phase(&self) -> PhaseTag {
        self.run
            .as_ref()
            .map_or(PhaseTag::Idle, |state| state.phase.tag())
    }

    /// The active run, if any
    pub fn state(&self) -> Option<&WorkflowState> {
        self.run.as_ref()
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.current_tick()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Take every logged event, e.g. to forward to the host console
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.event_log.drain()
    }

    /// Whether a suspension is pending
    pub fn is_suspended(&self) -> bool {
        self.task.is_suspended()
    }

    /// Command results dropped as stale since creation
    pub fn ignored_results(&self) -> u64 {
        self.task.ignored_results()
    }

    /// Serializable view of the active run
    pub fn snapshot(&self) -> Option<RunSnapshot> {
        self.run.as_ref().map(|state| RunSnapshot {
            run_id: state.run_id,
            phase: state.phase.tag(),
            tick: self.clock.current_tick(),
            owner: state.owner,
            rail_type: state.rail_type,
            fleet_digest: state.fleet.digest(),
            fleet: state.fleet.clone(),
            config_hash: self.config.hash(),
            suspended: self.task.is_suspended(),
        })
    }
}
