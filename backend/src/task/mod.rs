//! Suspendable task - the continuation primitive
//!
//! Bridges the host's tick clock and its asynchronous command channel to the
//! sequential phase logic. A run holds at most one pending suspension:
//!
//! - **Command**: a request was accepted by the channel; the task resumes
//!   with its result once the host delivers it.
//! - **Ticks**: the task resumes after exactly `n` further ticks.
//!
//! Results are stored on delivery and handed back on the next tick, so
//! phase logic only ever runs from the tick pump.
//!
//! # Critical Invariants
//!
//! 1. **Single pending suspension**: suspending while suspended panics
//! 2. **Single flight**: a command suspension exists iff one request is
//!    outstanding on the channel
//! 3. **Run identity**: results carrying a stale run id, or arriving after
//!    [`SuspendableTask::cancel`], are ignored
//! 4. **Orphans**: a command still in flight when its run is cancelled stays
//!    on the channel; [`SuspendableTask::begin`] refuses a new run until its
//!    result has been delivered
//!
//! # Example
//!
//! ```rust
//! use auto_upgrade_core_rs::task::{Resume, SuspendableTask};
//! use auto_upgrade_core_rs::models::RunId;
//!
//! let mut task = SuspendableTask::new();
//! task.begin(RunId::new());
//! task.suspend_on_ticks(2);
//!
//! assert!(task.on_tick().is_none());
//! assert_eq!(task.on_tick(), Some(Resume::Continue));
//! assert!(!task.is_suspended());
//! ```

use crate::host::{Command, CommandChannel, CommandOutcome, CommandTicket};
use crate::models::state::RunId;
use thiserror::Error;
use tracing::debug;

/// Value a suspension resumes with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// Fresh entry, or a tick delay elapsed
    Continue,
    /// The awaited command finished
    Completed(CommandOutcome),
}

/// The channel refused a submission outright
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("command channel refused {opcode}")]
pub struct SubmitRejected {
    pub opcode: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Command {
        ticket: CommandTicket,
        outcome: Option<CommandOutcome>,
    },
    Ticks {
        remaining: u32,
    },
}

/// One logical thread of control that suspends on commands or tick counts
#[derive(Debug, Default)]
pub struct SuspendableTask {
    /// Identity of the run currently owning the task
    run: Option<RunId>,
    /// Sequence number for the next ticket
    next_seq: u64,
    pending: Option<Pending>,
    /// Command of a cancelled run whose result has not arrived yet
    orphan: Option<CommandTicket>,
    /// Results dropped because they did not match the pending suspension
    ignored_results: u64,
}

impl SuspendableTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the task to a new run
    pub fn begin(&mut self, run: RunId) {
        assert!(
            self.pending.is_none(),
            "cannot begin a run while a suspension is pending"
        );
        assert!(
            self.orphan.is_none(),
            "cannot begin a run while a cancelled command is in flight"
        );
        self.run = Some(run);
        self.next_seq = 0;
    }

    pub fn run(&self) -> Option<RunId> {
        self.run
    }

    pub fn is_suspended(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a command is outstanding on the channel
    pub fn awaiting_command(&self) -> bool {
        matches!(
            self.pending,
            Some(Pending::Command { outcome: None, .. })
        )
    }

    /// Ticket of a cancelled run's command still outstanding on the channel
    pub fn orphaned_command(&self) -> Option<CommandTicket> {
        self.orphan
    }

    pub fn ignored_results(&self) -> u64 {
        self.ignored_results
    }

    /// Submit `command` and suspend until its result is delivered.
    ///
    /// Nothing is suspended if the channel refuses the submission.
    pub fn suspend_on_command(
        &mut self,
        channel: &mut dyn CommandChannel,
        command: &Command,
    ) -> Result<CommandTicket, SubmitRejected> {
        assert!(self.pending.is_none(), "a suspension is already pending");
        let run = self.run.expect("task has no active run");

        let ticket = CommandTicket {
            run,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        if !channel.submit(ticket, command) {
            return Err(SubmitRejected {
                opcode: command.opcode(),
            });
        }
        debug!(seq = ticket.seq, command = %command, "suspended on command");
        self.pending = Some(Pending::Command {
            ticket,
            outcome: None,
        });
        Ok(ticket)
    }

    /// Suspend for `ticks` ticks. Zero is treated as one: a suspension
    /// always spans at least one tick.
    pub fn suspend_on_ticks(&mut self, ticks: u32) {
        assert!(self.pending.is_none(), "a suspension is already pending");
        debug!(ticks, "suspended on ticks");
        self.pending = Some(Pending::Ticks {
            remaining: ticks.max(1),
        });
    }

    /// Store the result of an outstanding command.
    ///
    /// Returns `false` (and ignores the result) unless it answers the
    /// pending command of the current run. The result of an orphaned
    /// command is ignored too, but frees the channel for a new run.
    pub fn deliver(&mut self, ticket: CommandTicket, result: CommandOutcome) -> bool {
        if self.orphan == Some(ticket) {
            debug!(seq = ticket.seq, "orphaned command finished");
            self.orphan = None;
            self.ignored_results += 1;
            return false;
        }
        match &mut self.pending {
            Some(Pending::Command {
                ticket: pending,
                outcome: outcome @ None,
            }) if *pending == ticket && self.run == Some(ticket.run) => {
                *outcome = Some(result);
                true
            }
            _ => {
                debug!(seq = ticket.seq, "ignoring stale command result");
                self.ignored_results += 1;
                false
            }
        }
    }

    /// Advance one tick. Returns the resume value when the pending
    /// suspension completes on this tick.
    pub fn on_tick(&mut self) -> Option<Resume> {
        match self.pending.take() {
            None => None,
            Some(Pending::Ticks { remaining }) if remaining <= 1 => Some(Resume::Continue),
            Some(Pending::Ticks { remaining }) => {
                self.pending = Some(Pending::Ticks {
                    remaining: remaining - 1,
                });
                None
            }
            Some(Pending::Command {
                outcome: Some(outcome),
                ..
            }) => Some(Resume::Completed(outcome)),
            Some(waiting @ Pending::Command { outcome: None, .. }) => {
                self.pending = Some(waiting);
                None
            }
        }
    }

    /// Drop the pending continuation without resuming it and forget the
    /// run, so late results are ignored. A command still awaiting its result
    /// is remembered as orphaned until that result arrives.
    pub fn cancel(&mut self) {
        match self.pending.take() {
            Some(Pending::Command {
                ticket,
                outcome: None,
            }) => {
                debug!(seq = ticket.seq, "pending command orphaned");
                self.orphan = Some(ticket);
            }
            Some(_) => debug!("pending suspension cancelled"),
            None => {}
        }
        self.run = None;
    }
}
