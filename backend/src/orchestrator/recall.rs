//! Recall phases: bring every train of the owner to a stop inside a depot.

use super::engine::WorkflowError;
use super::phase::{expect_success, unexpected_result, Flow, Phase, PhaseTag, RecallPass, StepContext};
use crate::host::{Command, CommandOutcome, WorldView};
use crate::models::event::Event;
use crate::models::ids::{OwnerId, VehicleId};
use crate::models::state::WorkflowState;
use crate::task::Resume;
use tracing::warn;

/// Mass "send all trains to depot"
pub(super) fn recall_all(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    const ACTION: &str = "Failed to send all trains to depot";

    match resume {
        Resume::Continue => {
            ctx.log(Event::RecallIssued { tick: ctx.tick });
            ctx.issue(Command::SendAllToDepot { owner: state.owner }, ACTION)
        }
        Resume::Completed(outcome) => {
            expect_success(outcome, ACTION)?;
            state.phase = Phase::RecallCleanup(RecallPass::new(1));
            Ok(ctx.settle())
        }
    }
}

/// Individually recall trains the mass command missed.
///
/// Failures are deferred: the pass carries on with the next train and, if
/// any failed, a fresh pass starts after one poll interval. Only
/// exhausting `max_recall_passes` aborts.
pub(super) fn recall_cleanup(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    let owner = state.owner;
    let Phase::RecallCleanup(pass) = &mut state.phase else {
        return Err(unexpected_result(PhaseTag::RecallCleanup));
    };

    if let Resume::Completed(outcome) = resume {
        let vehicle = pass
            .in_flight
            .take()
            .ok_or_else(|| unexpected_result(PhaseTag::RecallCleanup))?;
        return match outcome {
            CommandOutcome::Succeeded { .. } => Ok(ctx.settle()),
            CommandOutcome::Failed { reason } => {
                defer(ctx, pass, vehicle, reason);
                Ok(Flow::Continue)
            }
        };
    }

    while let Some(vehicle) = next_unrecalled(ctx.world, owner, pass) {
        pass.attempted.insert(vehicle);
        let command = Command::SendToDepot {
            vehicle,
            tile: ctx.world.vehicle_tile(vehicle),
        };
        match ctx.task.suspend_on_command(&mut *ctx.channel, &command) {
            Ok(_) => {
                pass.in_flight = Some(vehicle);
                return Ok(Flow::Suspended);
            }
            // The host refusing a single recall (no path) is also deferred
            Err(rejected) => defer(ctx, pass, vehicle, rejected.to_string()),
        }
    }

    if pass.failed == 0 {
        ctx.log(Event::RecallComplete { tick: ctx.tick });
        ctx.log(Event::WaitingForStop { tick: ctx.tick });
        state.phase = Phase::WaitStopped;
        return Ok(Flow::Continue);
    }

    if let Some(limit) = ctx.config.max_recall_passes {
        if pass.pass >= limit {
            return Err(WorkflowError::Precondition(format!(
                "{} train(s) still cannot find a depot after {} recall passes",
                pass.failed, pass.pass
            )));
        }
    }
    *pass = RecallPass::new(pass.pass + 1);
    Ok(ctx.poll())
}

/// Wait until every train of the owner is stopped inside a depot
pub(super) fn wait_stopped(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    if let Resume::Completed(_) = resume {
        return Err(unexpected_result(PhaseTag::WaitStopped));
    }

    let world = ctx.world;
    let all_stopped = world
        .primary_trains(state.owner)
        .into_iter()
        .all(|vehicle| world.is_stopped_in_depot(vehicle));
    if !all_stopped {
        return Ok(ctx.poll());
    }

    ctx.log(Event::AllStopped { tick: ctx.tick });
    state.phase = Phase::Capture;
    Ok(ctx.settle())
}

/// First train not yet tried this pass that is neither stopped in a depot
/// nor already heading to one
fn next_unrecalled(world: &dyn WorldView, owner: OwnerId, pass: &RecallPass) -> Option<VehicleId> {
    world.primary_trains(owner).into_iter().find(|vehicle| {
        !pass.attempted.contains(vehicle)
            && !world.is_stopped_in_depot(*vehicle)
            && !world
                .current_order(*vehicle)
                .is_some_and(|order| order.is_goto_depot())
    })
}

fn defer(ctx: &mut StepContext<'_>, pass: &mut RecallPass, vehicle: VehicleId, reason: String) {
    warn!(%vehicle, pass = pass.pass, %reason, "recall deferred");
    pass.failed += 1;
    ctx.log(Event::RecallDeferred {
        tick: ctx.tick,
        vehicle,
        reason,
    });
}
