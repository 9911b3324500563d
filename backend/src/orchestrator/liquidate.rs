//! Capture, sell, upgrade and final start phases.

use super::engine::WorkflowError;
use super::phase::{expect_success, unexpected_result, Flow, Phase, PhaseTag, RebuildCursor, StepContext};
use crate::host::{Command, TileXY};
use crate::models::capture::CapturedFleet;
use crate::models::event::Event;
use crate::models::state::WorkflowState;
use crate::task::Resume;

/// Save routes and blueprints of the stopped fleet
pub(super) fn capture(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    if let Resume::Completed(_) = resume {
        return Err(unexpected_result(PhaseTag::Capture));
    }

    let fleet = CapturedFleet::capture(ctx.world, state.owner);
    ctx.log(Event::FleetCaptured {
        tick: ctx.tick,
        routes: fleet.routes.len(),
        vehicles: fleet.vehicles.len(),
        depots: fleet.depots.len(),
        digest: fleet.digest(),
    });
    state.fleet = fleet;
    state.phase = Phase::Sell { next_depot: 0 };
    Ok(ctx.settle())
}

/// Sell everything in the captured depots, one depot per step
pub(super) fn sell(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    const ACTION: &str = "Cannot sell all trains in depot";

    let Phase::Sell { next_depot } = &mut state.phase else {
        return Err(unexpected_result(PhaseTag::Sell));
    };

    match resume {
        Resume::Continue => {
            if *next_depot == 0 {
                ctx.log(Event::SellingStarted { tick: ctx.tick });
            }
            match state.fleet.depots.get(*next_depot) {
                Some(depot) => ctx.issue(Command::SellAllInDepot { depot }, ACTION),
                None => {
                    ctx.log(Event::AllSold { tick: ctx.tick });
                    state.phase = Phase::Upgrade;
                    Ok(ctx.settle())
                }
            }
        }
        Resume::Completed(outcome) => {
            expect_success(outcome, ACTION)?;
            if let Some(depot) = state.fleet.depots.get(*next_depot) {
                ctx.log(Event::DepotSold {
                    tick: ctx.tick,
                    depot,
                });
            }
            *next_depot += 1;
            Ok(ctx.settle())
        }
    }
}

/// Convert all track on the map to the target type
pub(super) fn upgrade(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    const ACTION: &str = "Failed to do a whole-map track upgrade";

    match resume {
        Resume::Continue => {
            let bounds = ctx.world.map_bounds();
            let margin = bounds.edge_margin();
            let command = Command::ConvertRail {
                from: TileXY {
                    x: bounds.max_x.saturating_sub(1),
                    y: bounds.max_y.saturating_sub(1),
                },
                to: TileXY {
                    x: margin,
                    y: margin,
                },
                rail_type: state.rail_type,
            };
            ctx.issue(command, ACTION)
        }
        Resume::Completed(outcome) => {
            expect_success(outcome, ACTION)?;
            ctx.log(Event::RailConverted {
                tick: ctx.tick,
                rail_type: state.rail_type,
            });
            ctx.log(Event::RebuildStarted { tick: ctx.tick });
            state.phase = Phase::Rebuild(RebuildCursor::at(0));
            Ok(ctx.settle())
        }
    }
}

/// Start every train of the owner and finish the run
pub(super) fn start_all(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    const ACTION: &str = "Cannot start all trains";

    match resume {
        Resume::Continue => ctx.issue(Command::MassStart { owner: state.owner }, ACTION),
        Resume::Completed(outcome) => {
            expect_success(outcome, ACTION)?;
            Ok(Flow::Complete)
        }
    }
}
