//! Rebuild phase
//!
//! Recreates one captured record per step, in capture order. The first
//! record of a route is built unit by unit, given the route's orders and
//! remembered as the route's shared vehicle; every later record of the same
//! route is a clone of it, which shares its orders. Either way the new
//! train is then skipped to the order that sends it to the depot it stands
//! in, if it has one.

use super::engine::WorkflowError;
use super::phase::{
    expect_success, unexpected_result, Flow, Phase, PhaseTag, RebuildCursor, RebuildStage,
    StepContext,
};
use crate::host::Command;
use crate::models::capture::VehicleProperties;
use crate::models::event::Event;
use crate::models::ids::{UnitSlot, VehicleId};
use crate::models::state::WorkflowState;
use crate::selection::{EngineSelector, UnitRole};
use crate::task::Resume;

const CLONE: &str = "Cannot share orders";
const BUILD: &str = "Cannot build engine/wagon";
const ATTACH: &str = "Cannot move wagon to train";
const INSERT: &str = "Cannot insert order";
const SKIP: &str = "Cannot skip to order";

pub(super) fn rebuild(
    state: &mut WorkflowState,
    ctx: &mut StepContext<'_>,
    resume: Resume,
) -> Result<Flow, WorkflowError> {
    let Phase::Rebuild(cursor) = state.phase else {
        return Err(unexpected_result(PhaseTag::Rebuild));
    };
    let Some(props) = state.fleet.vehicles.get(cursor.record).cloned() else {
        state.phase = Phase::StartAll;
        return Ok(Flow::Continue);
    };

    let (stage, flow) = match (cursor.stage, resume) {
        (RebuildStage::Begin, Resume::Continue) => begin(state, ctx, &props)?,

        (RebuildStage::Cloning, Resume::Completed(outcome)) => {
            let clone = expect_success(outcome, CLONE)?
                .ok_or_else(|| WorkflowError::Precondition("Clone reported no new vehicle".into()))?;
            let train = ctx.world.head_of(clone);
            ctx.log(Event::VehicleRebuilt {
                tick: ctx.tick,
                record: cursor.record,
                vehicle: train,
                cloned: true,
            });
            (RebuildStage::SkipToDepot { train }, ctx.settle())
        }

        (RebuildStage::BuildUnit { slot, head }, Resume::Continue) => {
            match (props.slots.get(slot), head) {
                (Some(unit_slot), _) => {
                    let flow = build_unit(state, ctx, &props, *unit_slot)?;
                    (RebuildStage::BuildUnit { slot, head }, flow)
                }
                (None, Some(head)) => (RebuildStage::InsertOrder { head, index: 0 }, Flow::Continue),
                (None, None) => return Err(no_units(&props)),
            }
        }

        (RebuildStage::BuildUnit { slot, head }, Resume::Completed(outcome)) => {
            let unit = expect_success(outcome, BUILD)?
                .ok_or_else(|| WorkflowError::Precondition("Build reported no new vehicle".into()))?;
            let next = match head {
                None => RebuildStage::BuildUnit {
                    slot: slot + 1,
                    head: Some(unit),
                },
                // Wagons may auto-attach to a train already in the depot
                Some(head) if ctx.world.head_of(unit) != head => {
                    RebuildStage::AttachUnit { slot, head, unit }
                }
                Some(head) => RebuildStage::BuildUnit {
                    slot: slot + 1,
                    head: Some(head),
                },
            };
            (next, ctx.settle())
        }

        (RebuildStage::AttachUnit { head, unit, .. }, Resume::Continue) => {
            let command = Command::MoveRailVehicle {
                depot: props.depot,
                unit,
                after: ctx.world.last_unit(head),
            };
            (cursor.stage, ctx.issue(command, ATTACH)?)
        }

        (RebuildStage::AttachUnit { slot, head, .. }, Resume::Completed(outcome)) => {
            expect_success(outcome, ATTACH)?;
            let next = RebuildStage::BuildUnit {
                slot: slot + 1,
                head: Some(head),
            };
            (next, ctx.settle())
        }

        (RebuildStage::InsertOrder { head, index }, Resume::Continue) => {
            let route = state
                .fleet
                .routes
                .get_mut(props.route_index)
                .ok_or_else(|| missing_route(&props))?;
            match route.orders().get(index).copied() {
                Some(order) => {
                    let command = Command::InsertOrder {
                        depot: props.depot,
                        vehicle: head,
                        index,
                        order,
                    };
                    (cursor.stage, ctx.issue(command, INSERT)?)
                }
                None => {
                    route.assign_first_shared(head);
                    ctx.log(Event::VehicleRebuilt {
                        tick: ctx.tick,
                        record: cursor.record,
                        vehicle: head,
                        cloned: false,
                    });
                    (RebuildStage::SkipToDepot { train: head }, Flow::Continue)
                }
            }
        }

        (RebuildStage::InsertOrder { head, index }, Resume::Completed(outcome)) => {
            expect_success(outcome, INSERT)?;
            let next = RebuildStage::InsertOrder {
                head,
                index: index + 1,
            };
            (next, ctx.settle())
        }

        (RebuildStage::SkipToDepot { train }, Resume::Continue) => {
            match depot_order_to_skip_to(ctx, &props, train) {
                Some(index) => {
                    let command = Command::SkipToOrder {
                        depot: props.depot,
                        vehicle: train,
                        index,
                    };
                    (cursor.stage, ctx.issue(command, SKIP)?)
                }
                None => return Ok(next_record(state, cursor.record)),
            }
        }

        (RebuildStage::SkipToDepot { .. }, Resume::Completed(outcome)) => {
            expect_success(outcome, SKIP)?;
            return Ok(next_record(state, cursor.record));
        }

        (RebuildStage::Begin, Resume::Completed(_))
        | (RebuildStage::Cloning, Resume::Continue) => {
            return Err(unexpected_result(PhaseTag::Rebuild));
        }
    };

    state.phase = Phase::Rebuild(RebuildCursor {
        record: cursor.record,
        stage,
    });
    Ok(flow)
}

/// Verify the depot was converted, then clone or start building
fn begin(
    state: &WorkflowState,
    ctx: &mut StepContext<'_>,
    props: &VehicleProperties,
) -> Result<(RebuildStage, Flow), WorkflowError> {
    if ctx.world.rail_type_at(props.depot) != Some(state.rail_type) {
        return Err(WorkflowError::Precondition(format!(
            "Depot at {} was not upgraded to {}",
            props.depot, state.rail_type
        )));
    }

    let route = state
        .fleet
        .routes
        .get(props.route_index)
        .ok_or_else(|| missing_route(props))?;
    if let Some(source) = route.first_shared() {
        let command = Command::CloneVehicle {
            depot: props.depot,
            source,
        };
        let flow = ctx.issue(command, CLONE)?;
        return Ok((RebuildStage::Cloning, flow));
    }

    if props.slots.is_empty() {
        return Err(no_units(props));
    }
    Ok((RebuildStage::BuildUnit { slot: 0, head: None }, Flow::Continue))
}

/// Pick and buy the unit for one slot
fn build_unit(
    state: &WorkflowState,
    ctx: &mut StepContext<'_>,
    props: &VehicleProperties,
    slot: UnitSlot,
) -> Result<Flow, WorkflowError> {
    let role = match slot {
        UnitSlot::Engine => UnitRole::Engine,
        UnitSlot::Wagon(cargo) => UnitRole::Wagon(cargo),
    };
    let catalog = ctx.world.buildable_engines(state.owner);
    let selector = EngineSelector::new(&catalog, ctx.world.standard_cargos());
    let choice = selector.select(role, state.rail_type, props.majority_wagon_cargo())?;

    let command = Command::BuildVehicle {
        depot: props.depot,
        engine: choice.engine,
        refit: choice.refit,
    };
    ctx.issue(command, BUILD)
}

/// Index of the order sending `train` to the depot it stands in, when that
/// is not already its current order
fn depot_order_to_skip_to(
    ctx: &StepContext<'_>,
    props: &VehicleProperties,
    train: VehicleId,
) -> Option<usize> {
    let depot = ctx.world.depot_at(props.depot)?;
    let index = ctx
        .world
        .order_list(train)
        .iter()
        .position(|order| order.goto_depot == Some(depot))?;
    (index != ctx.world.current_order_index(train)).then_some(index)
}

fn next_record(state: &mut WorkflowState, record: usize) -> Flow {
    state.phase = Phase::Rebuild(RebuildCursor::at(record + 1));
    Flow::Continue
}

fn no_units(props: &VehicleProperties) -> WorkflowError {
    WorkflowError::Precondition(format!(
        "Captured train in depot at {} has zero buildable units",
        props.depot
    ))
}

fn missing_route(props: &VehicleProperties) -> WorkflowError {
    WorkflowError::Precondition(format!("Captured route {} does not exist", props.route_index))
}
