//! In-memory game world and command server shared by the integration tests.
//!
//! `SimWorld` answers the orchestrator's queries. `QueueChannel` only
//! records submissions; `Harness::tick` plays the server: it executes the
//! outstanding command against the world, delivers the result, moves
//! trains, then ticks the orchestrator.
#![allow(dead_code)]

use auto_upgrade_core_rs::host::{
    Command, CommandChannel, CommandOutcome, CommandTicket, EngineSpec, MapBounds, WorldView,
};
use auto_upgrade_core_rs::models::{
    CargoId, CargoMask, DepotId, EncodedOrder, EngineId, Order, OwnerId, RailType, SharedGroupId,
    TileIndex, UnitSlot, VehicleId,
};
use auto_upgrade_core_rs::{Orchestrator, WorkflowConfig};
use std::collections::{BTreeMap, BTreeSet};

pub const OWNER: OwnerId = OwnerId(0);
pub const COAL: CargoId = CargoId(1);
pub const MAIL: CargoId = CargoId(2);
pub const GOODS: CargoId = CargoId(3);

/// Encoded orders at or above this value are "go to depot" orders
pub const DEPOT_ORDER_BASE: u32 = 1000;

pub fn depot_order(depot: DepotId) -> EncodedOrder {
    EncodedOrder(DEPOT_ORDER_BASE + u32::from(depot.0))
}

fn decode(encoded: EncodedOrder) -> Order {
    let goto_depot = encoded
        .0
        .checked_sub(DEPOT_ORDER_BASE)
        .and_then(|id| u16::try_from(id).ok())
        .map(DepotId);
    Order {
        encoded,
        goto_depot,
    }
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Running,
    Heading { ticks_left: u32 },
    StoppedInDepot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimUnit {
    pub id: VehicleId,
    pub engine: EngineId,
    pub rail_type: RailType,
    pub powered: bool,
    /// Cargo the unit carries after refit
    pub cargo: Option<CargoId>,
}

/// A chain of units; engine-headed chains are primary trains
#[derive(Debug, Clone)]
pub struct SimTrain {
    pub owner: OwnerId,
    pub units: Vec<SimUnit>,
    pub tile: TileIndex,
    /// Depot the train drives to when recalled
    pub home_depot: TileIndex,
    pub group: SharedGroupId,
    pub motion: Motion,
    pub current_order: usize,
    pub started: bool,
    /// Individual recalls that will still fail for lack of a path; trains
    /// with failures left also ignore the mass recall
    pub depot_path_failures: u32,
}

impl SimTrain {
    pub fn head(&self) -> VehicleId {
        self.units[0].id
    }

    pub fn is_primary(&self) -> bool {
        self.units.first().is_some_and(|unit| unit.powered)
    }
}

/// Blueprint for seeding an original train
pub struct TrainSeed {
    pub units: Vec<UnitSlot>,
    pub orders: Vec<EncodedOrder>,
    pub depot: TileIndex,
    /// Trains seeded with the same group share one order list
    pub group: Option<SharedGroupId>,
    pub travel_ticks: u32,
    pub depot_path_failures: u32,
}

impl TrainSeed {
    pub fn new(units: Vec<UnitSlot>, orders: &[u32], depot: TileIndex) -> Self {
        Self {
            units,
            orders: orders.iter().map(|o| EncodedOrder(*o)).collect(),
            depot,
            group: None,
            travel_ticks: 5,
            depot_path_failures: 0,
        }
    }

    pub fn shared(mut self, group: u32) -> Self {
        self.group = Some(SharedGroupId(group));
        self
    }

    pub fn unreachable(mut self, failures: u32) -> Self {
        self.depot_path_failures = failures;
        self
    }

    pub fn with_order(mut self, order: EncodedOrder) -> Self {
        self.orders.push(order);
        self
    }
}

pub struct SimWorld {
    pub acting: Option<OwnerId>,
    pub trains: BTreeMap<VehicleId, SimTrain>,
    pub order_lists: BTreeMap<SharedGroupId, Vec<EncodedOrder>>,
    pub catalog: Vec<EngineSpec>,
    pub standard: CargoMask,
    pub track: BTreeMap<TileIndex, RailType>,
    pub depots: BTreeMap<TileIndex, DepotId>,
    /// Tiles the conversion leaves alone
    pub unconvertible: BTreeSet<TileIndex>,
    pub bounds: MapBounds,
    /// Built wagons join the newest train in their depot, as the game does
    /// when a free engine is waiting there
    pub auto_attach_wagons: bool,
    /// Commands matching this predicate report failure
    pub fail_when: Option<fn(&Command) -> bool>,
    next_id: u32,
    next_group: u32,
    /// Each train's travel time, keyed by head
    travel: BTreeMap<VehicleId, u32>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            acting: Some(OWNER),
            trains: BTreeMap::new(),
            order_lists: BTreeMap::new(),
            catalog: default_catalog(),
            standard: CargoMask::of(&[COAL, MAIL, GOODS]),
            track: BTreeMap::new(),
            depots: BTreeMap::new(),
            unconvertible: BTreeSet::new(),
            bounds: MapBounds {
                max_x: 256,
                max_y: 128,
                freeform_edges: true,
            },
            auto_attach_wagons: false,
            fail_when: None,
            next_id: 1,
            next_group: 1,
            travel: BTreeMap::new(),
        }
    }

    /// Register a rail depot at `tile`
    pub fn add_depot(&mut self, tile: TileIndex, depot: DepotId) {
        self.depots.insert(tile, depot);
        self.track.insert(tile, RailType::Rail);
    }

    fn alloc_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_group(&mut self) -> SharedGroupId {
        // Seeded groups use small numbers; fresh ones start far above them
        let group = SharedGroupId(10_000 + self.next_group);
        self.next_group += 1;
        group
    }

    /// Seed an original, running train on plain rail
    pub fn add_train(&mut self, seed: TrainSeed) -> VehicleId {
        let units: Vec<SimUnit> = seed
            .units
            .iter()
            .map(|slot| {
                let id = self.alloc_id();
                match slot {
                    UnitSlot::Engine => SimUnit {
                        id,
                        engine: OLD_ENGINE,
                        rail_type: RailType::Rail,
                        powered: true,
                        cargo: None,
                    },
                    UnitSlot::Wagon(cargo) => SimUnit {
                        id,
                        engine: OLD_WAGON,
                        rail_type: RailType::Rail,
                        powered: false,
                        cargo: Some(*cargo),
                    },
                }
            })
            .collect();
        let group = match seed.group {
            Some(group) => group,
            None => self.alloc_group(),
        };
        self.order_lists.entry(group).or_insert(seed.orders);

        let head = units[0].id;
        self.travel.insert(head, seed.travel_ticks);
        self.trains.insert(
            head,
            SimTrain {
                owner: OWNER,
                units,
                tile: TileIndex(900_000 + head.0),
                home_depot: seed.depot,
                group,
                motion: Motion::Running,
                current_order: 0,
                started: true,
                depot_path_failures: seed.depot_path_failures,
            },
        );
        head
    }

    fn train_containing(&self, unit: VehicleId) -> Option<&SimTrain> {
        self.trains
            .values()
            .find(|train| train.units.iter().any(|u| u.id == unit))
    }

    pub fn primary_of(&self, owner: OwnerId) -> Vec<&SimTrain> {
        self.trains
            .values()
            .filter(|train| train.owner == owner && train.is_primary())
            .collect()
    }

    pub fn orders_of(&self, train: &SimTrain) -> Vec<EncodedOrder> {
        self.order_lists.get(&train.group).cloned().unwrap_or_default()
    }

    /// Primary train of `owner` whose order list is `orders`
    pub fn train_with_orders(&self, orders: &[u32]) -> Vec<&SimTrain> {
        let wanted: Vec<EncodedOrder> = orders.iter().map(|o| EncodedOrder(*o)).collect();
        self.primary_of(OWNER)
            .into_iter()
            .filter(|train| self.orders_of(train) == wanted)
            .collect()
    }

    /// Move heading trains one tick closer to their depot
    pub fn advance(&mut self) {
        for train in self.trains.values_mut() {
            if let Motion::Heading { ticks_left } = train.motion {
                if ticks_left <= 1 {
                    train.motion = Motion::StoppedInDepot;
                    train.tile = train.home_depot;
                    train.started = false;
                } else {
                    train.motion = Motion::Heading {
                        ticks_left: ticks_left - 1,
                    };
                }
            }
        }
    }

    fn send_to_depot(&mut self, head: VehicleId) {
        let ticks = self.travel.get(&head).copied().unwrap_or(1);
        if let Some(train) = self.trains.get_mut(&head) {
            if train.motion == Motion::Running {
                train.motion = Motion::Heading { ticks_left: ticks };
            }
        }
    }

    fn spawn(&mut self, depot: TileIndex, units: Vec<SimUnit>, group: SharedGroupId) -> VehicleId {
        let head = units[0].id;
        self.trains.insert(
            head,
            SimTrain {
                owner: OWNER,
                units,
                tile: depot,
                home_depot: depot,
                group,
                motion: Motion::StoppedInDepot,
                current_order: 0,
                started: false,
                depot_path_failures: 0,
            },
        );
        head
    }

    /// Execute `command` the way the game server would
    pub fn apply(&mut self, command: &Command) -> CommandOutcome {
        if self.fail_when.is_some_and(|fails| fails(command)) {
            return CommandOutcome::failed("injected failure");
        }

        match command {
            Command::SendAllToDepot { owner } => {
                let heads: Vec<VehicleId> = self
                    .primary_of(*owner)
                    .into_iter()
                    .filter(|train| train.depot_path_failures == 0)
                    .map(SimTrain::head)
                    .collect();
                for head in heads {
                    self.send_to_depot(head);
                }
                CommandOutcome::ok()
            }
            Command::SendToDepot { vehicle, .. } => {
                let Some(train) = self.trains.get_mut(vehicle) else {
                    return CommandOutcome::failed("vehicle does not exist");
                };
                if train.depot_path_failures > 0 {
                    train.depot_path_failures -= 1;
                    return CommandOutcome::failed("Unable to find local depot");
                }
                self.send_to_depot(*vehicle);
                CommandOutcome::ok()
            }
            Command::SellAllInDepot { depot } => {
                self.trains.retain(|_, train| {
                    !(train.tile == *depot && train.motion == Motion::StoppedInDepot)
                });
                CommandOutcome::ok()
            }
            Command::ConvertRail { rail_type, .. } => {
                for (tile, track) in self.track.iter_mut() {
                    if !self.unconvertible.contains(tile) {
                        *track = *rail_type;
                    }
                }
                CommandOutcome::ok()
            }
            Command::BuildVehicle {
                depot,
                engine,
                refit,
            } => {
                let Some(spec) = self.catalog.iter().find(|s| s.id == *engine).cloned() else {
                    return CommandOutcome::failed("engine not available");
                };
                let id = self.alloc_id();
                let unit = SimUnit {
                    id,
                    engine: spec.id,
                    rail_type: spec.rail_type,
                    powered: spec.is_powered(),
                    cargo: *refit,
                };
                if !unit.powered && self.auto_attach_wagons {
                    let newest = self
                        .trains
                        .values_mut()
                        .filter(|train| train.tile == *depot && train.is_primary())
                        .max_by_key(|train| train.head());
                    if let Some(train) = newest {
                        train.units.push(unit);
                        return CommandOutcome::built(id);
                    }
                }
                let group = self.alloc_group();
                self.order_lists.insert(group, Vec::new());
                self.spawn(*depot, vec![unit], group);
                CommandOutcome::built(id)
            }
            Command::CloneVehicle { depot, source } => {
                let Some(original) = self.trains.get(source).cloned() else {
                    return CommandOutcome::failed("source vehicle does not exist");
                };
                let units = original
                    .units
                    .iter()
                    .map(|unit| SimUnit {
                        id: self.alloc_id(),
                        ..unit.clone()
                    })
                    .collect();
                let head = self.spawn(*depot, units, original.group);
                CommandOutcome::built(head)
            }
            Command::MoveRailVehicle { unit, after, .. } => {
                let Some(moved) = self.trains.remove(unit) else {
                    return CommandOutcome::failed("unit is not a free chain");
                };
                let Some(target) = self
                    .trains
                    .values_mut()
                    .find(|train| train.units.iter().any(|u| u.id == *after))
                else {
                    return CommandOutcome::failed("destination train does not exist");
                };
                target.units.extend(moved.units);
                CommandOutcome::ok()
            }
            Command::InsertOrder {
                vehicle,
                index,
                order,
                ..
            } => {
                let Some(group) = self.trains.get(vehicle).map(|train| train.group) else {
                    return CommandOutcome::failed("vehicle does not exist");
                };
                let list = self.order_lists.entry(group).or_default();
                if *index > list.len() {
                    return CommandOutcome::failed("order index out of range");
                }
                list.insert(*index, *order);
                CommandOutcome::ok()
            }
            Command::SkipToOrder { vehicle, index, .. } => match self.trains.get_mut(vehicle) {
                Some(train) => {
                    train.current_order = *index;
                    CommandOutcome::ok()
                }
                None => CommandOutcome::failed("vehicle does not exist"),
            },
            Command::MassStart { owner } => {
                for train in self.trains.values_mut() {
                    if train.owner == *owner && train.is_primary() {
                        train.started = true;
                        train.motion = Motion::Running;
                    }
                }
                CommandOutcome::ok()
            }
        }
    }
}

impl WorldView for SimWorld {
    fn acting_owner(&self) -> Option<OwnerId> {
        self.acting
    }

    fn primary_trains(&self, owner: OwnerId) -> Vec<VehicleId> {
        self.primary_of(owner).into_iter().map(SimTrain::head).collect()
    }

    fn vehicle_tile(&self, vehicle: VehicleId) -> TileIndex {
        self.trains
            .get(&vehicle)
            .map_or(TileIndex(0), |train| train.tile)
    }

    fn is_stopped_in_depot(&self, vehicle: VehicleId) -> bool {
        self.trains
            .get(&vehicle)
            .is_some_and(|train| train.motion == Motion::StoppedInDepot)
    }

    fn current_order(&self, vehicle: VehicleId) -> Option<Order> {
        let train = self.trains.get(&vehicle)?;
        match train.motion {
            Motion::Heading { .. } => {
                let depot = self.depots.get(&train.home_depot).copied()?;
                Some(decode(depot_order(depot)))
            }
            _ => self
                .orders_of(train)
                .get(train.current_order)
                .copied()
                .map(decode),
        }
    }

    fn current_order_index(&self, vehicle: VehicleId) -> usize {
        self.trains
            .get(&vehicle)
            .map_or(0, |train| train.current_order)
    }

    fn order_list(&self, vehicle: VehicleId) -> Vec<Order> {
        self.trains
            .get(&vehicle)
            .map(|train| self.orders_of(train).into_iter().map(decode).collect())
            .unwrap_or_default()
    }

    fn shared_group(&self, vehicle: VehicleId) -> SharedGroupId {
        self.trains
            .get(&vehicle)
            .map_or(SharedGroupId(0), |train| train.group)
    }

    fn unit_slots(&self, vehicle: VehicleId) -> Vec<UnitSlot> {
        self.trains
            .get(&vehicle)
            .map(|train| {
                train
                    .units
                    .iter()
                    .map(|unit| match (unit.powered, unit.cargo) {
                        (false, Some(cargo)) => UnitSlot::Wagon(cargo),
                        _ => UnitSlot::Engine,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn head_of(&self, unit: VehicleId) -> VehicleId {
        self.train_containing(unit).map_or(unit, SimTrain::head)
    }

    fn last_unit(&self, head: VehicleId) -> VehicleId {
        self.trains
            .get(&head)
            .and_then(|train| train.units.last())
            .map_or(head, |unit| unit.id)
    }

    fn buildable_engines(&self, _owner: OwnerId) -> Vec<EngineSpec> {
        self.catalog.clone()
    }

    fn standard_cargos(&self) -> CargoMask {
        self.standard
    }

    fn rail_type_at(&self, tile: TileIndex) -> Option<RailType> {
        self.track.get(&tile).copied()
    }

    fn depot_at(&self, tile: TileIndex) -> Option<DepotId> {
        self.depots.get(&tile).copied()
    }

    fn map_bounds(&self) -> MapBounds {
        self.bounds
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub const OLD_ENGINE: EngineId = EngineId(1);
pub const OLD_WAGON: EngineId = EngineId(2);
/// Fast electric engine; the expected pick
pub const FAST_ENGINE: EngineId = EngineId(10);
/// Slower but stronger electric engine
pub const STRONG_ENGINE: EngineId = EngineId(11);
/// Electric engine that can also carry mail
pub const MAIL_ENGINE: EngineId = EngineId(12);
pub const COAL_WAGON: EngineId = EngineId(20);
pub const MAIL_WAGON: EngineId = EngineId(21);
/// Articulated wagon whose second part carries goods
pub const GOODS_WAGON: EngineId = EngineId(22);

pub fn spec(
    id: EngineId,
    rail_type: RailType,
    power: u32,
    max_speed: u32,
    cost: i64,
    parts: &[&[CargoId]],
) -> EngineSpec {
    EngineSpec {
        id,
        rail_type,
        power,
        max_speed,
        cost,
        articulated_refit_masks: parts.iter().map(|cargos| CargoMask::of(cargos)).collect(),
    }
}

pub fn default_catalog() -> Vec<EngineSpec> {
    vec![
        spec(OLD_ENGINE, RailType::Rail, 1000, 100, 10_000, &[&[]]),
        spec(OLD_WAGON, RailType::Rail, 0, 100, 1_000, &[&[COAL, MAIL]]),
        spec(STRONG_ENGINE, RailType::Electric, 3000, 140, 90_000, &[&[]]),
        spec(FAST_ENGINE, RailType::Electric, 2000, 160, 80_000, &[&[]]),
        spec(MAIL_ENGINE, RailType::Electric, 1500, 150, 70_000, &[&[MAIL]]),
        spec(COAL_WAGON, RailType::Electric, 0, 160, 2_000, &[&[COAL]]),
        spec(MAIL_WAGON, RailType::Electric, 0, 160, 2_500, &[&[MAIL]]),
        spec(GOODS_WAGON, RailType::Electric, 0, 120, 3_000, &[&[], &[GOODS]]),
    ]
}

// ============================================================================
// Channel and harness
// ============================================================================

/// Records submissions; the harness executes them
#[derive(Debug, Default)]
pub struct QueueChannel {
    pub outstanding: Option<(CommandTicket, Command)>,
    /// Every accepted command, in order
    pub accepted: Vec<Command>,
    /// Submissions made while another command was outstanding
    pub violations: usize,
    /// Refuse submissions matching this predicate
    pub refuse_when: Option<fn(&Command) -> bool>,
}

impl CommandChannel for QueueChannel {
    fn submit(&mut self, ticket: CommandTicket, command: &Command) -> bool {
        if self.outstanding.is_some() {
            self.violations += 1;
        }
        if self.refuse_when.is_some_and(|refuses| refuses(command)) {
            return false;
        }
        self.accepted.push(command.clone());
        self.outstanding = Some((ticket, command.clone()));
        true
    }
}

impl QueueChannel {
    pub fn count(&self, opcode: &str) -> usize {
        self.accepted
            .iter()
            .filter(|command| command.opcode() == opcode)
            .count()
    }
}

pub struct Harness {
    pub world: SimWorld,
    pub channel: QueueChannel,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new(world: SimWorld) -> Self {
        Self::with_config(world, WorkflowConfig::default())
    }

    pub fn with_config(world: SimWorld, config: WorkflowConfig) -> Self {
        Self {
            world,
            channel: QueueChannel::default(),
            orchestrator: Orchestrator::new(config).unwrap(),
        }
    }

    pub fn start(&mut self, token: &str) -> Result<(), auto_upgrade_core_rs::StartError> {
        self.orchestrator
            .start(token, &self.world, &mut self.channel)
            .map(|_| ())
    }

    /// One host tick: finish the outstanding command, move trains, pump
    pub fn tick(&mut self) {
        if let Some((ticket, command)) = self.channel.outstanding.take() {
            let outcome = self.world.apply(&command);
            self.orchestrator.on_command_result(ticket, outcome);
        }
        self.world.advance();
        self.orchestrator.on_tick(&self.world, &mut self.channel);
    }

    /// Tick until the run ends; returns the ticks spent
    pub fn run_to_idle(&mut self, max_ticks: u64) -> u64 {
        for spent in 1..=max_ticks {
            self.tick();
            if !self.orchestrator.is_running() {
                return spent;
            }
        }
        panic!("run still active after {max_ticks} ticks");
    }

    /// Event type names in log order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.orchestrator
            .event_log()
            .events()
            .iter()
            .map(|event| event.event_type())
            .collect()
    }

    /// Rendered console lines
    pub fn messages(&self) -> Vec<String> {
        self.orchestrator
            .event_log()
            .events()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}
