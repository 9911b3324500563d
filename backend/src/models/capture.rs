//! Captured fleet
//!
//! Blueprint of an owner's trains taken after they are all stopped in
//! depot and before they are sold. The [`CapturedFleet`] is the run-scoped
//! arena: it is built once by the capture phase, consumed by the rebuild
//! phase, and dropped wholesale on completion or bail-out.
//!
//! # Critical Invariants
//!
//! 1. **Grouping**: vehicles sharing an order list map to the same route index
//! 2. **Depot coverage**: the depot set holds exactly the distinct source depots
//! 3. **Capture order**: records are ordered by group, then by original
//!    relative order within the group

use crate::host::WorldView;
use crate::models::ids::{CargoId, EncodedOrder, OwnerId, SharedGroupId, TileIndex, UnitSlot, VehicleId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Order list shared by a group of vehicles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Encoded orders, in list order
    orders: Vec<EncodedOrder>,
    /// First replacement built for this route; later members clone it
    first_shared: Option<VehicleId>,
}

impl Route {
    pub fn new(orders: Vec<EncodedOrder>) -> Self {
        Self {
            orders,
            first_shared: None,
        }
    }

    pub fn orders(&self) -> &[EncodedOrder] {
        &self.orders
    }

    pub fn first_shared(&self) -> Option<VehicleId> {
        self.first_shared
    }

    /// Record the first replacement vehicle. Set once per run.
    pub fn assign_first_shared(&mut self, vehicle: VehicleId) {
        debug_assert!(
            self.first_shared.is_none(),
            "route already has a shared vehicle"
        );
        self.first_shared.get_or_insert(vehicle);
    }
}

/// Immutable blueprint of one original train
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleProperties {
    /// Depot tile the train was stopped in
    pub depot: TileIndex,
    /// Composition, head first
    pub slots: Vec<UnitSlot>,
    /// Index into [`CapturedFleet::routes`]
    pub route_index: usize,
}

impl VehicleProperties {
    /// Most common wagon cargo of the composition; ties go to the cargo that
    /// appears first. `None` for engine-only trains.
    pub fn majority_wagon_cargo(&self) -> Option<CargoId> {
        let mut counts: Vec<(CargoId, usize)> = Vec::new();
        for cargo in self.slots.iter().filter_map(|slot| slot.cargo()) {
            match counts.iter_mut().find(|(c, _)| *c == cargo) {
                Some((_, n)) => *n += 1,
                None => counts.push((cargo, 1)),
            }
        }
        // Strictly-greater keeps the earliest cargo on ties
        counts
            .into_iter()
            .fold(None, |best: Option<(CargoId, usize)>, (cargo, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((cargo, n)),
            })
            .map(|(cargo, _)| cargo)
    }
}

/// Deduplicated depot tiles touched by the captured fleet, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotSet {
    tiles: Vec<TileIndex>,
}

impl DepotSet {
    pub fn from_tiles(tiles: impl IntoIterator<Item = TileIndex>) -> Self {
        let mut tiles: Vec<TileIndex> = tiles.into_iter().collect();
        tiles.sort_unstable();
        tiles.dedup();
        Self { tiles }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TileIndex> {
        self.tiles.get(index).copied()
    }

    pub fn contains(&self, tile: TileIndex) -> bool {
        self.tiles.binary_search(&tile).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = TileIndex> + '_ {
        self.tiles.iter().copied()
    }
}

/// Raw reading of one train, before grouping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedVehicle {
    pub group: SharedGroupId,
    pub depot: TileIndex,
    pub slots: Vec<UnitSlot>,
    pub orders: Vec<EncodedOrder>,
}

/// Run-scoped arena of routes, vehicle blueprints and depots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFleet {
    pub routes: Vec<Route>,
    pub vehicles: Vec<VehicleProperties>,
    pub depots: DepotSet,
}

impl CapturedFleet {
    /// Read every primary train of `owner` from the world and group it
    pub fn capture(world: &dyn WorldView, owner: OwnerId) -> Self {
        let readings = world
            .primary_trains(owner)
            .into_iter()
            .map(|vehicle| CapturedVehicle {
                group: world.shared_group(vehicle),
                depot: world.vehicle_tile(vehicle),
                slots: world.unit_slots(vehicle),
                orders: world
                    .order_list(vehicle)
                    .into_iter()
                    .map(|order| order.encoded)
                    .collect(),
            })
            .collect();
        Self::from_readings(readings)
    }

    /// Group readings by shared-order identity.
    ///
    /// Readings are stably sorted by group, then each contiguous run becomes
    /// one route (orders taken from its first member) and contributes one
    /// blueprint per member in original relative order.
    pub fn from_readings(mut readings: Vec<CapturedVehicle>) -> Self {
        readings.sort_by_key(|reading| reading.group);

        let mut routes: Vec<Route> = Vec::new();
        let mut vehicles = Vec::with_capacity(readings.len());
        let mut current_group = None;

        for reading in readings {
            if current_group != Some(reading.group) {
                current_group = Some(reading.group);
                routes.push(Route::new(reading.orders));
            }
            vehicles.push(VehicleProperties {
                depot: reading.depot,
                slots: reading.slots,
                route_index: routes.len() - 1,
            });
        }

        let depots = DepotSet::from_tiles(vehicles.iter().map(|v| v.depot));
        Self {
            routes,
            vehicles,
            depots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// SHA256 over the captured routes' orders and the blueprints
    pub fn digest(&self) -> String {
        let orders: Vec<&[EncodedOrder]> = self.routes.iter().map(Route::orders).collect();
        let payload = serde_json::to_string(&(orders, &self.vehicles))
            .expect("captured fleet has only plain fields and always serializes");
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
