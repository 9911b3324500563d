//! Read-only query surface of the host simulation.
//!
//! The workflow never mutates the world directly; everything here is a
//! snapshot read taken at the moment the pump runs. Mutations go through
//! [`CommandChannel`](super::CommandChannel).

use crate::models::ids::{
    CargoMask, DepotId, EngineId, OwnerId, Order, RailType, SharedGroupId, TileIndex, UnitSlot,
    VehicleId,
};
use serde::{Deserialize, Serialize};

/// One purchasable unit design, as listed in the host's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSpec {
    pub id: EngineId,
    pub rail_type: RailType,
    /// Traction power; zero for wagons
    pub power: u32,
    /// Maximum speed as displayed to the player
    pub max_speed: u32,
    /// Purchase cost
    pub cost: i64,
    /// Refit masks of every articulated part, head first
    pub articulated_refit_masks: Vec<CargoMask>,
}

impl EngineSpec {
    pub fn is_powered(&self) -> bool {
        self.power > 0
    }

    /// Cargos this design can be refitted to: union over the articulated
    /// parts, restricted to the standard cargo set.
    pub fn refittable_cargos(&self, standard: CargoMask) -> CargoMask {
        self.articulated_refit_masks
            .iter()
            .fold(CargoMask::EMPTY, |acc, mask| acc.union(*mask))
            .intersect(standard)
    }
}

/// Map extent used to bound the whole-map conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapBounds {
    pub max_x: u32,
    pub max_y: u32,
    /// Freeform edges keep the outermost row/column unusable
    pub freeform_edges: bool,
}

impl MapBounds {
    pub fn edge_margin(&self) -> u32 {
        u32::from(self.freeform_edges)
    }
}

/// Read-only view of the host world consumed by the workflow
pub trait WorldView {
    /// Owner the local player currently acts for; `None` for spectators
    fn acting_owner(&self) -> Option<OwnerId>;

    /// Live primary trains of `owner`, in the host's iteration order
    fn primary_trains(&self, owner: OwnerId) -> Vec<VehicleId>;

    /// Tile the vehicle currently occupies
    fn vehicle_tile(&self, vehicle: VehicleId) -> TileIndex;

    fn is_stopped_in_depot(&self, vehicle: VehicleId) -> bool;

    /// Order the vehicle is executing right now, if any
    fn current_order(&self, vehicle: VehicleId) -> Option<Order>;

    /// Index of the current real order within `order_list`
    fn current_order_index(&self, vehicle: VehicleId) -> usize;

    fn order_list(&self, vehicle: VehicleId) -> Vec<Order>;

    /// Identity of the shared-order list the vehicle belongs to
    fn shared_group(&self, vehicle: VehicleId) -> SharedGroupId;

    /// Unit composition of a train, head first
    fn unit_slots(&self, vehicle: VehicleId) -> Vec<UnitSlot>;

    /// Head unit of the chain containing `unit`
    fn head_of(&self, unit: VehicleId) -> VehicleId;

    /// Last unit of the chain headed by `head`
    fn last_unit(&self, head: VehicleId) -> VehicleId;

    /// Train designs `owner` can buy right now
    fn buildable_engines(&self, owner: OwnerId) -> Vec<EngineSpec>;

    /// The standard cargo set of the running game
    fn standard_cargos(&self) -> CargoMask;

    /// Track type at a tile, if it carries track
    fn rail_type_at(&self, tile: TileIndex) -> Option<RailType>;

    /// Depot identity of a depot tile
    fn depot_at(&self, tile: TileIndex) -> Option<DepotId>;

    fn map_bounds(&self) -> MapBounds;
}
