//! Domain models for the auto-upgrade workflow

pub mod capture;
pub mod event;
pub mod ids;
pub mod state;

// Re-exports
pub use capture::{CapturedFleet, CapturedVehicle, DepotSet, Route, VehicleProperties};
pub use event::{Event, EventLog, Severity};
pub use ids::{
    CargoId, CargoMask, DepotId, EncodedOrder, EngineId, Order, OwnerId, ParseRailTypeError,
    RailType, SharedGroupId, TileIndex, UnitSlot, VehicleId,
};
pub use state::{RunId, WorkflowState};
