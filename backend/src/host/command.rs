//! Mutating commands and the single-flight channel they travel through.
//!
//! The host accepts or refuses a submission synchronously and delivers the
//! result later by calling
//! [`Orchestrator::on_command_result`](crate::Orchestrator::on_command_result)
//! with the same ticket.

use crate::models::ids::{CargoId, EncodedOrder, EngineId, OwnerId, RailType, TileIndex, VehicleId};
use crate::models::state::RunId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile coordinate pair used for area commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileXY {
    pub x: u32,
    pub y: u32,
}

/// Every mutating request the workflow issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Send every train of the owner to a depot
    SendAllToDepot { owner: OwnerId },
    /// Send a single train to its nearest depot
    SendToDepot { vehicle: VehicleId, tile: TileIndex },
    /// Sell every train stopped in the depot
    SellAllInDepot { depot: TileIndex },
    /// Convert all track in the rectangle to `rail_type`
    ConvertRail {
        from: TileXY,
        to: TileXY,
        rail_type: RailType,
    },
    /// Buy one unit, optionally refitted
    BuildVehicle {
        depot: TileIndex,
        engine: EngineId,
        refit: Option<CargoId>,
    },
    /// Clone a train, sharing its orders
    CloneVehicle { depot: TileIndex, source: VehicleId },
    /// Attach `unit` behind `after`
    MoveRailVehicle {
        depot: TileIndex,
        unit: VehicleId,
        after: VehicleId,
    },
    InsertOrder {
        depot: TileIndex,
        vehicle: VehicleId,
        index: usize,
        order: EncodedOrder,
    },
    SkipToOrder {
        depot: TileIndex,
        vehicle: VehicleId,
        index: usize,
    },
    /// Start every train of the owner
    MassStart { owner: OwnerId },
}

impl Command {
    /// Tile the command is addressed at (zero for owner-wide commands)
    pub fn tile(&self) -> TileIndex {
        match self {
            Command::SendAllToDepot { .. } | Command::MassStart { .. } => TileIndex(0),
            Command::ConvertRail { .. } => TileIndex(0),
            Command::SendToDepot { tile, .. } => *tile,
            Command::SellAllInDepot { depot }
            | Command::BuildVehicle { depot, .. }
            | Command::CloneVehicle { depot, .. }
            | Command::MoveRailVehicle { depot, .. }
            | Command::InsertOrder { depot, .. }
            | Command::SkipToOrder { depot, .. } => *depot,
        }
    }

    /// Stable opcode name
    pub fn opcode(&self) -> &'static str {
        match self {
            Command::SendAllToDepot { .. } => "SendAllToDepot",
            Command::SendToDepot { .. } => "SendToDepot",
            Command::SellAllInDepot { .. } => "SellAllInDepot",
            Command::ConvertRail { .. } => "ConvertRail",
            Command::BuildVehicle { .. } => "BuildVehicle",
            Command::CloneVehicle { .. } => "CloneVehicle",
            Command::MoveRailVehicle { .. } => "MoveRailVehicle",
            Command::InsertOrder { .. } => "InsertOrder",
            Command::SkipToOrder { .. } => "SkipToOrder",
            Command::MassStart { .. } => "MassStart",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.opcode(), self.tile())
    }
}

/// Correlates an accepted submission with its later result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandTicket {
    pub run: RunId,
    pub seq: u64,
}

/// Asynchronous result of an accepted command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    Succeeded {
        /// Vehicle created by build/clone commands
        new_vehicle: Option<VehicleId>,
    },
    Failed { reason: String },
}

impl CommandOutcome {
    pub fn ok() -> Self {
        CommandOutcome::Succeeded { new_vehicle: None }
    }

    pub fn built(vehicle: VehicleId) -> Self {
        CommandOutcome::Succeeded {
            new_vehicle: Some(vehicle),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CommandOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded { .. })
    }
}

/// Single-flight asynchronous command channel provided by the host
pub trait CommandChannel {
    /// Submit `command`. Returns `false` if the host refuses it; an accepted
    /// submission produces exactly one later result for `ticket`.
    fn submit(&mut self, ticket: CommandTicket, command: &Command) -> bool;
}
