//! Identifier and value types shared with the host simulation.
//!
//! All identifiers are opaque newtypes around the host's integer handles.
//! The core never interprets them beyond equality and ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Map tile handle (linear tile index in the host world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileIndex(pub u32);

/// Vehicle handle (any unit, primary or not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

/// Purchasable unit design
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineId(pub u16);

/// Cargo type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CargoId(pub u8);

/// Owning actor (company)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u8);

/// Depot identity, as referenced by "go to depot" orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepotId(pub u16);

/// Shared-order group identity (the first vehicle of the shared list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SharedGroupId(pub u32);

/// Order record packed by the host; replayed verbatim on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedOrder(pub u32);

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0)
    }
}

impl fmt::Display for CargoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bit set of cargo types (bit `n` = `CargoId(n)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct CargoMask(pub u64);

impl CargoMask {
    pub const EMPTY: CargoMask = CargoMask(0);

    /// Mask containing exactly the given cargos
    pub fn of(cargos: &[CargoId]) -> Self {
        cargos
            .iter()
            .fold(Self::EMPTY, |mask, cargo| mask.with(*cargo))
    }

    pub fn with(self, cargo: CargoId) -> Self {
        if cargo.0 >= 64 {
            return self;
        }
        CargoMask(self.0 | (1u64 << cargo.0))
    }

    pub fn contains(self, cargo: CargoId) -> bool {
        cargo.0 < 64 && self.0 & (1u64 << cargo.0) != 0
    }

    pub fn union(self, other: CargoMask) -> Self {
        CargoMask(self.0 | other.0)
    }

    pub fn intersect(self, other: CargoMask) -> Self {
        CargoMask(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Track infrastructure kinds a fleet can be converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RailType {
    Rail,
    Electric,
    Monorail,
    Maglev,
}

impl RailType {
    pub const ALL: [RailType; 4] = [
        RailType::Rail,
        RailType::Electric,
        RailType::Monorail,
        RailType::Maglev,
    ];

    /// Start token accepted for this type
    pub fn token(self) -> &'static str {
        match self {
            RailType::Rail => "rail",
            RailType::Electric => "electric",
            RailType::Monorail => "monorail",
            RailType::Maglev => "maglev",
        }
    }
}

impl fmt::Display for RailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unrecognized rail type token
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown rail type '{0}' (expected rail, electric, monorail or maglev)")]
pub struct ParseRailTypeError(pub String);

impl FromStr for RailType {
    type Err = ParseRailTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RailType::ALL
            .into_iter()
            .find(|rail_type| rail_type.token() == s)
            .ok_or_else(|| ParseRailTypeError(s.to_string()))
    }
}

/// One physical position in a train's composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitSlot {
    /// Powered unit; replaced by the best traction unit
    Engine,
    /// Wagon carrying the given cargo
    Wagon(CargoId),
}

impl UnitSlot {
    pub fn cargo(self) -> Option<CargoId> {
        match self {
            UnitSlot::Engine => None,
            UnitSlot::Wagon(cargo) => Some(cargo),
        }
    }
}

/// An entry of a vehicle's order list as seen by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Host-packed record, replayed verbatim when rebuilding
    pub encoded: EncodedOrder,
    /// Destination depot when this is a "go to depot" order
    pub goto_depot: Option<DepotId>,
}

impl Order {
    pub fn is_goto_depot(&self) -> bool {
        self.goto_depot.is_some()
    }
}
