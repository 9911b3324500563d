//! Engine selection
//!
//! Picks the best purchasable unit for one slot of a train being rebuilt.
//!
//! # Ranking
//!
//! Candidates must run on the target rail type and be buildable by the
//! owner. Engines need traction power; wagons need zero power and must be
//! refittable to the requested cargo. Among candidates, the winner is
//! decided by, in order:
//!
//! 1. higher maximum displayed speed
//! 2. higher power (engines only)
//! 3. higher purchase cost
//!
//! Candidates equal on every key keep catalog order (first one wins).

use crate::host::EngineSpec;
use crate::models::ids::{CargoId, CargoMask, EngineId, RailType};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// What a slot needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Engine,
    Wagon(CargoId),
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRole::Engine => f.write_str("engine"),
            UnitRole::Wagon(cargo) => write!(f, "wagon for cargo = {cargo}"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Cannot find a suitable {role} on {rail_type} track")]
    NoCandidate { role: UnitRole, rail_type: RailType },
}

/// Build parameters for the chosen unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitChoice {
    pub engine: EngineId,
    /// Cargo to refit to at purchase, if any
    pub refit: Option<CargoId>,
}

/// Ranks a catalog of buildable designs
pub struct EngineSelector<'a> {
    catalog: &'a [EngineSpec],
    standard_cargos: CargoMask,
}

impl<'a> EngineSelector<'a> {
    pub fn new(catalog: &'a [EngineSpec], standard_cargos: CargoMask) -> Self {
        Self {
            catalog,
            standard_cargos,
        }
    }

    /// Designs eligible for `role` on `rail_type`
    pub fn candidates(
        &self,
        role: UnitRole,
        rail_type: RailType,
    ) -> impl Iterator<Item = &'a EngineSpec> + '_ {
        self.catalog.iter().filter(move |spec| {
            spec.rail_type == rail_type
                && match role {
                    UnitRole::Engine => spec.is_powered(),
                    UnitRole::Wagon(cargo) => {
                        !spec.is_powered()
                            && spec.refittable_cargos(self.standard_cargos).contains(cargo)
                    }
                }
        })
    }

    /// Best design for `role`, if any
    pub fn best(&self, role: UnitRole, rail_type: RailType) -> Option<&'a EngineSpec> {
        self.candidates(role, rail_type)
            .fold(None, |best: Option<&'a EngineSpec>, spec| match best {
                Some(incumbent) if rank(spec, incumbent, role) != Ordering::Greater => best,
                _ => Some(spec),
            })
    }

    /// Choose the unit for `role`.
    ///
    /// Engines are refitted to `wagon_cargo` when they can carry it, so a
    /// train's engine hauls the same cargo as its wagons; otherwise they are
    /// left unrefitted. Wagons are always refitted to their cargo.
    pub fn select(
        &self,
        role: UnitRole,
        rail_type: RailType,
        wagon_cargo: Option<CargoId>,
    ) -> Result<UnitChoice, SelectionError> {
        let best = self
            .best(role, rail_type)
            .ok_or(SelectionError::NoCandidate { role, rail_type })?;

        let refit = match role {
            UnitRole::Engine => wagon_cargo
                .filter(|cargo| best.refittable_cargos(self.standard_cargos).contains(*cargo)),
            UnitRole::Wagon(cargo) => Some(cargo),
        };

        Ok(UnitChoice {
            engine: best.id,
            refit,
        })
    }
}

/// Compare `a` against `b` by the tie-break keys for `role`
fn rank(a: &EngineSpec, b: &EngineSpec, role: UnitRole) -> Ordering {
    let power = match role {
        UnitRole::Engine => a.power.cmp(&b.power),
        UnitRole::Wagon(_) => Ordering::Equal,
    };
    a.max_speed
        .cmp(&b.max_speed)
        .then(power)
        .then(a.cost.cmp(&b.cost))
}
