//! Checkpoint - Run Snapshots
//!
//! Serializable view of an active run for host-side inspection and
//! persistence.
//!
//! # Critical Invariants
//!
//! - **Grouping**: every captured vehicle points at an existing route
//! - **Depot coverage**: the depot set holds exactly the distinct depots of
//!   the captured vehicles, so `depots <= vehicles`
//! - **Digest**: `fleet_digest` is the digest of `fleet`
//! - **Config matching**: `config_hash` identifies the config the run used

use super::phase::PhaseTag;
use crate::config::WorkflowConfig;
use crate::models::capture::{CapturedFleet, DepotSet};
use crate::models::ids::{OwnerId, RailType};
use crate::models::state::RunId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Point-in-time copy of the active run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: RunId,

    pub phase: PhaseTag,

    /// Orchestrator tick at the time of the snapshot
    pub tick: u64,

    pub owner: OwnerId,

    pub rail_type: RailType,

    /// Captured blueprint; empty before the capture phase
    pub fleet: CapturedFleet,

    /// SHA256 of the run's config
    pub config_hash: String,

    /// SHA256 of the captured routes and vehicles
    pub fleet_digest: String,

    /// Whether a suspension was pending
    pub suspended: bool,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot validation failed: {0}")]
    Invalid(String),
}

impl RunSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the snapshot was taken under `config`
    pub fn matches_config(&self, config: &WorkflowConfig) -> bool {
        self.config_hash == config.hash()
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate snapshot integrity
///
/// Checks the capture invariants:
/// - Route referential integrity
/// - Depot set coverage
/// - Fleet digest
pub fn validate_snapshot(snapshot: &RunSnapshot) -> Result<(), SnapshotError> {
    let fleet = &snapshot.fleet;

    // 1. Route referential integrity
    for (record, vehicle) in fleet.vehicles.iter().enumerate() {
        if vehicle.route_index >= fleet.routes.len() {
            return Err(SnapshotError::Invalid(format!(
                "Vehicle record {} refers to missing route {}",
                record, vehicle.route_index
            )));
        }
    }

    // 2. Depot coverage
    let expected = DepotSet::from_tiles(fleet.vehicles.iter().map(|v| v.depot));
    if expected != fleet.depots {
        return Err(SnapshotError::Invalid(format!(
            "Depot set has {} depots, captured vehicles use {}",
            fleet.depots.len(),
            expected.len()
        )));
    }

    // 3. Digest
    if fleet.digest() != snapshot.fleet_digest {
        return Err(SnapshotError::Invalid(
            "Fleet digest does not match captured fleet".to_string(),
        ));
    }

    Ok(())
}
