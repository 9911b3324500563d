//! Workflow configuration
//!
//! Timing knobs for the upgrade run. Every field has a default matching the
//! host's usual 30 ticks per second, so an empty JSON object is a valid
//! configuration.
//!
//! # Example
//!
//! ```rust
//! use auto_upgrade_core_rs::WorkflowConfig;
//!
//! let config = WorkflowConfig::from_json(r#"{ "settle_seconds": 2 }"#).unwrap();
//! assert_eq!(config.settle_seconds, 2);
//! assert_eq!(config.max_recall_passes, Some(300));
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised while loading or validating a [`WorkflowConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Timing and retry parameters of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Rate of the host tick clock
    pub ticks_per_second: u32,

    /// Delay inserted after every state-changing step so the world settles
    pub settle_seconds: u32,

    /// Cadence (in ticks) of the all-stopped poll and the recall retry pass
    pub poll_interval_ticks: u32,

    /// Maximum recall-cleanup passes before giving up; `None` retries forever
    pub max_recall_passes: Option<u32>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 30,
            settle_seconds: 1,
            poll_interval_ticks: 1,
            max_recall_passes: Some(300),
        }
    }
}

impl WorkflowConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: WorkflowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid(
                "ticks_per_second must be > 0".to_string(),
            ));
        }
        if self.settle_seconds == 0 {
            return Err(ConfigError::Invalid(
                "settle_seconds must be > 0".to_string(),
            ));
        }
        if self.poll_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ticks must be > 0".to_string(),
            ));
        }
        if self.max_recall_passes == Some(0) {
            return Err(ConfigError::Invalid(
                "max_recall_passes must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// SHA256 of the canonical JSON form, recorded in run snapshots
    pub fn hash(&self) -> String {
        // Struct fields serialize in declaration order, so the JSON is canonical
        let json =
            serde_json::to_string(self).expect("config has only plain fields and always serializes");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
