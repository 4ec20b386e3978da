//! Simulation Configuration
//!
//! Node parameters are plain serde structs so an experiment can be described
//! in a JSON document and loaded in one call:
//!
//! ```json
//! {
//!     "growth": { "activation_threshold": 0.5, "active_budget": 5 },
//!     "boundary": { "activation_threshold": 0.3 }
//! }
//! ```
//!
//! Missing fields fall back to their defaults. Validation happens when a
//! node is built from a config, so a bad value is fatal at construction
//! rather than surfacing mid-flow.

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Parameters of a growing node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// A node is active when its mean input is `>=` this value.
    pub activation_threshold: f64,
    /// Rising edges tolerated before the node duplicates.
    pub active_budget: i64,
    /// Idle passes tolerated before the node is pruned.
    pub inactive_budget: i64,
    /// Duplicates allowed across the whole lineage.
    pub max_duplicates: u32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.5,
            active_budget: 5,
            inactive_budget: 5,
            max_duplicates: 3,
        }
    }
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<(), FlowError> {
        check_threshold(self.activation_threshold)?;
        if self.active_budget < 0 {
            return Err(FlowError::InvalidConfig {
                field: "active_budget",
                reason: format!("must be >= 0, got {}", self.active_budget),
            });
        }
        if self.inactive_budget <= 0 {
            return Err(FlowError::InvalidConfig {
                field: "inactive_budget",
                reason: format!("must be > 0, got {}", self.inactive_budget),
            });
        }
        if self.max_duplicates == 0 {
            return Err(FlowError::InvalidConfig {
                field: "max_duplicates",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters of a boundary source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// A boundary node is active when its value is strictly `>` this value.
    pub activation_threshold: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.5,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> Result<(), FlowError> {
        check_threshold(self.activation_threshold)
    }
}

/// Complete experiment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub growth: GrowthConfig,
    pub boundary: BoundaryConfig,
}

impl SimulationConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let config: Self = serde_json::from_str(json)?;
        config.growth.validate()?;
        config.boundary.validate()?;
        Ok(config)
    }
}

fn check_threshold(threshold: f64) -> Result<(), FlowError> {
    if !threshold.is_finite() {
        return Err(FlowError::InvalidConfig {
            field: "activation_threshold",
            reason: format!("must be finite, got {threshold}"),
        });
    }
    Ok(())
}
