//! Error types for growthflow-core.
//!
//! Only construction and explicit graph edits can fail. Everything that
//! happens while a flow is running (input exhaustion, pruning, lineage
//! exhaustion, dangling ids) resolves as a local state transition instead.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced by the growthflow-core crate.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A configuration value is out of range.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// An id passed to an explicit graph edit does not exist.
    #[error("node not found: NodeId({id})", id = id.raw())]
    NodeNotFound { id: NodeId },

    /// Configuration could not be parsed.
    #[error("failed to parse config: {0}")]
    Config(#[from] serde_json::Error),
}
