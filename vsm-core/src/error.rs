//! Error Types
//!
//! Failures that abort a value stream map request. Revision inconsistencies
//! are not errors; they surface as a warning view type on the affected node.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised while building or laying out a value stream map.
#[derive(Debug, Error)]
pub enum VsmError {
    /// The lineage contains a cycle and cannot be laid out.
    #[error("Value stream map of '{root}' cannot be displayed: cyclic dependency detected")]
    CyclicDependency { root: NodeId },

    /// An add operation referenced a node that was never added.
    #[error("Node '{0}' is not part of the value stream map")]
    UnknownNode(NodeId),

    #[error("Pipeline '{pipeline}' with counter '{counter}' not found.")]
    PipelineNotFound { pipeline: NodeId, counter: u32 },

    #[error("Material with fingerprint '{0}' not found.")]
    MaterialNotFound(String),

    #[error("Modification '{revision}' for material with fingerprint '{fingerprint}' not found.")]
    ModificationNotFound { revision: String, fingerprint: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl VsmError {
    /// True when the failure is a dependency cycle, which callers report
    /// separately from every other failure.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, VsmError::CyclicDependency { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VsmError>;
