//! Engine Configuration
//!
//! Tunables for layout and analysis. Every field has a default, so an empty
//! JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

/// Configuration shared by the graph builder and the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsmConfig {
    /// Number of barycenter passes run after depth initialisation.
    /// Zero keeps the traversal order.
    #[serde(default)]
    pub crossing_sweeps: usize,

    /// Flag the current pipeline when it was built from diverging revisions
    /// of the same material.
    #[serde(default = "default_flag_incompatible_revisions")]
    pub flag_incompatible_revisions: bool,

    /// Message attached to upstream pipelines that no longer exist in config.
    #[serde(default = "default_deleted_pipeline_message")]
    pub deleted_pipeline_message: String,
}

fn default_flag_incompatible_revisions() -> bool {
    true
}

fn default_deleted_pipeline_message() -> String {
    "Pipeline has been deleted.".to_string()
}

impl VsmConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for VsmConfig {
    fn default() -> Self {
        Self {
            crossing_sweeps: 0,
            flag_incompatible_revisions: default_flag_incompatible_revisions(),
            deleted_pipeline_message: default_deleted_pipeline_message(),
        }
    }
}
