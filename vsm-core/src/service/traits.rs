//! Collaborator Traits
//!
//! The service reads two sources: the current pipeline configuration, which
//! decides who depends on whom now, and the build history, which records
//! what each run was actually built from.

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::revision::{MaterialRef, MaterialRevision, Modification, PipelineRevision};

/// Read access to the current pipeline configuration.
///
/// Pipeline names are matched case-insensitively.
pub trait DependencyConfig {
    /// The configured spelling of `pipeline`, or `None` if it is not
    /// configured.
    fn pipeline_name(&self, pipeline: &NodeId) -> Option<String>;

    fn has_pipeline(&self, pipeline: &NodeId) -> bool {
        self.pipeline_name(pipeline).is_some()
    }

    /// Pipelines whose configuration has `pipeline` as a dependency
    /// material, in configuration order.
    fn downstream_of(&self, pipeline: &NodeId) -> Vec<String>;

    fn material(&self, fingerprint: &str) -> Option<MaterialRef>;

    /// The name `pipeline` gives the material `fingerprint`, if it names it.
    fn material_name(&self, pipeline: &NodeId, fingerprint: &str) -> Option<String>;

    /// Pipelines that use the material `fingerprint`, in configuration order.
    fn pipelines_using_material(&self, fingerprint: &str) -> Vec<String>;
}

/// One recorded run of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInstance {
    pub name: String,
    pub counter: u32,
    pub label: String,
}

/// Something a run was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildCauseEntry {
    /// A run of an upstream pipeline.
    Upstream(PipelineRevision),
    /// Modifications of a source control material.
    Material(MaterialRevision),
}

/// Everything a run was built from, in the order it was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCause {
    pub entries: Vec<BuildCauseEntry>,
}

impl BuildCause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upstream(mut self, revision: PipelineRevision) -> Self {
        self.entries.push(BuildCauseEntry::Upstream(revision));
        self
    }

    pub fn with_material(mut self, revision: MaterialRevision) -> Self {
        self.entries.push(BuildCauseEntry::Material(revision));
        self
    }
}

/// Read access to build history.
pub trait BuildHistory {
    fn find_pipeline(&self, pipeline: &NodeId, counter: u32) -> Option<PipelineInstance>;

    fn build_cause_for(&self, pipeline: &NodeId, counter: u32) -> Option<BuildCause>;

    fn find_modification(&self, fingerprint: &str, revision: &str) -> Option<Modification>;
}
