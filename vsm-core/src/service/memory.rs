//! In-Memory Collaborators
//!
//! Plain data implementations of [`DependencyConfig`] and [`BuildHistory`].
//! Configuration can be loaded from JSON:
//!
//! ```json
//! {
//!   "pipelines": [
//!     { "name": "build", "materials": [
//!       { "type": "scm", "fingerprint": "f1", "display_name": "repo", "material_type": "git", "name": "src" }
//!     ] },
//!     { "name": "deploy", "materials": [ { "type": "dependency", "pipeline": "build" } ] }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::traits::{BuildCause, BuildCauseEntry, BuildHistory, DependencyConfig, PipelineInstance};
use crate::error::Result;
use crate::graph::NodeId;
use crate::revision::{MaterialRef, Modification};

/// A material entry of a pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialConfig {
    /// Depends on another pipeline.
    Dependency { pipeline: String },
    /// Fetches from source control.
    Scm {
        fingerprint: String,
        display_name: String,
        material_type: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl MaterialConfig {
    fn fingerprint(&self) -> Option<&str> {
        match self {
            MaterialConfig::Scm { fingerprint, .. } => Some(fingerprint),
            MaterialConfig::Dependency { .. } => None,
        }
    }

    fn uses_material(&self, fingerprint: &str) -> bool {
        self.fingerprint().is_some_and(|f| f.eq_ignore_ascii_case(fingerprint))
    }

    fn depends_on(&self, pipeline: &NodeId) -> bool {
        matches!(self, MaterialConfig::Dependency { pipeline: upstream } if NodeId::from(upstream.as_str()) == *pipeline)
    }
}

/// Configuration of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub materials: Vec<MaterialConfig>,
}

impl PipelineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            materials: Vec::new(),
        }
    }

    pub fn depends_on(mut self, pipeline: impl Into<String>) -> Self {
        self.materials.push(MaterialConfig::Dependency {
            pipeline: pipeline.into(),
        });
        self
    }

    pub fn uses_material(mut self, material: &MaterialRef, name: Option<&str>) -> Self {
        self.materials.push(MaterialConfig::Scm {
            fingerprint: material.fingerprint.clone(),
            display_name: material.display_name.clone(),
            material_type: material.material_type.clone(),
            name: name.map(str::to_string),
        });
        self
    }

    fn is(&self, pipeline: &NodeId) -> bool {
        NodeId::from(self.name.as_str()) == *pipeline
    }
}

/// All configured pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfigs {
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,
}

impl PipelineConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn find(&self, pipeline: &NodeId) -> Option<&PipelineConfig> {
        self.pipelines.iter().find(|p| p.is(pipeline))
    }
}

impl DependencyConfig for PipelineConfigs {
    fn pipeline_name(&self, pipeline: &NodeId) -> Option<String> {
        self.find(pipeline).map(|p| p.name.clone())
    }

    fn downstream_of(&self, pipeline: &NodeId) -> Vec<String> {
        self.pipelines
            .iter()
            .filter(|p| p.materials.iter().any(|m| m.depends_on(pipeline)))
            .map(|p| p.name.clone())
            .collect()
    }

    fn material(&self, fingerprint: &str) -> Option<MaterialRef> {
        self.pipelines
            .iter()
            .flat_map(|p| &p.materials)
            .find_map(|m| match m {
                MaterialConfig::Scm {
                    fingerprint: configured,
                    display_name,
                    material_type,
                    ..
                } if configured.eq_ignore_ascii_case(fingerprint) => {
                    Some(MaterialRef::new(configured.as_str(), display_name.as_str(), material_type.as_str()))
                }
                _ => None,
            })
    }

    fn material_name(&self, pipeline: &NodeId, fingerprint: &str) -> Option<String> {
        self.find(pipeline)?.materials.iter().find_map(|m| match m {
            MaterialConfig::Scm { name, .. } if m.uses_material(fingerprint) => name.clone(),
            _ => None,
        })
    }

    fn pipelines_using_material(&self, fingerprint: &str) -> Vec<String> {
        self.pipelines
            .iter()
            .filter(|p| p.materials.iter().any(|m| m.uses_material(fingerprint)))
            .map(|p| p.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
struct RecordedRun {
    instance: PipelineInstance,
    cause: BuildCause,
}

/// Build history kept in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordedHistory {
    runs: HashMap<(NodeId, u32), RecordedRun>,
    /// Keyed by lowercased fingerprint.
    modifications: HashMap<String, Vec<Modification>>,
}

impl RecordedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run. The material modifications it was built from become
    /// findable by fingerprint and revision.
    pub fn with_run(
        mut self,
        pipeline: impl Into<String>,
        counter: u32,
        label: impl Into<String>,
        cause: BuildCause,
    ) -> Self {
        let name = pipeline.into();
        for entry in &cause.entries {
            let BuildCauseEntry::Material(revision) = entry else { continue };
            let Some(material) = &revision.material else { continue };
            for modification in &revision.modifications {
                self.record_modification(&material.fingerprint, modification.clone());
            }
        }
        let instance = PipelineInstance {
            name: name.clone(),
            counter,
            label: label.into(),
        };
        self.runs
            .insert((NodeId::from(name), counter), RecordedRun { instance, cause });
        self
    }

    pub fn with_modification(mut self, fingerprint: &str, modification: Modification) -> Self {
        self.record_modification(fingerprint, modification);
        self
    }

    fn record_modification(&mut self, fingerprint: &str, modification: Modification) {
        let known = self.modifications.entry(fingerprint.to_lowercase()).or_default();
        if !known.iter().any(|m| m.revision == modification.revision) {
            known.push(modification);
        }
    }
}

impl BuildHistory for RecordedHistory {
    fn find_pipeline(&self, pipeline: &NodeId, counter: u32) -> Option<PipelineInstance> {
        self.runs
            .get(&(pipeline.clone(), counter))
            .map(|run| run.instance.clone())
    }

    fn build_cause_for(&self, pipeline: &NodeId, counter: u32) -> Option<BuildCause> {
        self.runs
            .get(&(pipeline.clone(), counter))
            .map(|run| run.cause.clone())
    }

    fn find_modification(&self, fingerprint: &str, revision: &str) -> Option<Modification> {
        self.modifications
            .get(&fingerprint.to_lowercase())?
            .iter()
            .find(|m| m.revision == revision)
            .cloned()
    }
}
