//! Revisions
//!
//! Immutable records of what a node was built from: a pipeline run for
//! pipeline nodes, source control modifications for material nodes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Summary of one stage of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub name: String,
    pub counter: u32,
    pub result: String,
}

/// One run of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRevision {
    pub pipeline_name: String,
    pub counter: u32,
    pub label: String,
    #[serde(default)]
    pub stages: Vec<StageSummary>,
}

impl PipelineRevision {
    pub fn new(pipeline_name: impl Into<String>, counter: u32, label: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            counter,
            label: label.into(),
            stages: Vec::new(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<StageSummary>) -> Self {
        self.stages = stages;
        self
    }

    /// Two revisions describe the same run when pipeline and counter match.
    pub fn same_run(&self, other: &PipelineRevision) -> bool {
        self.counter == other.counter && self.pipeline_name.eq_ignore_ascii_case(&other.pipeline_name)
    }
}

impl PartialEq for PipelineRevision {
    fn eq(&self, other: &Self) -> bool {
        self.same_run(other) && self.label == other.label
    }
}

impl Eq for PipelineRevision {}

impl PartialOrd for PipelineRevision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Newest run first.
impl Ord for PipelineRevision {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .counter
            .cmp(&self.counter)
            .then_with(|| self.pipeline_name.to_lowercase().cmp(&other.pipeline_name.to_lowercase()))
            .then_with(|| self.label.cmp(&other.label))
    }
}

/// A single check-in on a source control material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub revision: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub modified_time: Option<u64>,
}

impl Modification {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            username: None,
            comment: None,
            modified_time: None,
        }
    }

    pub fn by(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// The material a revision was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRef {
    pub fingerprint: String,
    pub display_name: String,
    pub material_type: String,
}

impl MaterialRef {
    pub fn new(
        fingerprint: impl Into<String>,
        display_name: impl Into<String>,
        material_type: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            display_name: display_name.into(),
            material_type: material_type.into(),
        }
    }
}

/// The modifications of one material that went into a build, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialRevision {
    pub material: Option<MaterialRef>,
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

impl MaterialRevision {
    pub fn new(material: MaterialRef, modifications: Vec<Modification>) -> Self {
        Self {
            material: Some(material),
            modifications,
        }
    }

    /// A revision with no material and no modifications.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }

    /// Revision string of the newest modification.
    pub fn latest_revision(&self) -> Option<&str> {
        self.modifications.first().map(|m| m.revision.as_str())
    }

    pub fn contains_revision(&self, revision: &str) -> bool {
        self.modifications.iter().any(|m| m.revision == revision)
    }

    /// Identity used for deduplication: material fingerprint plus the
    /// ordered revision strings.
    pub fn identity(&self) -> (Option<&str>, Vec<&str>) {
        (
            self.material.as_ref().map(|m| m.fingerprint.as_str()),
            self.modifications.iter().map(|m| m.revision.as_str()).collect(),
        )
    }

    /// Whether two revisions of the same material lie on one history: one
    /// of them already contains the other's newest modification.
    pub fn is_compatible_with(&self, other: &MaterialRevision) -> bool {
        match (self.latest_revision(), other.latest_revision()) {
            (Some(mine), Some(theirs)) => {
                mine == theirs || self.contains_revision(theirs) || other.contains_revision(mine)
            }
            _ => true,
        }
    }
}

/// A revision attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Revision {
    Pipeline(PipelineRevision),
    Scm(Modification),
}

impl Revision {
    /// The string a user would recognise: a label or a commit id.
    pub fn display_name(&self) -> &str {
        match self {
            Revision::Pipeline(revision) => &revision.label,
            Revision::Scm(modification) => &modification.revision,
        }
    }

    pub fn as_pipeline(&self) -> Option<&PipelineRevision> {
        match self {
            Revision::Pipeline(revision) => Some(revision),
            Revision::Scm(_) => None,
        }
    }
}
