//! Graph Nodes
//!
//! This module defines the node types that live in a value stream map.
//! A node is one of three kinds: a pipeline, a source control material, or a
//! dummy placeholder inserted by layering. The kind is a closed tag carrying
//! kind-specific payload; edges are stored as ids, never as owned nodes.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::revision::{MaterialRevision, PipelineRevision, Revision};

/// Identifier of a node: a pipeline name or a material fingerprint.
///
/// Comparison, hashing and ordering are case-insensitive; the spelling it
/// was created with is kept for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodeId {
    display: String,
    key: String,
}

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        let display = id.into();
        let key = display.to_lowercase();
        Self { display, key }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NodeId {}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.display
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Pipeline,
    Material,
    Dummy,
}

/// Annotation set on a node after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    /// Built from revisions that do not share a history.
    Warning,
    /// No longer present in the configuration.
    Deleted,
}

/// Payload carried by material nodes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaterialDetails {
    pub material_type: String,
    /// Every distinct name the material was configured under.
    pub material_names: IndexSet<String>,
    pub material_revisions: Vec<MaterialRevision>,
}

/// Kind-specific payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Pipeline,
    Material(MaterialDetails),
    Dummy,
}

type Edges = SmallVec<[NodeId; 4]>;

/// A vertex of the value stream map.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    id: NodeId,
    name: String,
    #[serde(flatten)]
    kind: NodeKind,
    /// Upstream dependencies, in discovery order.
    parents: Edges,
    /// Downstream dependents, in discovery order.
    children: Edges,
    level: usize,
    depth: usize,
    revisions: Vec<Revision>,
    view_type: Option<ViewType>,
    message: Option<String>,
}

impl Node {
    fn with_kind(id: NodeId, name: String, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            kind,
            parents: SmallVec::new(),
            children: SmallVec::new(),
            level: 0,
            depth: 0,
            revisions: Vec::new(),
            view_type: None,
            message: None,
        }
    }

    /// Create a pipeline node.
    pub fn pipeline(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self::with_kind(id.into(), name.into(), NodeKind::Pipeline)
    }

    /// Create a source control material node keyed by its fingerprint.
    pub fn material(
        fingerprint: impl Into<NodeId>,
        name: impl Into<String>,
        material_type: impl Into<String>,
    ) -> Self {
        let details = MaterialDetails {
            material_type: material_type.into(),
            ..MaterialDetails::default()
        };
        Self::with_kind(fingerprint.into(), name.into(), NodeKind::Material(details))
    }

    /// Placeholders are only created by layering.
    pub(crate) fn dummy(id: NodeId, level: usize) -> Self {
        let mut node = Self::with_kind(id, "dummy".to_string(), NodeKind::Dummy);
        node.level = level;
        node
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Pipeline => NodeType::Pipeline,
            NodeKind::Material(_) => NodeType::Material,
            NodeKind::Dummy => NodeType::Dummy,
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.kind, NodeKind::Dummy)
    }

    pub fn material_details(&self) -> Option<&MaterialDetails> {
        match &self.kind {
            NodeKind::Material(details) => Some(details),
            _ => None,
        }
    }

    /// Distinct configured names of a material node; empty for other kinds.
    pub fn material_names(&self) -> Vec<&str> {
        self.material_details()
            .map(|d| d.material_names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn material_revisions(&self) -> &[MaterialRevision] {
        self.material_details()
            .map(|d| d.material_revisions.as_slice())
            .unwrap_or(&[])
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn view_type(&self) -> Option<ViewType> {
        self.view_type
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns false if the edge was already present.
    pub(crate) fn add_parent(&mut self, id: &NodeId) -> bool {
        if self.parents.contains(id) {
            return false;
        }
        self.parents.push(id.clone());
        true
    }

    pub(crate) fn add_child(&mut self, id: &NodeId) -> bool {
        if self.children.contains(id) {
            return false;
        }
        self.children.push(id.clone());
        true
    }

    /// Swap one parent for another, keeping its position.
    pub(crate) fn replace_parent(&mut self, old: &NodeId, new: NodeId) {
        if let Some(slot) = self.parents.iter_mut().find(|p| *p == old) {
            *slot = new;
        }
    }

    pub(crate) fn replace_child(&mut self, old: &NodeId, new: NodeId) {
        if let Some(slot) = self.children.iter_mut().find(|c| *c == old) {
            *slot = new;
        }
    }

    pub(crate) fn set_parents(&mut self, parents: impl IntoIterator<Item = NodeId>) {
        self.parents = parents.into_iter().collect();
    }

    pub(crate) fn set_children(&mut self, children: impl IntoIterator<Item = NodeId>) {
        self.children = children.into_iter().collect();
    }

    pub(crate) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn set_view_type(&mut self, view_type: ViewType) {
        self.view_type = Some(view_type);
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub(crate) fn clear_revisions(&mut self) {
        self.revisions.clear();
        if let NodeKind::Material(details) = &mut self.kind {
            details.material_revisions.clear();
        }
    }

    /// Record a pipeline run. Runs are unique by counter and kept newest
    /// first.
    pub(crate) fn add_pipeline_revision(&mut self, revision: PipelineRevision) {
        let exists = self
            .revisions
            .iter()
            .filter_map(Revision::as_pipeline)
            .any(|r| r.same_run(&revision));
        if exists {
            return;
        }
        self.revisions.push(Revision::Pipeline(revision));
        self.revisions.sort_by(|a, b| match (a, b) {
            (Revision::Pipeline(a), Revision::Pipeline(b)) => a.cmp(b),
            _ => Ordering::Equal,
        });
    }

    /// Record the material revision a dependant was built from. Ignored for
    /// nodes that are not materials.
    pub(crate) fn add_material_revision(&mut self, revision: MaterialRevision) {
        let NodeKind::Material(details) = &mut self.kind else {
            return;
        };
        if revision.is_empty() && revision.material.is_none() {
            return;
        }
        let identity = revision.identity();
        if details
            .material_revisions
            .iter()
            .any(|existing| existing.identity() == identity)
        {
            return;
        }
        for modification in &revision.modifications {
            let seen = self.revisions.iter().any(|r| match r {
                Revision::Scm(m) => m.revision == modification.revision,
                Revision::Pipeline(_) => false,
            });
            if !seen {
                self.revisions.push(Revision::Scm(modification.clone()));
            }
        }
        details.material_revisions.push(revision);
    }

    pub(crate) fn add_material_name(&mut self, name: &str) {
        if let NodeKind::Material(details) = &mut self.kind {
            details.material_names.insert(name.to_string());
        }
    }
}
