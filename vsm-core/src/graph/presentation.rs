//! Presentation Model
//!
//! The laid out graph handed to the rendering layer: nodes grouped by
//! level, each level ordered by depth.

use serde::Serialize;

use super::node::{Node, NodeId};

/// Snapshot of a value stream map after layering and ordering.
#[derive(Debug, Clone, Serialize)]
pub struct PresentationModel {
    current_pipeline: Option<NodeId>,
    current_material: Option<NodeId>,
    levels: Vec<Vec<Node>>,
}

impl PresentationModel {
    pub(crate) fn new(
        current_pipeline: Option<NodeId>,
        current_material: Option<NodeId>,
        levels: Vec<Vec<Node>>,
    ) -> Self {
        Self {
            current_pipeline,
            current_material,
            levels,
        }
    }

    /// Nodes of each level, real and dummy, lowest level first.
    pub fn nodes_at_each_level(&self) -> &[Vec<Node>] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn current_pipeline(&self) -> Option<&Node> {
        self.current_pipeline.as_ref().and_then(|id| self.find_node(id))
    }

    pub fn current_material(&self) -> Option<&Node> {
        self.current_material.as_ref().and_then(|id| self.find_node(id))
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.levels.iter().flatten().find(|n| n.id() == id)
    }

    /// Nodes at `level` that are not dummies.
    pub fn real_nodes_at(&self, level: usize) -> Vec<&Node> {
        self.levels
            .get(level)
            .map(|nodes| nodes.iter().filter(|n| !n.is_dummy()).collect())
            .unwrap_or_default()
    }

    pub fn dummy_count_at(&self, level: usize) -> usize {
        self.levels
            .get(level)
            .map(|nodes| nodes.iter().filter(|n| n.is_dummy()).count())
            .unwrap_or(0)
    }

    /// Render as JSON for the view layer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
