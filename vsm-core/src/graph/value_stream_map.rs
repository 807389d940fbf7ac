//! Value Stream Map
//!
//! The graph builder. Nodes are added relative to a node already in the
//! map, either as an upstream dependency or a downstream dependant. Edges
//! can be discovered in any order, so every add looks the node up by id
//! first and merges into the existing instance; constructing a fresh node
//! for a known id would fork the lineage into disconnected copies.

use std::collections::{HashSet, VecDeque};

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::cycle;
use super::leveling::{self, NodeLevelMap};
use super::node::{Node, NodeId, ViewType};
use super::ordering;
use super::presentation::PresentationModel;
use crate::config::VsmConfig;
use crate::error::{Result, VsmError};
use crate::revision::{MaterialRef, MaterialRevision, Modification, PipelineRevision};

/// Dependency lineage of one pipeline or material, built for one request.
#[derive(Debug, Clone)]
pub struct ValueStreamMap {
    nodes: IndexMap<NodeId, Node>,
    root: NodeId,
    material_root: bool,
    config: VsmConfig,
}

impl ValueStreamMap {
    /// Start a map whose root is the pipeline `pipeline`, optionally at a
    /// particular run.
    pub fn new(pipeline: impl Into<NodeId>, revision: Option<PipelineRevision>) -> Self {
        let root: NodeId = pipeline.into();
        let mut node = Node::pipeline(root.clone(), root.to_string());
        if let Some(revision) = revision {
            node.add_pipeline_revision(revision);
        }
        Self::rooted_at(node, false)
    }

    /// Start a map whose root is a material, optionally at a particular
    /// modification.
    pub fn for_material(material: Node, modification: Option<Modification>) -> Self {
        let mut node = material;
        if let Some(modification) = modification {
            let material_type = node
                .material_details()
                .map(|d| d.material_type.clone())
                .unwrap_or_default();
            let reference = MaterialRef::new(node.id().to_string(), node.name(), material_type);
            node.add_material_revision(MaterialRevision::new(reference, vec![modification]));
        }
        Self::rooted_at(node, true)
    }

    fn rooted_at(node: Node, material_root: bool) -> Self {
        let root = node.id().clone();
        let mut nodes = IndexMap::new();
        nodes.insert(root.clone(), node);
        Self {
            nodes,
            root,
            material_root,
            config: VsmConfig::default(),
        }
    }

    pub fn with_config(mut self, config: VsmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &VsmConfig {
        &self.config
    }

    /// Add `node` as a dependency of `dependent`, recording the run of it
    /// that `dependent` was built from.
    pub fn add_upstream_node(
        &mut self,
        node: Node,
        revision: Option<PipelineRevision>,
        dependent: &NodeId,
    ) -> Result<&Node> {
        let id = self.link(node, dependent, true)?;
        let node = self.canonical(&id)?;
        if let Some(revision) = revision {
            node.add_pipeline_revision(revision);
        }
        Ok(&*node)
    }

    /// Add a material as a dependency of `dependent`. `material_name` is the
    /// name the dependant's configuration gives the material; distinct names
    /// accumulate on the node.
    pub fn add_upstream_material_node(
        &mut self,
        node: Node,
        material_name: Option<&str>,
        dependent: &NodeId,
        revision: Option<MaterialRevision>,
    ) -> Result<&Node> {
        let id = self.link(node, dependent, true)?;
        let node = self.canonical(&id)?;
        if let Some(name) = material_name {
            node.add_material_name(name);
        }
        if let Some(revision) = revision {
            node.add_material_revision(revision);
        }
        Ok(&*node)
    }

    /// Add `node` as a dependant of `parent`.
    pub fn add_downstream_node(&mut self, node: Node, parent: &NodeId) -> Result<&Node> {
        let id = self.link(node, parent, false)?;
        self.canonical(&id).map(|node| &*node)
    }

    /// Ensure `node` exists and connect it to `other`. Upstream links make
    /// `node` the parent.
    fn link(&mut self, node: Node, other: &NodeId, upstream: bool) -> Result<NodeId> {
        if !self.nodes.contains_key(other) {
            return Err(VsmError::UnknownNode(other.clone()));
        }

        let id = node.id().clone();
        match self.nodes.entry(id.clone()) {
            Entry::Occupied(_) => debug!(node = %id, "merging into existing node"),
            Entry::Vacant(slot) => {
                debug!(node = %id, kind = ?node.node_type(), "adding node");
                slot.insert(node);
            }
        }

        let (parent, child) = if upstream { (&id, other) } else { (other, &id) };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.add_child(child);
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.add_parent(parent);
        }
        Ok(id)
    }

    fn canonical(&mut self, id: &NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| VsmError::UnknownNode(id.clone()))
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of real nodes; dummies are not counted.
    pub fn node_count(&self) -> usize {
        self.nodes.values().filter(|n| !n.is_dummy()).count()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&self.root)
    }

    /// The pipeline this map was built for; `None` for a material map.
    pub fn current_pipeline(&self) -> Option<&Node> {
        if self.material_root {
            None
        } else {
            self.root()
        }
    }

    /// The material this map was built for; `None` for a pipeline map.
    pub fn current_material(&self) -> Option<&Node> {
        if self.material_root {
            self.root()
        } else {
            None
        }
    }

    /// Nodes without parents, sorted by id.
    pub fn root_nodes(&self) -> Vec<&Node> {
        let mut roots: Vec<&Node> = self.nodes.values().filter(|n| n.parents().is_empty()).collect();
        roots.sort_by(|a, b| a.id().cmp(b.id()));
        roots
    }

    pub fn has_cycle(&self) -> bool {
        cycle::has_cycle(&self.nodes)
    }

    /// Flag the current pipeline when some upstream material was consumed
    /// at revisions that do not lie on one history.
    pub fn add_warning_if_built_from_incompatible_revisions(&mut self) {
        if self.material_root {
            return;
        }

        let conflicting = self.ancestors_of(&self.root).into_iter().find(|id| {
            self.nodes
                .get(id)
                .and_then(Node::material_details)
                .is_some_and(|details| has_conflict(&details.material_revisions))
        });

        if let Some(material) = conflicting {
            warn!(pipeline = %self.root, material = %material, "built from incompatible material revisions");
            if let Some(current) = self.nodes.get_mut(&self.root) {
                current.set_view_type(ViewType::Warning);
            }
        }
    }

    /// Mark a node as removed from configuration. Its history is dropped.
    pub fn mark_deleted(&mut self, id: &NodeId, message: &str) -> Result<()> {
        let node = self.canonical(id)?;
        node.set_view_type(ViewType::Deleted);
        node.set_message(message);
        node.clear_revisions();
        Ok(())
    }

    fn ancestors_of(&self, id: &NodeId) -> Vec<NodeId> {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::from([id]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(node) = self.nodes.get(current) else { continue };
            for parent in node.parents() {
                if seen.insert(parent) {
                    result.push(parent.clone());
                    queue.push_back(parent);
                }
            }
        }
        result
    }

    /// Layer and order the graph. Dummy nodes from an earlier call are
    /// replaced, so this can be called again after more nodes were added.
    pub fn presentation_model(&mut self) -> Result<PresentationModel> {
        if self.has_cycle() {
            warn!(root = %self.root, "cyclic dependency in value stream map");
            return Err(VsmError::CyclicDependency { root: self.root.clone() });
        }

        leveling::strip_dummies(&mut self.nodes);
        leveling::assign_levels(&mut self.nodes, &self.root);
        let dummies = leveling::insert_dummies(&mut self.nodes);

        let mut levels = NodeLevelMap::from_nodes(&self.nodes);
        ordering::order_levels(&mut self.nodes, &self.root, &mut levels, self.config.crossing_sweeps);
        debug!(root = %self.root, levels = levels.len(), dummies, "laid out value stream map");

        let snapshot = levels
            .levels()
            .iter()
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id).cloned()).collect())
            .collect();

        let (pipeline, material) = if self.material_root {
            (None, Some(self.root.clone()))
        } else {
            (Some(self.root.clone()), None)
        };
        Ok(PresentationModel::new(pipeline, material, snapshot))
    }
}

fn has_conflict(revisions: &[MaterialRevision]) -> bool {
    revisions.iter().enumerate().any(|(i, a)| {
        revisions[i + 1..].iter().any(|b| !a.is_compatible_with(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::revision::{Revision, StageSummary};

    fn id(name: &str) -> NodeId {
        NodeId::from(name)
    }

    fn pipeline(name: &str) -> Node {
        Node::pipeline(name, name)
    }

    fn git(fingerprint: &str) -> Node {
        Node::material(fingerprint, "git", "git")
    }

    fn ids(nodes: &[NodeId]) -> Vec<&str> {
        nodes.iter().map(NodeId::as_str).collect()
    }

    fn names(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.name().to_string()).collect()
    }

    fn git_revision(revisions: &[&str]) -> MaterialRevision {
        MaterialRevision::new(
            MaterialRef::new("git_fingerprint", "git", "git"),
            revisions.iter().map(|r| Modification::new(*r)).collect(),
        )
    }

    #[test]
    fn current_pipeline_alone_sits_at_level_zero() {
        let mut graph = ValueStreamMap::new("P1", None);
        assert_eq!(graph.current_pipeline().map(Node::name), Some("P1"));
        assert!(graph.current_material().is_none());

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 1);
        assert_eq!(names(&model.real_nodes_at(0)), vec!["P1"]);
    }

    #[test]
    fn upstream_material_sits_before_its_dependant() {
        let mut graph = ValueStreamMap::new("P1", None);
        graph
            .add_upstream_material_node(git("git_fingerprint"), None, &id("P1"), Some(MaterialRevision::empty()))
            .unwrap();

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 2);
        let material = &model.nodes_at_each_level()[0][0];
        assert_eq!(material.id().as_str(), "git_fingerprint");
        assert_eq!(material.name(), "git");
        assert_eq!(ids(material.children()), vec!["P1"]);
    }

    #[test]
    fn material_names_from_every_dependant_are_kept() {
        let mut graph = ValueStreamMap::new("P2", None);
        graph.add_upstream_material_node(git("git_fingerprint"), Some("git1"), &id("P2"), None).unwrap();
        graph.add_upstream_node(pipeline("P1"), None, &id("P2")).unwrap();
        graph.add_upstream_material_node(git("git_fingerprint"), Some("git2"), &id("P1"), None).unwrap();
        graph.add_upstream_material_node(git("git_fingerprint"), Some("git1"), &id("P1"), None).unwrap();

        let node = graph.find_node(&id("git_fingerprint")).unwrap();
        assert_eq!(node.material_names(), vec!["git1", "git2"]);
    }

    #[test]
    fn material_without_configured_name_has_no_names() {
        let mut graph = ValueStreamMap::new("P2", None);
        graph.add_upstream_material_node(git("git_fingerprint"), None, &id("P2"), None).unwrap();
        graph.add_upstream_node(pipeline("P1"), None, &id("P2")).unwrap();
        graph.add_upstream_material_node(git("git_fingerprint"), None, &id("P1"), None).unwrap();

        assert!(graph.find_node(&id("git_fingerprint")).unwrap().material_names().is_empty());
    }

    #[test]
    fn material_revisions_from_every_dependant_are_kept() {
        let mut graph = ValueStreamMap::new("P3", None);
        graph.add_upstream_node(pipeline("P1"), None, &id("P3")).unwrap();
        graph.add_upstream_node(pipeline("P2"), None, &id("P3")).unwrap();
        graph
            .add_upstream_material_node(git("git_fingerprint"), Some("git1"), &id("P1"), Some(git_revision(&["revision1"])))
            .unwrap();
        graph
            .add_upstream_material_node(git("git_fingerprint"), Some("git1"), &id("P2"), Some(git_revision(&["revision2"])))
            .unwrap();

        let node = graph.find_node(&id("git_fingerprint")).unwrap();
        assert_eq!(node.material_revisions(), &[git_revision(&["revision1"]), git_revision(&["revision2"])]);
        let revisions: Vec<&str> = node.revisions().iter().map(Revision::display_name).collect();
        assert_eq!(revisions, vec!["revision1", "revision2"]);
    }

    #[test]
    fn rediscovered_edges_are_not_duplicated() {
        let mut graph = ValueStreamMap::new("p5", None);
        graph.add_upstream_node(pipeline("p4"), None, &id("p5")).unwrap();
        let p4 = graph.add_upstream_node(pipeline("p4"), None, &id("p5")).unwrap();

        assert_eq!(ids(p4.children()), vec!["p5"]);
        assert_eq!(ids(graph.find_node(&id("p5")).unwrap().parents()), vec!["p4"]);
    }

    #[test]
    fn ids_differing_only_in_case_are_one_node() {
        let mut graph = ValueStreamMap::new("Current", None);
        graph.add_upstream_node(pipeline("Upstream"), None, &id("current")).unwrap();
        graph.add_upstream_node(pipeline("UPSTREAM"), None, &id("CURRENT")).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.find_node(&id("upstream")).unwrap().name(), "Upstream");
    }

    #[test]
    fn pipeline_revisions_accumulate_newest_first() {
        let mut graph = ValueStreamMap::new("current", None);
        graph
            .add_upstream_node(pipeline("up"), Some(PipelineRevision::new("up", 1, "1")), &id("current"))
            .unwrap();
        graph
            .add_upstream_node(pipeline("up"), Some(PipelineRevision::new("up", 3, "3")), &id("current"))
            .unwrap();
        graph
            .add_upstream_node(pipeline("up"), Some(PipelineRevision::new("up", 1, "1")), &id("current"))
            .unwrap();

        let labels: Vec<&str> = graph
            .find_node(&id("up"))
            .unwrap()
            .revisions()
            .iter()
            .map(Revision::display_name)
            .collect();
        assert_eq!(labels, vec!["3", "1"]);
    }

    #[test]
    fn shared_ancestor_gains_a_second_child() {
        let mut graph = ValueStreamMap::new("P1", None);
        graph.add_upstream_node(pipeline("d1"), None, &id("P1")).unwrap();
        graph.add_upstream_node(pipeline("d2"), None, &id("P1")).unwrap();
        graph.add_upstream_node(pipeline("d3"), None, &id("d1")).unwrap();
        graph.add_upstream_node(pipeline("d3"), None, &id("d2")).unwrap();

        assert_eq!(ids(graph.find_node(&id("d3")).unwrap().children()), vec!["d1", "d2"]);

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 3);
        assert_eq!(names(&model.real_nodes_at(0)), vec!["d3"]);
        assert_eq!(names(&model.real_nodes_at(1)), vec!["d1", "d2"]);
        assert_eq!(names(&model.real_nodes_at(2)), vec!["P1"]);
    }

    #[test]
    fn downstream_node_sits_after_its_parent() {
        let mut graph = ValueStreamMap::new("p1", None);
        graph.add_downstream_node(pipeline("p2"), &id("p1")).unwrap();

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 2);
        assert_eq!(names(&model.real_nodes_at(0)), vec!["p1"]);
        assert_eq!(names(&model.real_nodes_at(1)), vec!["p2"]);
        assert_eq!(ids(graph.find_node(&id("p1")).unwrap().children()), vec!["p2"]);
        assert_eq!(ids(graph.find_node(&id("p2")).unwrap().parents()), vec!["p1"]);
    }

    #[test]
    fn root_nodes_are_the_sources() {
        let mut graph = ValueStreamMap::new("acceptance", None);
        graph.add_upstream_node(pipeline("plugins"), None, &id("acceptance")).unwrap();
        graph.add_upstream_node(pipeline("git-plugins"), None, &id("plugins")).unwrap();
        graph.add_upstream_node(pipeline("cruise"), None, &id("plugins")).unwrap();
        graph.add_upstream_material_node(git("git-trunk"), None, &id("cruise"), None).unwrap();
        graph
            .add_upstream_material_node(Node::material("hg-trunk", "hg-trunk", "hg"), None, &id("cruise"), None)
            .unwrap();
        graph.add_upstream_node(pipeline("cruise"), None, &id("acceptance")).unwrap();
        graph
            .add_upstream_material_node(Node::material("hg-trunk", "hg-trunk", "hg"), None, &id("acceptance"), None)
            .unwrap();

        let roots: Vec<&str> = graph.root_nodes().iter().map(|n| n.id().as_str()).collect();
        assert_eq!(roots, vec!["git-plugins", "git-trunk", "hg-trunk"]);
    }

    #[test]
    fn downstream_rediscovery_routes_long_edge_through_a_dummy() {
        let mut graph = ValueStreamMap::new("p1", None);
        graph.add_downstream_node(pipeline("p2"), &id("p1")).unwrap();
        graph.add_downstream_node(pipeline("p3"), &id("p2")).unwrap();
        graph.add_downstream_node(pipeline("p3"), &id("p1")).unwrap();

        assert_eq!(ids(graph.find_node(&id("p1")).unwrap().children()), vec!["p2", "p3"]);
        assert_eq!(ids(graph.find_node(&id("p3")).unwrap().parents()), vec!["p2", "p1"]);

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 3);
        assert_eq!(names(&model.real_nodes_at(1)), vec!["p2"]);
        assert_eq!(model.dummy_count_at(1), 1);
        assert_eq!(names(&model.real_nodes_at(2)), vec!["p3"]);
        assert_eq!(model.dummy_count_at(2), 0);
    }

    #[test]
    fn layering_again_after_more_edges_replaces_old_dummies() {
        let mut graph = ValueStreamMap::new("p1", None);
        graph.add_downstream_node(pipeline("p3"), &id("p1")).unwrap();

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 2);
        assert_eq!(names(&model.real_nodes_at(1)), vec!["p3"]);

        graph.add_downstream_node(pipeline("p2"), &id("p1")).unwrap();
        graph.add_downstream_node(pipeline("p3"), &id("p2")).unwrap();

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.level_count(), 3);
        assert_eq!(names(&model.real_nodes_at(0)), vec!["p1"]);
        assert_eq!(names(&model.real_nodes_at(1)), vec!["p2"]);
        assert_eq!(model.dummy_count_at(1), 1);
        assert_eq!(names(&model.real_nodes_at(2)), vec!["p3"]);

        let again = graph.presentation_model().unwrap();
        assert_eq!(again.dummy_count_at(1), 1);
        assert_eq!(graph.nodes().filter(|n| n.is_dummy()).count(), 1);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn seven_level_lineage_is_laid_out_compactly() {
        let mut graph = ValueStreamMap::new("acceptance", None);
        graph.add_upstream_node(pipeline("plugins"), None, &id("acceptance")).unwrap();
        graph.add_upstream_node(pipeline("git-plugins"), None, &id("plugins")).unwrap();
        graph.add_upstream_node(pipeline("cruise"), None, &id("plugins")).unwrap();
        graph
            .add_upstream_material_node(Node::material("git-trunk", "git-trunk", "git"), None, &id("cruise"), None)
            .unwrap();
        graph
            .add_upstream_material_node(Node::material("hg-trunk", "hg-trunk", "hg"), None, &id("cruise"), None)
            .unwrap();
        graph.add_upstream_node(pipeline("cruise"), None, &id("acceptance")).unwrap();
        graph
            .add_upstream_material_node(Node::material("hg-trunk", "hg-trunk", "hg"), None, &id("acceptance"), None)
            .unwrap();
        graph.add_downstream_node(pipeline("deploy-go03"), &id("acceptance")).unwrap();
        graph.add_downstream_node(pipeline("publish"), &id("deploy-go03")).unwrap();
        graph.add_downstream_node(pipeline("deploy-go01"), &id("publish")).unwrap();
        graph.add_downstream_node(pipeline("deploy-go02"), &id("acceptance")).unwrap();
        graph.add_downstream_node(pipeline("deploy-go01"), &id("deploy-go02")).unwrap();

        let model = graph.presentation_model().unwrap();

        assert_eq!(model.level_count(), 7);
        let expected: [(&[&str], usize); 7] = [
            (&["git-trunk", "hg-trunk"], 0),
            (&["git-plugins", "cruise"], 1),
            (&["plugins"], 2),
            (&["acceptance"], 0),
            (&["deploy-go03", "deploy-go02"], 0),
            (&["publish"], 1),
            (&["deploy-go01"], 0),
        ];
        for (level, (real, dummies)) in expected.iter().enumerate() {
            assert_eq!(names(&model.real_nodes_at(level)), real.to_vec(), "level {level}");
            assert_eq!(model.dummy_count_at(level), *dummies, "level {level}");
        }

        let depth = |name: &str| graph.find_node(&id(name)).unwrap().depth();
        assert_eq!(depth("git-trunk"), 2);
        assert_eq!(depth("hg-trunk"), 3);
        assert_eq!(depth("git-plugins"), 1);
        assert_eq!(depth("cruise"), 2);
        assert_eq!(depth("deploy-go03"), 1);
        assert_eq!(depth("deploy-go02"), 2);
        assert_eq!(depth("publish"), 1);
        assert_eq!(depth("deploy-go01"), 1);
    }

    #[test]
    fn stage_summaries_and_comments_reach_the_rendered_model() {
        let config = VsmConfig {
            crossing_sweeps: 1,
            ..VsmConfig::default()
        };
        let mut graph = ValueStreamMap::new("deploy", None).with_config(config.clone());
        assert_eq!(graph.config(), &config);

        let run = PipelineRevision::new("build", 4, "1.4").with_stages(vec![StageSummary {
            name: "compile".to_string(),
            counter: 1,
            result: "Passed".to_string(),
        }]);
        graph.add_upstream_node(pipeline("build"), Some(run), &id("deploy")).unwrap();
        let change = Modification::new("abc123").by("dev").with_comment("fix flaky test");
        graph
            .add_upstream_material_node(
                git("git_fingerprint"),
                None,
                &id("build"),
                Some(MaterialRevision::new(MaterialRef::new("git_fingerprint", "git", "git"), vec![change])),
            )
            .unwrap();

        let model = graph.presentation_model().unwrap();
        let material = model.find_node(&id("git_fingerprint")).unwrap();
        assert!(matches!(material.kind(), NodeKind::Material(details) if details.material_type == "git"));
        assert!(matches!(model.find_node(&id("build")).unwrap().kind(), NodeKind::Pipeline));

        let json: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
        let build = &json["levels"][1][0];
        assert_eq!(build["revisions"][0]["stages"][0]["name"], "compile");
        assert_eq!(build["revisions"][0]["stages"][0]["result"], "Passed");
        let git = &json["levels"][0][0];
        assert_eq!(git["revisions"][0]["comment"], "fix flaky test");
        assert_eq!(git["material_revisions"][0]["modifications"][0]["username"], "dev");
    }

    #[test]
    fn former_upstream_now_downstream_is_a_cycle() {
        let mut graph = ValueStreamMap::new("current", None);
        graph.add_downstream_node(pipeline("child"), &id("current")).unwrap();
        graph.add_downstream_node(pipeline("grandParent"), &id("child")).unwrap();
        graph.add_upstream_node(pipeline("parent"), None, &id("current")).unwrap();
        graph.add_upstream_node(pipeline("grandParent"), None, &id("parent")).unwrap();
        graph.add_upstream_material_node(git("g"), None, &id("grandParent"), None).unwrap();
        graph.add_upstream_material_node(git("g"), None, &id("parent"), None).unwrap();

        assert!(graph.has_cycle());
        let err = graph.presentation_model().unwrap_err();
        assert!(err.is_cyclic());
        assert!(err.to_string().contains("current"));
    }

    #[test]
    fn triangle_is_not_cyclic() {
        let mut graph = ValueStreamMap::new("C", None);
        graph.add_upstream_node(pipeline("A"), None, &id("C")).unwrap();
        graph.add_upstream_node(pipeline("B"), None, &id("C")).unwrap();
        graph.add_upstream_node(pipeline("D"), None, &id("B")).unwrap();
        graph.add_upstream_node(pipeline("A"), None, &id("D")).unwrap();
        graph.add_upstream_material_node(git("g"), None, &id("A"), None).unwrap();

        assert!(!graph.has_cycle());
        assert!(graph.presentation_model().is_ok());
    }

    #[test]
    fn cycle_among_upstream_nodes_is_detected() {
        let mut graph = ValueStreamMap::new("B", None);
        graph.add_upstream_node(pipeline("A"), None, &id("B")).unwrap();
        graph.add_upstream_material_node(git("g"), None, &id("A"), None).unwrap();
        graph.add_downstream_node(pipeline("A"), &id("B")).unwrap();
        graph.add_downstream_node(pipeline("C"), &id("A")).unwrap();

        assert!(graph.has_cycle());
    }

    #[test]
    fn cycle_between_upstream_leaves_at_different_levels_is_detected() {
        let mut graph = ValueStreamMap::new("current", None);
        graph.add_upstream_node(pipeline("p4"), None, &id("current")).unwrap();
        graph.add_upstream_node(pipeline("p3"), None, &id("p4")).unwrap();
        graph.add_upstream_node(pipeline("p2"), None, &id("p3")).unwrap();
        graph.add_upstream_node(pipeline("p1"), None, &id("p2")).unwrap();
        graph.add_upstream_material_node(git("g1"), None, &id("p1"), None).unwrap();
        graph
            .add_upstream_node(pipeline("p5"), Some(PipelineRevision::new("p5", 2, "2")), &id("current"))
            .unwrap();
        graph
            .add_upstream_node(pipeline("p6"), Some(PipelineRevision::new("p6", 1, "1")), &id("p5"))
            .unwrap();
        graph
            .add_upstream_node(pipeline("p5"), Some(PipelineRevision::new("p5", 1, "1")), &id("p6"))
            .unwrap();
        graph.add_upstream_material_node(git("g2"), None, &id("p5"), None).unwrap();

        assert!(graph.has_cycle());
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = ValueStreamMap::new("p1", None);
        graph.add_upstream_node(pipeline("p1"), None, &id("p1")).unwrap();
        assert!(graph.has_cycle());
    }

    #[test]
    fn unknown_dependant_is_rejected_without_changes() {
        let mut graph = ValueStreamMap::new("p1", None);
        let err = graph.add_upstream_node(pipeline("p0"), None, &id("missing")).unwrap_err();
        assert!(matches!(err, VsmError::UnknownNode(ref node) if node == &id("missing")));
        assert!(graph.add_downstream_node(pipeline("p2"), &id("missing")).is_err());
        assert_eq!(graph.node_count(), 1);
        assert!(graph.find_node(&id("p0")).is_none());
    }

    #[test]
    fn diverging_material_revisions_raise_a_warning() {
        let mut graph = ValueStreamMap::new("current", None);
        let node = Node::material("id", "git_node", "git");
        graph
            .add_upstream_material_node(node.clone(), Some("git"), &id("current"), Some(git_revision(&["rev1"])))
            .unwrap();
        graph
            .add_upstream_material_node(node, Some("git"), &id("current"), Some(git_revision(&["rev2"])))
            .unwrap();

        graph.add_warning_if_built_from_incompatible_revisions();

        assert_eq!(graph.current_pipeline().unwrap().view_type(), Some(ViewType::Warning));
    }

    #[test]
    fn revisions_sharing_a_history_raise_no_warning() {
        let mut graph = ValueStreamMap::new("current", None);
        let node = Node::material("id", "git_node", "git");
        graph
            .add_upstream_material_node(node.clone(), Some("git"), &id("current"), Some(git_revision(&["rev1"])))
            .unwrap();
        graph
            .add_upstream_material_node(node, Some("git"), &id("current"), Some(git_revision(&["rev1", "rev2"])))
            .unwrap();

        graph.add_warning_if_built_from_incompatible_revisions();

        assert_eq!(graph.current_pipeline().unwrap().view_type(), None);
    }

    #[test]
    fn warning_considers_indirect_materials() {
        let mut graph = ValueStreamMap::new("current", None);
        graph.add_upstream_node(pipeline("p1"), None, &id("current")).unwrap();
        graph.add_upstream_node(pipeline("p2"), None, &id("current")).unwrap();
        graph.add_upstream_material_node(git("fp"), None, &id("p1"), Some(git_revision(&["rev1"]))).unwrap();
        graph.add_upstream_material_node(git("fp"), None, &id("p2"), Some(git_revision(&["rev2"]))).unwrap();

        graph.add_warning_if_built_from_incompatible_revisions();

        assert_eq!(graph.current_pipeline().unwrap().view_type(), Some(ViewType::Warning));
    }

    #[test]
    fn deleted_node_loses_its_history() {
        let mut graph = ValueStreamMap::new("current", None);
        graph
            .add_upstream_node(pipeline("gone"), Some(PipelineRevision::new("gone", 4, "4")), &id("current"))
            .unwrap();

        graph.mark_deleted(&id("gone"), "Pipeline has been deleted.").unwrap();

        let gone = graph.find_node(&id("gone")).unwrap();
        assert_eq!(gone.view_type(), Some(ViewType::Deleted));
        assert_eq!(gone.message(), Some("Pipeline has been deleted."));
        assert!(gone.revisions().is_empty());
        assert!(graph.mark_deleted(&id("missing"), "x").is_err());
    }

    #[test]
    fn material_map_is_rooted_at_the_material() {
        let mut graph = ValueStreamMap::for_material(git("fp"), Some(Modification::new("abc")));
        graph.add_downstream_node(pipeline("p1"), &id("fp")).unwrap();
        graph.add_downstream_node(pipeline("p2"), &id("p1")).unwrap();

        assert!(graph.current_pipeline().is_none());
        let material = graph.current_material().unwrap();
        assert_eq!(material.material_revisions()[0].latest_revision(), Some("abc"));

        let model = graph.presentation_model().unwrap();
        assert_eq!(model.current_material().map(|n| n.id().as_str()), Some("fp"));
        assert_eq!(names(&model.real_nodes_at(2)), vec!["p2"]);
    }
}
