//! Value Stream Map Service
//!
//! Builds the value stream map for one request.
//!
//! # Algorithm
//!
//! 1. Upstream lineage comes from build history. Starting at the requested
//!    run, each build cause entry becomes a parent: upstream runs as pipeline
//!    nodes, material revisions as material nodes. Every upstream run is
//!    expanded once, keyed by pipeline and counter.
//! 2. Downstream lineage comes from current configuration. Every pipeline
//!    that depends on a node in the map becomes its child; each pipeline is
//!    expanded once.
//! 3. The graph is checked for cycles, annotated, and laid out.
//!
//! Mixing history (upstream) with configuration (downstream) is what lets
//! config drift produce a cycle.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::traits::{BuildCauseEntry, BuildHistory, DependencyConfig};
use crate::config::VsmConfig;
use crate::error::{Result, VsmError};
use crate::graph::{Node, NodeId, NodeType, PresentationModel, ValueStreamMap};
use crate::revision::PipelineRevision;

/// Request-level entry point, generic over its collaborators.
pub struct ValueStreamMapService<C, H> {
    pipelines: C,
    history: H,
    config: VsmConfig,
}

impl<C: DependencyConfig, H: BuildHistory> ValueStreamMapService<C, H> {
    pub fn new(pipelines: C, history: H) -> Self {
        Self {
            pipelines,
            history,
            config: VsmConfig::default(),
        }
    }

    pub fn with_config(mut self, config: VsmConfig) -> Self {
        self.config = config;
        self
    }

    /// Value stream map of run `counter` of `pipeline`.
    pub fn value_stream_map(&self, pipeline: impl Into<NodeId>, counter: u32) -> Result<PresentationModel> {
        let pipeline: NodeId = pipeline.into();
        info!(pipeline = %pipeline, counter, "building value stream map");

        let instance = self
            .history
            .find_pipeline(&pipeline, counter)
            .ok_or_else(|| VsmError::PipelineNotFound {
                pipeline: pipeline.clone(),
                counter,
            })?;

        let name = self.pipelines.pipeline_name(&pipeline).unwrap_or(instance.name);
        let root = NodeId::from(name.as_str());
        let revision = PipelineRevision::new(name, counter, instance.label);
        let mut graph = ValueStreamMap::new(root.clone(), Some(revision)).with_config(self.config.clone());

        let mut visited = HashSet::new();
        self.add_upstream(&mut graph, &root, counter, &mut visited)?;
        self.add_downstream(&mut graph, &root, &mut HashSet::new())?;

        self.ensure_acyclic(&graph, &root)?;
        if self.config.flag_incompatible_revisions {
            graph.add_warning_if_built_from_incompatible_revisions();
        }
        self.mark_deleted_pipelines(&mut graph, &root)?;

        self.lay_out(graph, &root)
    }

    /// Value stream map rooted at `revision` of the material `fingerprint`,
    /// showing every pipeline downstream of it.
    pub fn value_stream_map_for_material(&self, fingerprint: &str, revision: &str) -> Result<PresentationModel> {
        info!(fingerprint, revision, "building value stream map for material");

        let material = self
            .pipelines
            .material(fingerprint)
            .ok_or_else(|| VsmError::MaterialNotFound(fingerprint.to_string()))?;
        let modification = self
            .history
            .find_modification(fingerprint, revision)
            .ok_or_else(|| VsmError::ModificationNotFound {
                revision: revision.to_string(),
                fingerprint: fingerprint.to_string(),
            })?;

        let root = NodeId::from(material.fingerprint.as_str());
        let node = Node::material(root.clone(), material.display_name, material.material_type);
        let mut graph = ValueStreamMap::for_material(node, Some(modification)).with_config(self.config.clone());

        let mut expanded = HashSet::new();
        for name in self.pipelines.pipelines_using_material(fingerprint) {
            let child = NodeId::from(name.as_str());
            graph.add_downstream_node(Node::pipeline(child.clone(), name), &root)?;
            self.add_downstream(&mut graph, &child, &mut expanded)?;
        }

        self.ensure_acyclic(&graph, &root)?;
        self.lay_out(graph, &root)
    }

    fn add_upstream(
        &self,
        graph: &mut ValueStreamMap,
        pipeline: &NodeId,
        counter: u32,
        visited: &mut HashSet<(NodeId, u32)>,
    ) -> Result<()> {
        if !visited.insert((pipeline.clone(), counter)) {
            return Ok(());
        }
        let Some(cause) = self.history.build_cause_for(pipeline, counter) else {
            debug!(pipeline = %pipeline, counter, "no build cause recorded");
            return Ok(());
        };

        for entry in cause.entries {
            match entry {
                BuildCauseEntry::Upstream(revision) => {
                    let upstream = NodeId::from(revision.pipeline_name.as_str());
                    let upstream_counter = revision.counter;
                    let name = self
                        .pipelines
                        .pipeline_name(&upstream)
                        .unwrap_or_else(|| revision.pipeline_name.clone());
                    graph.add_upstream_node(Node::pipeline(upstream.clone(), name), Some(revision), pipeline)?;
                    self.add_upstream(graph, &upstream, upstream_counter, visited)?;
                }
                BuildCauseEntry::Material(revision) => {
                    let Some(material) = revision.material.clone() else {
                        continue;
                    };
                    let material_name = self.pipelines.material_name(pipeline, &material.fingerprint);
                    let node = Node::material(
                        material.fingerprint.as_str(),
                        material.display_name,
                        material.material_type,
                    );
                    graph.add_upstream_material_node(node, material_name.as_deref(), pipeline, Some(revision))?;
                }
            }
        }
        Ok(())
    }

    fn add_downstream(
        &self,
        graph: &mut ValueStreamMap,
        pipeline: &NodeId,
        expanded: &mut HashSet<NodeId>,
    ) -> Result<()> {
        if !expanded.insert(pipeline.clone()) {
            return Ok(());
        }
        for name in self.pipelines.downstream_of(pipeline) {
            let child = NodeId::from(name.as_str());
            graph.add_downstream_node(Node::pipeline(child.clone(), name), pipeline)?;
            self.add_downstream(graph, &child, expanded)?;
        }
        Ok(())
    }

    fn ensure_acyclic(&self, graph: &ValueStreamMap, root: &NodeId) -> Result<()> {
        if graph.has_cycle() {
            warn!(root = %root, "value stream map has a cyclic dependency");
            return Err(VsmError::CyclicDependency { root: root.clone() });
        }
        Ok(())
    }

    /// Upstream pipelines found in history but gone from configuration.
    fn mark_deleted_pipelines(&self, graph: &mut ValueStreamMap, root: &NodeId) -> Result<()> {
        let deleted: Vec<NodeId> = graph
            .nodes()
            .filter(|n| n.node_type() == NodeType::Pipeline && n.id() != root)
            .filter(|n| !self.pipelines.has_pipeline(n.id()))
            .map(|n| n.id().clone())
            .collect();

        for id in deleted {
            warn!(pipeline = %id, "upstream pipeline no longer configured");
            graph.mark_deleted(&id, &self.config.deleted_pipeline_message)?;
        }
        Ok(())
    }

    fn lay_out(&self, mut graph: ValueStreamMap, root: &NodeId) -> Result<PresentationModel> {
        let model = graph.presentation_model()?;
        info!(
            root = %root,
            nodes = graph.node_count(),
            levels = model.level_count(),
            "value stream map ready"
        );
        Ok(model)
    }
}
