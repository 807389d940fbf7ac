//! Value Stream Map Graph
//!
//! This module implements the lineage graph of a pipeline and the layout
//! that turns it into columns for rendering.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are pipelines, source control materials, or dummy placeholders
//! - Edges point from an upstream dependency to its dependant
//!
//! It is built incrementally as the service walks build history upstream
//! and configuration downstream, so the same node is usually discovered
//! more than once. Layout then runs in three steps: cycle check, level
//! assignment with dummy insertion, and ordering within each level.
//!
//! # Design Decisions
//!
//! 1. Nodes live in one store indexed by id. Edges are ids, so rediscovering
//!    a node never creates a second copy of it.
//!
//! 2. Both parent and child edges are kept, in discovery order. Layout
//!    walks in both directions and the order decides ties.
//!
//! 3. Layout writes levels and depths back onto the nodes, and the
//!    presentation model is a snapshot of them.

mod cycle;
mod leveling;
mod node;
mod ordering;
mod presentation;
mod value_stream_map;

pub use leveling::NodeLevelMap;
pub use node::{MaterialDetails, Node, NodeId, NodeKind, NodeType, ViewType};
pub use presentation::PresentationModel;
pub use value_stream_map::ValueStreamMap;
