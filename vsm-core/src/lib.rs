//! VSM Core
//!
//! This crate provides the value stream map engine of a continuous delivery
//! server. It implements:
//!
//! - Incremental construction of a pipeline's dependency lineage
//! - Cycle detection for lineages broken by configuration drift
//! - Layered layout with dummy nodes and ordering within levels
//! - Revision tracking and incompatible-revision warnings
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node model, graph builder and layout
//! - `revision`: Pipeline runs and material modifications
//! - `service`: Request-level assembly from configuration and history
//! - `config`: Engine configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use vsm_core::graph::{Node, NodeId, ValueStreamMap};
//!
//! let mut graph = ValueStreamMap::new("deploy", None);
//! graph.add_upstream_node(Node::pipeline("build", "build"), None, &NodeId::from("deploy")).unwrap();
//! graph.add_downstream_node(Node::pipeline("smoke", "smoke"), &NodeId::from("deploy")).unwrap();
//!
//! let model = graph.presentation_model().unwrap();
//! assert_eq!(model.level_count(), 3);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod revision;
pub mod service;

pub use config::VsmConfig;
pub use error::{Result, VsmError};
pub use graph::{Node, NodeId, PresentationModel, ValueStreamMap};
pub use service::ValueStreamMapService;
