//! Value Stream Map Service
//!
//! Request-level assembly of value stream maps from pipeline configuration
//! and build history. Both sources sit behind traits so callers can plug in
//! their own stores; in-memory implementations are provided.

mod memory;
mod traits;
mod value_stream_map_service;

pub use memory::{MaterialConfig, PipelineConfig, PipelineConfigs, RecordedHistory};
pub use traits::{BuildCause, BuildCauseEntry, BuildHistory, DependencyConfig, PipelineInstance};
pub use value_stream_map_service::ValueStreamMapService;
