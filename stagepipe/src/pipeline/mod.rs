//! Pipeline configuration and execution.
//!
//! This module provides:
//! - Stage descriptors and the configuration that orders them
//! - The engine that runs commands and sessions across live stages
//! - Engine options and diagnostic snapshots

mod config;
mod engine;
mod options;
mod session;
mod snapshot;
mod spec;


pub use config::PipelineConfig;
pub use engine::PipelineEngine;
pub use options::EngineOptions;
pub use snapshot::{PipelineSnapshot, StageSnapshot};
pub use spec::{StageDescriptor, StageFactory, StageSpec};
