//! Live stages.
//!
//! A stage is any `Send + 'static` value paired with a command registry.
//! [`StageRuntime`] wraps one instance with its session state and resolved
//! command cache; [`PipelineStage`] erases the instance type so an engine
//! can hold stages of different types in one ordered list.

mod runtime;

pub use runtime::{PipelineStage, StageRuntime};
