//! Serializable view of an engine's state for diagnostics.

use crate::core::SessionStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time state of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSnapshot {
    /// Stage name.
    pub name: String,
    /// Type name of the stage instance.
    pub stage_type: String,
    /// Session state.
    pub status: SessionStatus,
    /// Command names resolved and cached so far.
    #[serde(default)]
    pub cached_commands: Vec<String>,
    /// Whether the stage instance was released.
    pub disposed: bool,
}

/// Point-in-time state of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Engine id.
    pub engine_id: Uuid,
    /// Whether a session is starting or active.
    pub session_started: bool,
    /// Whether a session is aborting or was aborted.
    pub session_aborted: bool,
    /// Stages, in pipeline order.
    pub stages: Vec<StageSnapshot>,
}

impl PipelineSnapshot {
    /// Looks a stage up by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
