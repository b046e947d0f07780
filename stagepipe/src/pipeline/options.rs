//! Engine behaviour switches.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// Options applied to every engine created from a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Resolve every command of a name once per stage and reuse the list.
    pub cache_commands: bool,
    /// Abort a running session when the engine is disposed.
    pub abort_on_dispose: bool,
    /// Report lifecycle events to the configured sink.
    pub emit_events: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_commands: true,
            abort_on_dispose: true,
            emit_events: true,
        }
    }
}

impl EngineOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets command caching.
    #[must_use]
    pub fn with_cache_commands(mut self, enabled: bool) -> Self {
        self.cache_commands = enabled;
        self
    }

    /// Sets the abort sweep on dispose.
    #[must_use]
    pub fn with_abort_on_dispose(mut self, enabled: bool) -> Self {
        self.abort_on_dispose = enabled;
        self
    }

    /// Sets event emission.
    #[must_use]
    pub fn with_emit_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Parses options from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the JSON is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json)
            .map_err(|err| PipelineError::Config(format!("invalid engine options: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert!(options.cache_commands);
        assert!(options.abort_on_dispose);
        assert!(options.emit_events);
    }

    #[test]
    fn test_builder() {
        let options = EngineOptions::new()
            .with_cache_commands(false)
            .with_emit_events(false);
        assert!(!options.cache_commands);
        assert!(options.abort_on_dispose);
        assert!(!options.emit_events);
    }

    #[test]
    fn test_from_json_keeps_missing_defaults() {
        let options = EngineOptions::from_json_str(r#"{"abort_on_dispose": false}"#).unwrap();
        assert!(!options.abort_on_dispose);
        assert!(options.cache_commands);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = EngineOptions::from_json_str("{cache").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(err.to_string().contains("invalid engine options"));
    }
}
