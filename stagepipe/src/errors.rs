//! Error types for the stagepipe engine.
//!
//! Two regimes exist side by side. Command handler errors abort the
//! traversal and surface as [`PipelineError::Command`]. Session handler
//! errors are collected per stage and surface together as one
//! [`SessionError`] once every stage had its turn.

use crate::core::{HandlerPhase, SessionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Error type returned by command and session handlers.
pub type HandlerError = anyhow::Error;

/// Label used in messages for the default (unnamed) command bucket.
pub const DEFAULT_COMMAND_LABEL: &str = "<default>";

/// Error code for duplicate stage names.
pub const DUPLICATE_STAGE_CODE: &str = "PIPELINE-001-DUPLICATE_STAGE";

/// The main error type for stagepipe operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage name was registered twice in one configuration.
    #[error("{0}")]
    DuplicateStage(#[from] DuplicateStageError),

    /// A command handler failed; traversal stopped where it was.
    #[error(
        "Command '{}' failed in stage '{stage}' during {phase}: {source}",
        .command.as_deref().unwrap_or(DEFAULT_COMMAND_LABEL)
    )]
    Command {
        /// The stage whose handler failed.
        stage: String,
        /// The command name of the call.
        command: Option<String>,
        /// Whether the pre- or post-handler failed.
        phase: HandlerPhase,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },

    /// One or more stages failed a session sweep.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// A bound command was driven against an instance of another type.
    #[error("Stage instance is not a {expected}")]
    StageTypeMismatch {
        /// The stage type the command was bound for.
        expected: &'static str,
    },

    /// A handler could not view the payload as its declared type.
    #[error("Payload of type {actual} cannot be viewed as {expected}")]
    PayloadMismatch {
        /// The handler's declared payload type.
        expected: &'static str,
        /// The payload type of the call.
        actual: &'static str,
    },

    /// The stage instance was already released.
    #[error("Stage '{stage}' has been disposed")]
    Disposed {
        /// The stage name.
        stage: String,
    },

    /// Invalid engine or logging configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Returns the session error if this is one.
    #[must_use]
    pub fn as_session(&self) -> Option<&SessionError> {
        match self {
            Self::Session(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the structured error info, when the variant carries one.
    #[must_use]
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::DuplicateStage(err) => Some(&err.error_info),
            Self::Session(err) => Some(&err.error_info),
            _ => None,
        }
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "PIPELINE-001-DUPLICATE_STAGE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info, picking up the default fix hint for `code`.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let code = code.into();
        let fix_hint = ErrorSuggestions::get(&code).map(String::from);
        Self {
            code,
            summary: summary.into(),
            fix_hint,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::Value::String(self.code.clone()));
        map.insert("summary".to_string(), serde_json::Value::String(self.summary.clone()));

        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        if !self.context.is_empty() {
            let context_map: serde_json::Map<String, serde_json::Value> = self
                .context
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            map.insert("context".to_string(), serde_json::Value::Object(context_map));
        }

        map
    }
}

/// Error raised when a stage name is already taken in a configuration.
#[derive(Debug, Clone, Error)]
#[error("There is already another configured stage with name '{name}'")]
pub struct DuplicateStageError {
    /// The conflicting name.
    pub name: String,
    /// Error info.
    pub error_info: ErrorInfo,
}

impl DuplicateStageError {
    /// Creates a new duplicate stage error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let error_info = ErrorInfo::new(
            DUPLICATE_STAGE_CODE,
            format!("Stage name '{name}' is registered twice"),
        )
        .with_context_entry("stage", name.clone());
        Self { name, error_info }
    }
}

/// One stage's failure during a session sweep.
#[derive(Debug)]
pub struct SessionFailure {
    /// The stage name.
    pub stage: String,
    /// The session command being run.
    pub kind: SessionKind,
    /// Whether the pre- or post-handler failed.
    pub phase: HandlerPhase,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    /// The handler's error.
    pub error: HandlerError,
}

impl SessionFailure {
    /// Creates a failure record stamped with the current time.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        kind: SessionKind,
        phase: HandlerPhase,
        error: HandlerError,
    ) -> Self {
        Self {
            stage: stage.into(),
            kind,
            phase,
            timestamp: Utc::now(),
            error,
        }
    }

    /// Converts to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage,
            "kind": self.kind,
            "phase": self.phase,
            "error": self.error.to_string(),
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}

/// Aggregate error raised after a session sweep in which any stage failed.
#[derive(Debug, Error)]
#[error(
    "One or more stages failed to {kind} the session: {}",
    .failures.iter().map(|f| format!("{} ({}): {}", f.stage, f.phase, f.error)).collect::<Vec<_>>().join("; ")
)]
pub struct SessionError {
    /// The session command of the sweep.
    pub kind: SessionKind,
    /// Every failure, in the order they happened.
    pub failures: Vec<SessionFailure>,
    /// Error info.
    pub error_info: ErrorInfo,
}

impl SessionError {
    /// Creates a new aggregate session error.
    #[must_use]
    pub fn new(kind: SessionKind, failures: Vec<SessionFailure>) -> Self {
        let error_info = ErrorInfo::new(
            format!("PIPELINE-SESSION-{}", kind.code()),
            format!("{} stage handler(s) failed to {kind} the session", failures.len()),
        );
        Self {
            kind,
            failures,
            error_info,
        }
    }

    /// Names of the failed stages, deduplicated, in failure order.
    #[must_use]
    pub fn stages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.stage.as_str()) {
                names.push(&failure.stage);
            }
        }
        names
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert("kind".to_string(), serde_json::json!(self.kind));
        map.insert(
            "failures".to_string(),
            serde_json::Value::Array(self.failures.iter().map(SessionFailure::to_json).collect()),
        );
        let info_map: serde_json::Map<String, serde_json::Value> =
            self.error_info.to_dict().into_iter().collect();
        map.insert("error_info".to_string(), serde_json::Value::Object(info_map));
        map
    }
}

/// Provides default suggestions for stagepipe error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            DUPLICATE_STAGE_CODE => Some(
                "Stage names must be unique within a configuration. \
                 Rename one of the stages.",
            ),
            "PIPELINE-SESSION-START" => Some(
                "Inspect each failure; stages that started successfully are still \
                 active and will be aborted when the pipeline is disposed.",
            ),
            "PIPELINE-SESSION-ABORT" | "PIPELINE-SESSION-END" => Some(
                "Every stage was given the chance to run its handler. \
                 Inspect each failure for resources that were not released.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "my_stage");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.summary, "Test error");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage"), Some(&"my_stage".to_string()));
    }

    #[test]
    fn test_error_info_picks_up_suggestion() {
        let info = ErrorInfo::new(DUPLICATE_STAGE_CODE, "dup");
        assert!(info.fix_hint.is_some());

        let dict = info.to_dict();
        assert_eq!(dict.get("code").unwrap(), DUPLICATE_STAGE_CODE);
    }

    #[test]
    fn test_duplicate_stage_error() {
        let err = DuplicateStageError::new("Logger");

        assert!(err.to_string().contains("'Logger'"));
        assert_eq!(err.error_info.code, DUPLICATE_STAGE_CODE);

        let err: PipelineError = err.into();
        assert_eq!(err.error_info().unwrap().code, DUPLICATE_STAGE_CODE);
    }

    #[test]
    fn test_command_error_message() {
        let err = PipelineError::Command {
            stage: "Repo".to_string(),
            command: None,
            phase: HandlerPhase::Pre,
            source: anyhow::anyhow!("disk full"),
        };

        let message = err.to_string();
        assert!(message.contains(DEFAULT_COMMAND_LABEL));
        assert!(message.contains("Repo"));
        assert!(message.contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_session_error_aggregates_failures() {
        let err = SessionError::new(
            SessionKind::Abort,
            vec![
                SessionFailure::new("A", SessionKind::Abort, HandlerPhase::Pre, anyhow::anyhow!("boom")),
                SessionFailure::new("A", SessionKind::Abort, HandlerPhase::Post, anyhow::anyhow!("again")),
                SessionFailure::new("B", SessionKind::Abort, HandlerPhase::Post, anyhow::anyhow!("late")),
            ],
        );

        assert_eq!(err.stages(), vec!["A", "B"]);
        assert_eq!(err.error_info.code, "PIPELINE-SESSION-ABORT");
        assert!(err.to_string().contains("A (pre): boom"));

        let dict = err.to_dict();
        assert_eq!(dict.get("failures").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_suggestions() {
        assert!(ErrorSuggestions::get(DUPLICATE_STAGE_CODE).is_some());
        assert!(ErrorSuggestions::get("PIPELINE-SESSION-END").is_some());
        assert!(ErrorSuggestions::get("UNKNOWN").is_none());
    }
}
