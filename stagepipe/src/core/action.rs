//! Traversal control signal returned by every handler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Controls how a command keeps moving through the pipeline.
///
/// Pre-handlers run on each stage in registration order; once the last
/// stage is reached, post-handlers run in reverse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineAction {
    /// Descend into the next stage, then unwind through the post-handlers.
    #[default]
    Continue,
    /// Stop descending. Post-handlers still run for every visited stage,
    /// starting with the one that returned `Stop`.
    Stop,
    /// Return to the caller at once. No further pre- or post-handler runs
    /// anywhere, including on the stage that returned `Abort`.
    Abort,
}

impl PipelineAction {
    /// Returns true for [`PipelineAction::Continue`].
    #[must_use]
    pub fn is_continue(self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns true for [`PipelineAction::Abort`].
    #[must_use]
    pub fn is_abort(self) -> bool {
        matches!(self, Self::Abort)
    }
}

impl fmt::Display for PipelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Stop => write!(f, "stop"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_continue() {
        assert_eq!(PipelineAction::default(), PipelineAction::Continue);
        assert!(PipelineAction::default().is_continue());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(PipelineAction::Continue.to_string(), "continue");
        assert_eq!(PipelineAction::Stop.to_string(), "stop");
        assert_eq!(PipelineAction::Abort.to_string(), "abort");
    }

    #[test]
    fn test_action_serialize() {
        let json = serde_json::to_string(&PipelineAction::Stop).unwrap();
        assert_eq!(json, r#""stop""#);

        let back: PipelineAction = serde_json::from_str(r#""abort""#).unwrap();
        assert!(back.is_abort());
    }
}
