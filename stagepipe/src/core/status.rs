//! Session status and session kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The session state of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session was ever started on the stage.
    #[default]
    NeverStarted,
    /// The start pre-handler ran; the post-handler has not yet.
    Starting,
    /// The session is active.
    Started,
    /// The abort pre-handler ran; the post-handler has not yet.
    Aborting,
    /// The session was aborted.
    Aborted,
    /// The end pre-handler ran; the post-handler has not yet.
    Ending,
    /// The session ended normally.
    Ended,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeverStarted => write!(f, "never_started"),
            Self::Starting => write!(f, "starting"),
            Self::Started => write!(f, "started"),
            Self::Aborting => write!(f, "aborting"),
            Self::Aborted => write!(f, "aborted"),
            Self::Ending => write!(f, "ending"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

impl SessionStatus {
    /// Returns true if a new session may be started from this state.
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::NeverStarted | Self::Aborted | Self::Ended)
    }

    /// Returns true if the running session may be aborted from this state.
    #[must_use]
    pub fn can_abort(self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }

    /// Returns true if the running session may be ended from this state.
    #[must_use]
    pub fn can_end(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns true while a session is starting or active.
    #[must_use]
    pub fn is_started(self) -> bool {
        matches!(self, Self::Starting | Self::Started)
    }

    /// Returns true while a session is aborting or was aborted.
    #[must_use]
    pub fn is_aborted(self) -> bool {
        matches!(self, Self::Aborting | Self::Aborted)
    }

    /// The state a transition leads to, or `None` if it does not fire here.
    #[must_use]
    pub fn next(self, kind: SessionKind, phase: HandlerPhase) -> Option<Self> {
        let (fires, next) = match (kind, phase) {
            (SessionKind::Start, HandlerPhase::Pre) => (self.can_start(), Self::Starting),
            (SessionKind::Start, HandlerPhase::Post) => (self == Self::Starting, Self::Started),
            (SessionKind::Abort, HandlerPhase::Pre) => (self.can_abort(), Self::Aborting),
            (SessionKind::Abort, HandlerPhase::Post) => (self == Self::Aborting, Self::Aborted),
            (SessionKind::End, HandlerPhase::Pre) => (self.can_end(), Self::Ending),
            (SessionKind::End, HandlerPhase::Post) => (self == Self::Ending, Self::Ended),
        };
        fires.then_some(next)
    }
}

/// The three bracketing session commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Open a session.
    Start,
    /// Roll a session back.
    Abort,
    /// Close a session normally.
    End,
}

impl SessionKind {
    /// Upper-case label used in error codes.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Abort => "ABORT",
            Self::End => "END",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Abort => write!(f, "abort"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Which half of a handler pair is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerPhase {
    /// Forward descent.
    Pre,
    /// Reverse unwind.
    Post,
}

impl fmt::Display for HandlerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_display() {
        assert_eq!(SessionStatus::NeverStarted.to_string(), "never_started");
        assert_eq!(SessionStatus::Aborting.to_string(), "aborting");
        assert_eq!(SessionStatus::Ended.to_string(), "ended");
    }

    #[test]
    fn test_session_status_transitions() {
        assert!(SessionStatus::NeverStarted.can_start());
        assert!(SessionStatus::Aborted.can_start());
        assert!(SessionStatus::Ended.can_start());
        assert!(!SessionStatus::Started.can_start());

        assert!(SessionStatus::Starting.can_abort());
        assert!(SessionStatus::Started.can_abort());
        assert!(!SessionStatus::Aborted.can_abort());
        assert!(!SessionStatus::Ended.can_abort());

        assert!(SessionStatus::Started.can_end());
        assert!(!SessionStatus::Starting.can_end());
    }

    #[test]
    fn test_next_follows_session_table() {
        use HandlerPhase::{Post, Pre};
        use SessionKind::{Abort, End, Start};

        assert_eq!(SessionStatus::NeverStarted.next(Start, Pre), Some(SessionStatus::Starting));
        assert_eq!(SessionStatus::Starting.next(Start, Post), Some(SessionStatus::Started));
        assert_eq!(SessionStatus::Started.next(Start, Pre), None);
        assert_eq!(SessionStatus::Starting.next(Abort, Pre), Some(SessionStatus::Aborting));
        assert_eq!(SessionStatus::Aborting.next(Abort, Post), Some(SessionStatus::Aborted));
        assert_eq!(SessionStatus::Aborted.next(Abort, Pre), None);
        assert_eq!(SessionStatus::Started.next(End, Pre), Some(SessionStatus::Ending));
        assert_eq!(SessionStatus::Ending.next(End, Post), Some(SessionStatus::Ended));
        assert_eq!(SessionStatus::Starting.next(End, Pre), None);
        assert_eq!(SessionStatus::Started.next(End, Post), None);
    }

    #[test]
    fn test_session_status_queries() {
        assert!(SessionStatus::Started.is_started());
        assert!(!SessionStatus::Ended.is_started());
        assert!(SessionStatus::Aborted.is_aborted());
        assert!(!SessionStatus::Started.is_aborted());
    }

    #[test]
    fn test_session_status_serialize() {
        let json = serde_json::to_string(&SessionStatus::NeverStarted).unwrap();
        assert_eq!(json, r#""never_started""#);

        let status: SessionStatus = serde_json::from_str(r#""started""#).unwrap();
        assert_eq!(status, SessionStatus::Started);
    }

    #[test]
    fn test_session_kind_code() {
        assert_eq!(SessionKind::Start.code(), "START");
        assert_eq!(SessionKind::Abort.to_string(), "abort");
    }
}
