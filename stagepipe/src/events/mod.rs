//! Event sink system for observability.
//!
//! Engines report lifecycle milestones (creation, session sweeps, disposal)
//! to an [`EventSink`]. The sink is chosen per configuration and shared by
//! every engine created from it.

mod sink;

#[cfg(test)]
pub use sink::MockEventSink;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the engine.
pub mod names {
    use crate::core::SessionKind;

    /// A new engine was created from a configuration.
    pub const PIPELINE_CREATED: &str = "pipeline.created";
    /// An engine released its stages.
    pub const PIPELINE_DISPOSED: &str = "pipeline.disposed";

    /// `session.<kind>.completed`
    #[must_use]
    pub fn session_completed(kind: SessionKind) -> String {
        format!("session.{kind}.completed")
    }

    /// `session.<kind>.failed`
    #[must_use]
    pub fn session_failed(kind: SessionKind) -> String {
        format!("session.{kind}.failed")
    }
}
