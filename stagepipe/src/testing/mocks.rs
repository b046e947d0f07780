//! Recording stages for exercising engines in tests.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::commands::{CommandDefinition, CommandRegistry, SessionCommandDefinition};
use crate::core::{CommandParams, PipelineAction};

/// A shared, append-only call history.
///
/// Clones share the same history, so one recorder can be handed to every
/// stage of a pipeline and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Counts entries equal to `entry`.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Clears the history.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A stage that records every command and session call it receives.
#[derive(Debug, Clone)]
pub struct Visitor {
    name: String,
    recorder: Recorder,
}

impl Visitor {
    /// Creates a visitor writing to `recorder`.
    #[must_use]
    pub fn new(name: impl Into<String>, recorder: Recorder) -> Self {
        Self {
            name: name.into(),
            recorder,
        }
    }

    /// A factory closure for stage configuration.
    pub fn factory(
        name: impl Into<String>,
        recorder: &Recorder,
    ) -> impl Fn() -> Self + Send + Sync + 'static {
        let name = name.into();
        let recorder = recorder.clone();
        move || Self::new(name.clone(), recorder.clone())
    }

    /// The visitor's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records `<name>.visit(<data>)`.
    pub fn visit(&self, data: &str) {
        self.recorder.record(format!("{}.visit({data})", self.name));
    }

    /// Records `<name>.post_visit(<data>)`.
    pub fn post_visit(&self, data: &str) {
        self.recorder.record(format!("{}.post_visit({data})", self.name));
    }

    /// Records `<name>.<event>`.
    pub fn note(&self, event: &str) {
        self.recorder.record(format!("{}.{event}", self.name));
    }
}

/// Registration helpers for [`Visitor`] commands.
pub trait VisitorCommands: Sized {
    /// Registers a `String` command under `name` that records both halves
    /// and returns the given actions.
    #[must_use]
    fn with_visit_command(
        self,
        name: Option<&str>,
        after_visit: PipelineAction,
        after_post_visit: PipelineAction,
    ) -> Self;

    /// Registers start, abort and end session commands that record each
    /// half as `<name>.<kind>_session` and `<name>.post_<kind>_session`.
    #[must_use]
    fn with_visitor_sessions(self) -> Self;
}

impl VisitorCommands for CommandRegistry<Visitor> {
    fn with_visit_command(
        self,
        name: Option<&str>,
        after_visit: PipelineAction,
        after_post_visit: PipelineAction,
    ) -> Self {
        self.with_command::<String, _>(
            name,
            CommandDefinition::new(move |v: &mut Visitor, p: &mut CommandParams<'_, String>| {
                v.visit(p.payload());
                Ok(after_visit)
            })
            .with_post(move |v: &mut Visitor, p: &mut CommandParams<'_, String>| {
                v.post_visit(p.payload());
                Ok(after_post_visit)
            }),
        )
    }

    fn with_visitor_sessions(self) -> Self {
        self.with_start_session(recording_session("start"))
            .with_abort_session(recording_session("abort"))
            .with_end_session(recording_session("end"))
    }
}

fn recording_session(kind: &'static str) -> SessionCommandDefinition<Visitor> {
    SessionCommandDefinition::new(move |v: &mut Visitor| {
        v.note(&format!("{kind}_session"));
        Ok(PipelineAction::Continue)
    })
    .with_post(move |v: &mut Visitor| {
        v.note(&format!("post_{kind}_session"));
        Ok(PipelineAction::Continue)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_is_shared_between_clones() {
        let recorder = Recorder::new();
        let clone = recorder.clone();
        clone.record("a");
        clone.record("a");

        assert_eq!(recorder.entries(), vec!["a", "a"]);
        assert_eq!(recorder.count("a"), 2);

        recorder.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_visitor_entries() {
        let recorder = Recorder::new();
        let visitor = Visitor::factory("A", &recorder)();

        visitor.visit("x");
        visitor.post_visit("x");
        visitor.note("start_session");

        assert_eq!(visitor.name(), "A");
        assert_eq!(
            recorder.entries(),
            vec!["A.visit(x)", "A.post_visit(x)", "A.start_session"]
        );
    }

    #[test]
    fn test_visitor_registry_helpers() {
        let registry = CommandRegistry::<Visitor>::new()
            .with_visit_command(Some("Visit"), PipelineAction::Continue, PipelineAction::Continue)
            .with_visitor_sessions();

        assert!(registry.contains(Some("Visit")));
        assert_eq!(registry.len(), 1);
        assert!(registry.session_command(crate::core::SessionKind::End).is_some());
    }
}
