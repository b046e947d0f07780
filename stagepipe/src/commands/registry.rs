//! Per-stage-type registry of commands and session commands.

use super::bound::{bind_command, StageCommand};
use super::definition::{CommandHandler, SessionHandler};
use crate::core::{is_assignable, Payload, PayloadLineage, SessionKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Commands known to one stage type.
///
/// Commands are grouped into buckets by name. `None` and `""` both address
/// the default bucket. Within a bucket definitions keep their registration
/// order, which is also their priority during resolution.
pub struct CommandRegistry<S> {
    commands: HashMap<String, Vec<Arc<dyn StageCommand>>>,
    start: Option<Arc<dyn SessionHandler<S>>>,
    abort: Option<Arc<dyn SessionHandler<S>>>,
    end: Option<Arc<dyn SessionHandler<S>>>,
}

impl<S: 'static> CommandRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command for payloads of type `P` to the named bucket.
    pub fn define<P, H>(&mut self, name: Option<&str>, handler: H)
    where
        P: Payload,
        H: CommandHandler<S, P> + 'static,
    {
        self.commands
            .entry(bucket_key(name).to_string())
            .or_default()
            .push(bind_command::<S, P, H>(handler));
    }

    /// Fluent form of [`define`](Self::define).
    #[must_use]
    pub fn with_command<P, H>(mut self, name: Option<&str>, handler: H) -> Self
    where
        P: Payload,
        H: CommandHandler<S, P> + 'static,
    {
        self.define::<P, H>(name, handler);
        self
    }

    /// Sets the session command for `kind`, replacing any previous one.
    pub fn define_session<H>(&mut self, kind: SessionKind, handler: H)
    where
        H: SessionHandler<S> + 'static,
    {
        let handler: Arc<dyn SessionHandler<S>> = Arc::new(handler);
        match kind {
            SessionKind::Start => self.start = Some(handler),
            SessionKind::Abort => self.abort = Some(handler),
            SessionKind::End => self.end = Some(handler),
        }
    }

    /// Sets the start-session command.
    #[must_use]
    pub fn with_start_session<H: SessionHandler<S> + 'static>(mut self, handler: H) -> Self {
        self.define_session(SessionKind::Start, handler);
        self
    }

    /// Sets the abort-session command.
    #[must_use]
    pub fn with_abort_session<H: SessionHandler<S> + 'static>(mut self, handler: H) -> Self {
        self.define_session(SessionKind::Abort, handler);
        self
    }

    /// Sets the end-session command.
    #[must_use]
    pub fn with_end_session<H: SessionHandler<S> + 'static>(mut self, handler: H) -> Self {
        self.define_session(SessionKind::End, handler);
        self
    }
}

impl<S> CommandRegistry<S> {
    /// Every definition in the named bucket, in registration order.
    pub fn resolve_all(&self, name: Option<&str>) -> &[Arc<dyn StageCommand>] {
        self.commands
            .get(bucket_key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The first definition in the named bucket that accepts a `P`.
    pub fn resolve_one<P: Payload>(&self, name: Option<&str>) -> Option<Arc<dyn StageCommand>> {
        self.resolve_compatible(name, &PayloadLineage::of::<P>())
    }

    /// The first definition in the named bucket that accepts `lineage`.
    pub fn resolve_compatible(
        &self,
        name: Option<&str>,
        lineage: &PayloadLineage,
    ) -> Option<Arc<dyn StageCommand>> {
        first_compatible(self.resolve_all(name), lineage)
    }

    /// The session command for `kind`, if one was defined.
    pub fn session_command(&self, kind: SessionKind) -> Option<Arc<dyn SessionHandler<S>>> {
        match kind {
            SessionKind::Start => self.start.clone(),
            SessionKind::Abort => self.abort.clone(),
            SessionKind::End => self.end.clone(),
        }
    }

    /// Returns true if the named bucket holds at least one definition.
    pub fn contains(&self, name: Option<&str>) -> bool {
        !self.resolve_all(name).is_empty()
    }

    /// Total number of command definitions across buckets.
    pub fn len(&self) -> usize {
        self.commands.values().map(Vec::len).sum()
    }

    /// Returns true if no command is defined.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            start: None,
            abort: None,
            end: None,
        }
    }
}

impl<S> fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buckets: Vec<(&str, usize)> = self
            .commands
            .iter()
            .map(|(name, defs)| (name.as_str(), defs.len()))
            .collect();
        buckets.sort_unstable();

        f.debug_struct("CommandRegistry")
            .field("buckets", &buckets)
            .field("start", &self.start.is_some())
            .field("abort", &self.abort.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}

/// Picks the first command whose declared type `lineage` can be viewed as.
pub fn first_compatible(
    commands: &[Arc<dyn StageCommand>],
    lineage: &PayloadLineage,
) -> Option<Arc<dyn StageCommand>> {
    commands
        .iter()
        .find(|command| is_assignable(lineage, command.declared_type()))
        .cloned()
}

pub(crate) fn bucket_key(name: Option<&str>) -> &str {
    name.unwrap_or_default()
}
