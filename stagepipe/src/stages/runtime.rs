//! Stage runtime: one stage instance plus its resolved commands and session state.

use crate::commands::{bucket_key, first_compatible, CommandRegistry, SessionHandler, StageCommand};
use crate::core::{HandlerPhase, Payload, PayloadLineage, SessionKind, SessionStatus};
use crate::errors::{HandlerError, PipelineError};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The stage-type-erased surface the engine drives.
pub trait PipelineStage: Send {
    /// The unique stage name.
    fn name(&self) -> &str;

    /// The type name of the wrapped instance.
    fn stage_type(&self) -> &'static str;

    /// The `TypeId` of the wrapped instance type.
    fn instance_type_id(&self) -> TypeId;

    /// The current session state.
    fn session_status(&self) -> SessionStatus;

    /// Returns true while the stage's session is starting or active.
    fn session_started(&self) -> bool {
        self.session_status().is_started()
    }

    /// Returns true while the stage's session is aborting or aborted.
    fn session_aborted(&self) -> bool {
        self.session_status().is_aborted()
    }

    /// Resolves the command to run for `name` and a payload of `lineage`.
    fn resolve_command(
        &mut self,
        name: Option<&str>,
        lineage: &PayloadLineage,
        allow_cache: bool,
    ) -> Option<Arc<dyn StageCommand>>;

    /// The wrapped instance, or `None` once disposed.
    fn instance_any(&self) -> Option<&dyn Any>;

    /// Mutable access to the wrapped instance, or `None` once disposed.
    fn instance_any_mut(&mut self) -> Option<&mut dyn Any>;

    /// Runs one session transition, if the current state allows it.
    fn run_session(&mut self, kind: SessionKind, phase: HandlerPhase) -> Result<(), HandlerError>;

    /// Command names with a cache entry, sorted.
    fn cached_command_names(&self) -> Vec<String>;

    /// Returns true once the stage has been disposed.
    fn is_disposed(&self) -> bool;

    /// Force-aborts an unaborted session and releases the instance.
    fn dispose(&mut self) -> Result<(), HandlerError>;
}

/// Wraps one stage instance of type `S`.
pub struct StageRuntime<S> {
    name: String,
    instance: Option<S>,
    registry: Arc<CommandRegistry<S>>,
    start: Option<Arc<dyn SessionHandler<S>>>,
    abort: Option<Arc<dyn SessionHandler<S>>>,
    end: Option<Arc<dyn SessionHandler<S>>>,
    cache: HashMap<String, Vec<Arc<dyn StageCommand>>>,
    status: SessionStatus,
    disposed: bool,
}

impl<S> StageRuntime<S> {
    /// Wraps `instance` under `name`, resolving its session commands.
    pub fn new(name: impl Into<String>, instance: S, registry: Arc<CommandRegistry<S>>) -> Self {
        Self {
            name: name.into(),
            instance: Some(instance),
            start: registry.session_command(SessionKind::Start),
            abort: registry.session_command(SessionKind::Abort),
            end: registry.session_command(SessionKind::End),
            registry,
            cache: HashMap::new(),
            status: SessionStatus::default(),
            disposed: false,
        }
    }

    /// The stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped instance, or `None` once disposed.
    pub fn instance(&self) -> Option<&S> {
        self.instance.as_ref()
    }

    /// Mutable access to the wrapped instance, or `None` once disposed.
    pub fn instance_mut(&mut self) -> Option<&mut S> {
        self.instance.as_mut()
    }

    /// The current session state.
    pub fn session_status(&self) -> SessionStatus {
        self.status
    }

    /// The command to run for `name` on a payload of type `P`.
    ///
    /// Falls back to the default bucket when the named bucket holds no
    /// compatible command. `None` means the stage has nothing to run.
    pub fn run_command<P: Payload>(
        &mut self,
        name: Option<&str>,
        allow_cache: bool,
    ) -> Option<Arc<dyn StageCommand>> {
        self.resolve(name, &PayloadLineage::of::<P>(), allow_cache)
    }

    fn resolve(
        &mut self,
        name: Option<&str>,
        lineage: &PayloadLineage,
        allow_cache: bool,
    ) -> Option<Arc<dyn StageCommand>> {
        let found = self.lookup(name, lineage, allow_cache);
        if found.is_some() || bucket_key(name).is_empty() {
            return found;
        }
        self.lookup(None, lineage, allow_cache)
    }

    fn lookup(
        &mut self,
        name: Option<&str>,
        lineage: &PayloadLineage,
        allow_cache: bool,
    ) -> Option<Arc<dyn StageCommand>> {
        if !allow_cache {
            return self.registry.resolve_compatible(name, lineage);
        }

        let key = bucket_key(name);
        if let Some(commands) = self.cache.get(key) {
            return first_compatible(commands, lineage);
        }

        // Only buckets that exist are cached; unknown names stay uncached.
        let commands = self.registry.resolve_all(name);
        if commands.is_empty() {
            return None;
        }
        let found = first_compatible(commands, lineage);
        self.cache.insert(key.to_string(), commands.to_vec());
        found
    }

    /// Runs the start pre-handler. Valid from `NeverStarted`, `Aborted`, `Ended`.
    pub fn start(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::Start, HandlerPhase::Pre)
    }

    /// Runs the start post-handler. Valid from `Starting`.
    pub fn post_start(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::Start, HandlerPhase::Post)
    }

    /// Runs the abort pre-handler. Valid from `Starting`, `Started`.
    pub fn abort(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::Abort, HandlerPhase::Pre)
    }

    /// Runs the abort post-handler. Valid from `Aborting`.
    pub fn post_abort(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::Abort, HandlerPhase::Post)
    }

    /// Runs the end pre-handler. Valid from `Started`.
    pub fn end(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::End, HandlerPhase::Pre)
    }

    /// Runs the end post-handler. Valid from `Ending`.
    pub fn post_end(&mut self) -> Result<(), HandlerError> {
        self.transition(SessionKind::End, HandlerPhase::Post)
    }

    // The new state holds even when the handler fails.
    fn transition(&mut self, kind: SessionKind, phase: HandlerPhase) -> Result<(), HandlerError> {
        if self.disposed {
            return Err(PipelineError::Disposed {
                stage: self.name.clone(),
            }
            .into());
        }
        let Some(next) = self.status.next(kind, phase) else {
            return Ok(());
        };
        debug!(stage = %self.name, %kind, %phase, from = %self.status, to = %next, "Session transition");
        self.status = next;

        let handler = match kind {
            SessionKind::Start => self.start.clone(),
            SessionKind::Abort => self.abort.clone(),
            SessionKind::End => self.end.clone(),
        };
        let Some(handler) = handler else {
            return Ok(());
        };

        let instance = self.instance.as_mut().ok_or_else(|| PipelineError::Disposed {
            stage: self.name.clone(),
        })?;
        let outcome = match phase {
            HandlerPhase::Pre => handler.run(instance),
            HandlerPhase::Post => handler.run_post(instance),
        };
        outcome.map(|_| ())
    }

    /// Force-aborts an unaborted session, then releases the instance and
    /// clears the cache. Later calls do nothing.
    pub fn dispose(&mut self) -> Result<(), HandlerError> {
        if self.disposed {
            return Ok(());
        }

        let mut result = Ok(());
        if !self.status.is_aborted() {
            let pre = self.abort();
            let post = self.post_abort();
            result = pre.and(post);
        }

        self.disposed = true;
        self.instance = None;
        self.cache.clear();
        debug!(stage = %self.name, "Stage disposed");
        result
    }
}

impl<S: Send + 'static> PipelineStage for StageRuntime<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage_type(&self) -> &'static str {
        type_name::<S>()
    }

    fn instance_type_id(&self) -> TypeId {
        TypeId::of::<S>()
    }

    fn session_status(&self) -> SessionStatus {
        self.status
    }

    fn resolve_command(
        &mut self,
        name: Option<&str>,
        lineage: &PayloadLineage,
        allow_cache: bool,
    ) -> Option<Arc<dyn StageCommand>> {
        self.resolve(name, lineage, allow_cache)
    }

    fn instance_any(&self) -> Option<&dyn Any> {
        self.instance.as_ref().map(|s| s as &dyn Any)
    }

    fn instance_any_mut(&mut self) -> Option<&mut dyn Any> {
        self.instance.as_mut().map(|s| s as &mut dyn Any)
    }

    fn run_session(&mut self, kind: SessionKind, phase: HandlerPhase) -> Result<(), HandlerError> {
        self.transition(kind, phase)
    }

    fn cached_command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.keys().cloned().collect();
        names.sort();
        names
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn dispose(&mut self) -> Result<(), HandlerError> {
        StageRuntime::dispose(self)
    }
}

impl<S> Drop for StageRuntime<S> {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(stage = %self.name, error = %err, "Abort during stage teardown failed");
        }
    }
}

impl<S> fmt::Debug for StageRuntime<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRuntime")
            .field("name", &self.name)
            .field("stage_type", &type_name::<S>())
            .field("status", &self.status)
            .field("disposed", &self.disposed)
            .field("cached", &self.cache.len())
            .finish()
    }
}
