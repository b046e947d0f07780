//! The pipeline engine: command traversal and session orchestration.

use super::options::EngineOptions;
use super::session;
use super::snapshot::{PipelineSnapshot, StageSnapshot};
use crate::commands::{bind_command, null_command, CommandHandler, StageCommand};
use crate::core::{
    HandlerPhase, Invocation, Payload, PayloadLineage, PipelineAction, SessionKind,
};
use crate::errors::{PipelineError, SessionFailure, DEFAULT_COMMAND_LABEL};
use crate::events::{names, EventSink};
use crate::observability::SpanTimer;
use crate::stages::PipelineStage;
use serde_json::json;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};
use uuid::Uuid;

type Overrides = HashMap<usize, Arc<dyn StageCommand>>;

/// An ordered set of live stages that commands and sessions run across.
///
/// Engines are created by [`PipelineConfig::create_pipeline`] and own their
/// stage instances exclusively. An engine is single-threaded and
/// non-reentrant; create one per unit of work.
///
/// Dropping an engine disposes it. If a session is still running it is
/// aborted first, and failures during that abort are logged.
///
/// [`PipelineConfig::create_pipeline`]: super::PipelineConfig::create_pipeline
pub struct PipelineEngine {
    id: Uuid,
    stages: Vec<Box<dyn PipelineStage>>,
    options: EngineOptions,
    event_sink: Arc<dyn EventSink>,
    noop: Arc<dyn StageCommand>,
    intent_started: bool,
    intent_aborted: bool,
    disposed: bool,
}

impl PipelineEngine {
    pub(crate) fn new(
        stages: Vec<Box<dyn PipelineStage>>,
        options: EngineOptions,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        let engine = Self {
            id: Uuid::new_v4(),
            stages,
            options,
            event_sink,
            noop: null_command(),
            intent_started: false,
            intent_aborted: false,
            disposed: false,
        };

        debug!(engine = %engine.id, stages = engine.stages.len(), "Pipeline created");
        engine.emit(
            names::PIPELINE_CREATED,
            json!({
                "engine_id": engine.id,
                "stages": engine.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            }),
        );
        engine
    }

    /// The engine id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The options this engine was created with.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Runs a command across all stages.
    ///
    /// Each stage runs the first command registered under `name` whose
    /// declared payload type `P` can be viewed as, falling back to the
    /// default bucket, or nothing at all. Pre-handlers run in stage order,
    /// post-handlers in reverse order.
    ///
    /// Returns `Abort` if any handler aborted, `Stop` if the descent was
    /// stopped early, `Continue` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Command`] for the first handler error. The
    /// traversal ends there and no further post-handler runs.
    pub fn run_command<P: Payload>(
        &mut self,
        name: Option<&str>,
        payload: &mut P,
    ) -> Result<PipelineAction, PipelineError> {
        let lineage = PayloadLineage::of::<P>();
        let mut invocation = Invocation::new(name, payload);
        self.traverse(&lineage, &mut invocation, &Overrides::new())
    }

    /// Runs a command whose handler is supplied for this call only.
    ///
    /// Every stage whose instance is a `TS` runs `handler`; other stages
    /// resolve their own commands as in [`run_command`](Self::run_command).
    /// Nothing about the override is cached.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Command`] for the first handler error.
    pub fn run_ad_hoc_command<TS, P, H>(
        &mut self,
        name: Option<&str>,
        payload: &mut P,
        handler: H,
    ) -> Result<PipelineAction, PipelineError>
    where
        TS: 'static,
        P: Payload,
        H: CommandHandler<TS, P> + 'static,
    {
        let bound = bind_command::<TS, P, H>(handler);
        let overrides: Overrides = self
            .stages
            .iter()
            .enumerate()
            .filter(|(_, stage)| stage.instance_type_id() == TypeId::of::<TS>())
            .map(|(index, _)| (index, Arc::clone(&bound)))
            .collect();

        let lineage = PayloadLineage::of::<P>();
        let mut invocation = Invocation::new(name, payload);
        self.traverse(&lineage, &mut invocation, &overrides)
    }

    fn traverse(
        &mut self,
        lineage: &PayloadLineage,
        invocation: &mut Invocation<'_>,
        overrides: &Overrides,
    ) -> Result<PipelineAction, PipelineError> {
        let name = invocation.command_name();
        let span = debug_span!(
            "command",
            engine = %self.id,
            command = name.unwrap_or(DEFAULT_COMMAND_LABEL),
            payload = lineage.payload_type().name(),
        );
        let _guard = span.enter();

        let allow_cache = self.options.cache_commands;
        let mut pending: Vec<(usize, Arc<dyn StageCommand>)> = Vec::with_capacity(self.stages.len());
        let mut outcome = PipelineAction::Continue;

        for (index, stage) in self.stages.iter_mut().enumerate() {
            let command = match overrides.get(&index) {
                Some(command) => Arc::clone(command),
                None => stage
                    .resolve_command(name, lineage, allow_cache)
                    .unwrap_or_else(|| Arc::clone(&self.noop)),
            };

            let action = invoke(stage.as_mut(), command.as_ref(), HandlerPhase::Pre, invocation)?;
            match action {
                PipelineAction::Continue => pending.push((index, command)),
                PipelineAction::Stop => {
                    debug!(stage = %stage.name(), "Descent stopped");
                    pending.push((index, command));
                    outcome = PipelineAction::Stop;
                    break;
                }
                PipelineAction::Abort => {
                    debug!(stage = %stage.name(), "Command aborted");
                    return Ok(PipelineAction::Abort);
                }
            }
        }

        while let Some((index, command)) = pending.pop() {
            let stage = self.stages[index].as_mut();
            if invoke(stage, command.as_ref(), HandlerPhase::Post, invocation)?.is_abort() {
                debug!(stage = %stage.name(), "Unwind aborted");
                return Ok(PipelineAction::Abort);
            }
        }

        Ok(outcome)
    }

    /// Starts a session on every stage unless one is already running or
    /// the engine was disposed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Session`] if any stage handler failed. All
    /// stages still ran both halves of the start command.
    pub fn start_session(&mut self) -> Result<(), PipelineError> {
        if self.disposed || self.session_started() {
            debug!(engine = %self.id, disposed = self.disposed, "Session start skipped");
            return Ok(());
        }
        self.intent_started = true;
        self.intent_aborted = false;
        self.run_session(SessionKind::Start)
    }

    /// Aborts the running session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Session`] if any stage handler failed.
    pub fn abort_session(&mut self) -> Result<(), PipelineError> {
        if self.disposed || !self.session_started() {
            return Ok(());
        }
        self.intent_started = false;
        self.intent_aborted = true;
        self.run_session(SessionKind::Abort)
    }

    /// Ends the running session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Session`] if any stage handler failed.
    pub fn end_session(&mut self) -> Result<(), PipelineError> {
        if self.disposed || !self.session_started() {
            return Ok(());
        }
        self.intent_started = false;
        self.intent_aborted = false;
        self.run_session(SessionKind::End)
    }

    fn run_session(&mut self, kind: SessionKind) -> Result<(), PipelineError> {
        let span = debug_span!("session", engine = %self.id, %kind);
        let _guard = span.enter();
        let timer = SpanTimer::start(format!("session.{kind}"));

        let result = session::sweep_checked(&mut self.stages, kind);
        let duration_ms = timer.finish();

        match &result {
            Ok(()) => {
                debug!(duration_ms, "Session sweep completed");
                self.emit(
                    &names::session_completed(kind),
                    json!({
                        "engine_id": self.id,
                        "stages": self.stages.len(),
                        "duration_ms": duration_ms,
                    }),
                );
            }
            Err(err) => {
                warn!(failures = err.failures.len(), duration_ms, "Session sweep failed");
                self.emit(
                    &names::session_failed(kind),
                    json!({
                        "engine_id": self.id,
                        "duration_ms": duration_ms,
                        "failures": err.failures.iter().map(SessionFailure::to_json).collect::<Vec<_>>(),
                    }),
                );
            }
        }
        result.map_err(PipelineError::from)
    }

    /// Returns true if a session was requested or any stage is starting or
    /// started.
    pub fn session_started(&self) -> bool {
        self.intent_started || self.stages.iter().any(|s| s.session_started())
    }

    /// Returns true if an abort was requested or any stage is aborting or
    /// aborted.
    pub fn session_aborted(&self) -> bool {
        self.intent_aborted || self.stages.iter().any(|s| s.session_aborted())
    }

    /// The stages, in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn PipelineStage> + '_ {
        self.stages.iter().map(AsRef::as_ref)
    }

    /// Looks a stage up by name.
    pub fn stage(&self, name: &str) -> Option<&dyn PipelineStage> {
        self.stages().find(|s| s.name() == name)
    }

    /// The instance of the named stage, if it is an `S` and still alive.
    pub fn stage_instance<S: 'static>(&self, name: &str) -> Option<&S> {
        self.stage(name)?.instance_any()?.downcast_ref::<S>()
    }

    /// Mutable access to the instance of the named stage.
    pub fn stage_instance_mut<S: 'static>(&mut self, name: &str) -> Option<&mut S> {
        self.stages
            .iter_mut()
            .find(|s| s.name() == name)?
            .instance_any_mut()?
            .downcast_mut::<S>()
    }

    /// Captures the current state of every stage.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            engine_id: self.id,
            session_started: self.session_started(),
            session_aborted: self.session_aborted(),
            stages: self
                .stages
                .iter()
                .map(|s| StageSnapshot {
                    name: s.name().to_string(),
                    stage_type: s.stage_type().to_string(),
                    status: s.session_status(),
                    cached_commands: s.cached_command_names(),
                    disposed: s.is_disposed(),
                })
                .collect(),
        }
    }

    /// Returns true once the engine has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Aborts a running session, then disposes every stage.
    ///
    /// Later calls do nothing. Stages that still hold an unaborted session
    /// abort it themselves when disposed; their failures are logged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Session`] if the abort sweep failed. The
    /// stages are disposed regardless.
    pub fn dispose(&mut self) -> Result<(), PipelineError> {
        if self.disposed {
            return Ok(());
        }
        let result = if self.options.abort_on_dispose {
            self.abort_session()
        } else {
            Ok(())
        };
        self.disposed = true;
        self.intent_started = false;
        self.intent_aborted = false;

        for stage in &mut self.stages {
            if let Err(err) = stage.dispose() {
                warn!(engine = %self.id, stage = %stage.name(), error = %err, "Stage teardown failed");
            }
        }

        debug!(engine = %self.id, "Pipeline disposed");
        self.emit(names::PIPELINE_DISPOSED, json!({ "engine_id": self.id }));
        result
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        if self.options.emit_events {
            self.event_sink.emit(event_type, Some(data));
        }
    }
}

fn invoke(
    stage: &mut dyn PipelineStage,
    command: &dyn StageCommand,
    phase: HandlerPhase,
    invocation: &mut Invocation<'_>,
) -> Result<PipelineAction, PipelineError> {
    let result = match stage.instance_any_mut() {
        Some(instance) => command.invoke(phase, instance, invocation),
        None => {
            return Err(PipelineError::Disposed {
                stage: stage.name().to_string(),
            })
        }
    };
    trace!(stage = %stage.name(), %phase, ok = result.is_ok(), "Handler ran");

    result.map_err(|source| PipelineError::Command {
        stage: stage.name().to_string(),
        command: invocation.command_name().map(str::to_string),
        phase,
        source,
    })
}

impl Drop for PipelineEngine {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            warn!(engine = %self.id, error = %err, "Abort during pipeline teardown failed");
        }
    }
}

impl fmt::Debug for PipelineEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineEngine")
            .field("id", &self.id)
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("session_started", &self.session_started())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
