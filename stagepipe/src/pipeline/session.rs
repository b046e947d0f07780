//! Session sweeps across all stages of an engine.
//!
//! Unlike command traversal, a sweep never stops early: every stage runs
//! its pre-handler in order and its post-handler in reverse order, and
//! handler failures are recorded instead of propagated.

use crate::core::{HandlerPhase, SessionKind};
use crate::errors::{SessionError, SessionFailure};
use crate::stages::PipelineStage;
use tracing::warn;

/// Runs `kind` across `stages`, returning every failure that occurred.
pub(crate) fn sweep(stages: &mut [Box<dyn PipelineStage>], kind: SessionKind) -> Vec<SessionFailure> {
    let mut failures = Vec::new();

    for stage in stages.iter_mut() {
        run_phase(stage.as_mut(), kind, HandlerPhase::Pre, &mut failures);
    }
    for stage in stages.iter_mut().rev() {
        run_phase(stage.as_mut(), kind, HandlerPhase::Post, &mut failures);
    }

    failures
}

/// Runs a sweep and folds its failures into one error.
pub(crate) fn sweep_checked(
    stages: &mut [Box<dyn PipelineStage>],
    kind: SessionKind,
) -> Result<(), SessionError> {
    let failures = sweep(stages, kind);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(SessionError::new(kind, failures))
    }
}

fn run_phase(
    stage: &mut dyn PipelineStage,
    kind: SessionKind,
    phase: HandlerPhase,
    failures: &mut Vec<SessionFailure>,
) {
    if let Err(err) = stage.run_session(kind, phase) {
        warn!(stage = %stage.name(), %kind, %phase, error = %err, "Session handler failed");
        failures.push(SessionFailure::new(stage.name(), kind, phase, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandRegistry, SessionCommandDefinition};
    use crate::core::{PipelineAction, SessionStatus};
    use crate::stages::StageRuntime;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    fn probe_stage(
        name: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
        fail_pre: bool,
    ) -> Box<dyn PipelineStage> {
        let registry = CommandRegistry::<Probe>::new().with_abort_session(
            SessionCommandDefinition::new(move |p: &mut Probe| {
                p.log.lock().push(format!("{}.abort", p.name));
                if fail_pre {
                    anyhow::bail!("{} cannot roll back", p.name);
                }
                Ok(PipelineAction::Continue)
            })
            .with_post(|p: &mut Probe| {
                p.log.lock().push(format!("{}.post_abort", p.name));
                Ok(PipelineAction::Continue)
            }),
        );
        let mut runtime = StageRuntime::new(
            name,
            Probe {
                name,
                log: Arc::clone(log),
            },
            Arc::new(registry),
        );
        runtime.start().unwrap();
        runtime.post_start().unwrap();
        Box::new(runtime)
    }

    #[test]
    fn test_sweep_runs_pre_forward_and_post_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stages = vec![probe_stage("a", &log, false), probe_stage("b", &log, false)];

        sweep_checked(&mut stages, SessionKind::Abort).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["a.abort", "b.abort", "b.post_abort", "a.post_abort"]
        );
        assert!(stages.iter().all(|s| s.session_status() == SessionStatus::Aborted));
    }

    #[test]
    fn test_sweep_isolates_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stages = vec![probe_stage("a", &log, true), probe_stage("b", &log, false)];

        let err = sweep_checked(&mut stages, SessionKind::Abort).unwrap_err();

        assert_eq!(err.stages(), vec!["a"]);
        assert_eq!(err.failures[0].phase, HandlerPhase::Pre);
        assert_eq!(err.error_info.code, "PIPELINE-SESSION-ABORT");
        assert!(err.to_string().contains("a cannot roll back"));
        assert_eq!(
            *log.lock(),
            vec!["a.abort", "b.abort", "b.post_abort", "a.post_abort"]
        );
        assert_eq!(stages[0].session_status(), SessionStatus::Aborted);
    }

    #[test]
    fn test_sweep_over_no_stages() {
        let mut stages: Vec<Box<dyn PipelineStage>> = Vec::new();
        assert!(sweep(&mut stages, SessionKind::Start).is_empty());
    }
}
