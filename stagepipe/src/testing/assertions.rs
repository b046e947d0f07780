//! Test assertions for engines and recorded histories.

use super::mocks::Recorder;
use crate::core::{PipelineAction, SessionStatus};
use crate::pipeline::PipelineEngine;

/// Asserts that the named stage has the expected session status.
pub fn assert_stage_status(engine: &PipelineEngine, stage: &str, expected: SessionStatus) {
    let actual = engine.stage(stage).map(|s| s.session_status());
    assert_eq!(
        actual,
        Some(expected),
        "Expected stage '{stage}' to be {expected:?}, got {actual:?}"
    );
}

/// Asserts that every stage has the expected session status.
pub fn assert_all_stages_status(engine: &PipelineEngine, expected: SessionStatus) {
    for stage in engine.stages() {
        assert_eq!(
            stage.session_status(),
            expected,
            "Expected stage '{}' to be {:?}, got {:?}",
            stage.name(),
            expected,
            stage.session_status()
        );
    }
}

/// Asserts that a traversal produced the expected outcome.
pub fn assert_outcome(actual: PipelineAction, expected: PipelineAction) {
    assert_eq!(
        actual, expected,
        "Expected traversal outcome {expected:?}, got {actual:?}"
    );
}

/// Asserts that the recorder holds exactly `expected`, in order.
pub fn assert_history(recorder: &Recorder, expected: &[&str]) {
    let actual = recorder.entries();
    assert_eq!(
        actual, expected,
        "Call history mismatch.\n  expected: {expected:?}\n    actual: {actual:?}"
    );
}

/// Asserts that `entry` was recorded exactly `times` times.
pub fn assert_recorded_times(recorder: &Recorder, entry: &str, times: usize) {
    let count = recorder.count(entry);
    assert_eq!(
        count, times,
        "Expected '{entry}' {times} time(s), found {count}. History: {:?}",
        recorder.entries()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_history_passes_on_match() {
        let recorder = Recorder::new();
        recorder.record("A.visit(x)");
        recorder.record("A.post_visit(x)");

        assert_history(&recorder, &["A.visit(x)", "A.post_visit(x)"]);
        assert_recorded_times(&recorder, "A.visit(x)", 1);
    }

    #[test]
    #[should_panic(expected = "Call history mismatch")]
    fn test_assert_history_fails_on_order() {
        let recorder = Recorder::new();
        recorder.record("b");
        recorder.record("a");

        assert_history(&recorder, &["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "Expected traversal outcome")]
    fn test_assert_outcome_fails_on_mismatch() {
        assert_outcome(PipelineAction::Stop, PipelineAction::Continue);
    }
}
