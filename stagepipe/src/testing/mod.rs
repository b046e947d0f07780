//! Testing utilities for stagepipe engines.
//!
//! This module provides:
//! - A shared call recorder and a recording stage type
//! - Registry helpers that wire the recording stage's commands and sessions
//! - Assertions over stage status and call history

mod assertions;
mod mocks;

pub use assertions::{
    assert_all_stages_status, assert_history, assert_outcome, assert_recorded_times,
    assert_stage_status,
};
pub use mocks::{Recorder, Visitor, VisitorCommands};
