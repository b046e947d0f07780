//! Core domain model types for stagepipe.
//!
//! This module contains the fundamental types used throughout the engine:
//! - The `PipelineAction` traversal signal
//! - Session status, kind and handler phase enums
//! - Payload type tags and the dispatch compatibility rule
//! - Per-call parameter views

mod action;
mod params;
mod payload;
mod status;

pub use action::PipelineAction;
pub use params::{CommandParams, Invocation};
pub use payload::{is_assignable, Payload, PayloadLineage, PayloadType, PayloadView};
pub use status::{HandlerPhase, SessionKind, SessionStatus};
