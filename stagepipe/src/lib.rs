//! # Stagepipe
//!
//! An ordered stage pipeline engine with typed command dispatch and
//! per-stage sessions.
//!
//! Stagepipe runs named, payload-typed commands across an ordered list of
//! heterogeneous stages:
//!
//! - **Descend/unwind traversal**: pre-handlers run in stage order, post-handlers
//!   in reverse, with `Continue`, `Stop` and `Abort` controlling the walk
//! - **Polymorphic resolution**: a handler declared for a payload supertype
//!   applies to every payload that extends it; the first registered match wins
//! - **Sessions**: start, abort and end sweeps with a per-stage state machine
//!   and aggregated, isolated failures
//! - **Structured teardown**: dropping an engine aborts an open session and
//!   releases every stage exactly once
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagepipe::prelude::*;
//!
//! let audit = CommandRegistry::<Audit>::new().with_command::<Order, _>(
//!     None,
//!     CommandDefinition::new(|audit: &mut Audit, p: &mut CommandParams<'_, Order>| {
//!         audit.record(p.command_name(), p.payload());
//!         Ok(PipelineAction::Continue)
//!     }),
//! );
//!
//! let config = PipelineConfig::new()
//!     .with_stage("audit", Audit::default, audit)?
//!     .with_stage("store", Store::connect, store_commands())?;
//!
//! let mut engine = config.create_pipeline();
//! engine.start_session()?;
//! engine.run_command(Some("Place"), &mut order)?;
//! engine.end_session()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod commands;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{
        CommandDefinition, CommandHandler, CommandRegistry, HandlerResult,
        SessionCommandDefinition, SessionHandler,
    };
    pub use crate::core::{
        CommandParams, HandlerPhase, Payload, PayloadLineage, PayloadType, PayloadView,
        PipelineAction, SessionKind, SessionStatus,
    };
    pub use crate::errors::{HandlerError, PipelineError, SessionError, SessionFailure};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LoggingConfig};
    pub use crate::pipeline::{
        EngineOptions, PipelineConfig, PipelineEngine, PipelineSnapshot, StageDescriptor,
        StageSpec,
    };
    pub use crate::stages::{PipelineStage, StageRuntime};
}
