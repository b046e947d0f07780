//! Commands and the registries that hold them.
//!
//! A command is a pair of handlers a stage type defines for one payload
//! type. Handlers are written against the concrete stage and payload
//! types and bound into [`StageCommand`]s that the engine can drive across
//! stages of different types.

mod bound;
mod definition;
mod registry;

pub use bound::{bind_command, null_command, StageCommand};
pub use definition::{
    CommandDefinition, CommandHandler, HandlerResult, SessionCommandDefinition, SessionHandler,
};
pub use registry::{first_compatible, CommandRegistry};

pub(crate) use registry::bucket_key;
