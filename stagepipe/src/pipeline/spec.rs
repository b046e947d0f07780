//! Stage descriptors: what a configuration knows about each stage.

use crate::commands::CommandRegistry;
use crate::stages::{PipelineStage, StageRuntime};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Zero-argument constructor for stage instances.
pub type StageFactory<S> = Arc<dyn Fn() -> S + Send + Sync>;

/// The stage-type-erased view of a [`StageDescriptor`].
pub trait StageSpec: Send + Sync {
    /// The unique stage name.
    fn name(&self) -> &str;

    /// The type name of the stage instances this spec creates.
    fn stage_type(&self) -> &'static str;

    /// Number of command definitions the stage type registered.
    fn command_count(&self) -> usize;

    /// Builds a fresh runtime around a new stage instance.
    fn create_stage(&self) -> Box<dyn PipelineStage>;
}

/// A named stage: its factory and its commands.
pub struct StageDescriptor<S> {
    name: String,
    factory: StageFactory<S>,
    commands: Arc<CommandRegistry<S>>,
}

impl<S: Send + 'static> StageDescriptor<S> {
    /// Creates a descriptor. A blank name falls back to the stage type's name.
    pub fn new<F>(name: impl Into<String>, factory: F, commands: CommandRegistry<S>) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        let name = name.into();
        let name = if name.trim().is_empty() {
            short_type_name::<S>().to_string()
        } else {
            name
        };

        Self {
            name,
            factory: Arc::new(factory),
            commands: Arc::new(commands),
        }
    }

    /// The stage's commands.
    pub fn commands(&self) -> &CommandRegistry<S> {
        &self.commands
    }

    /// Builds a typed runtime around a new instance.
    pub fn create_runtime(&self) -> StageRuntime<S> {
        StageRuntime::new(self.name.clone(), (self.factory)(), Arc::clone(&self.commands))
    }
}

impl<S: Send + 'static> StageSpec for StageDescriptor<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage_type(&self) -> &'static str {
        type_name::<S>()
    }

    fn command_count(&self) -> usize {
        self.commands.len()
    }

    fn create_stage(&self) -> Box<dyn PipelineStage> {
        Box::new(self.create_runtime())
    }
}

impl<S> fmt::Debug for StageDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("name", &self.name)
            .field("stage_type", &type_name::<S>())
            .field("commands", &self.commands)
            .finish()
    }
}

/// `type_name` without the module path, generics kept as written.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionStatus;

    struct Tally {
        count: u32,
    }

    #[test]
    fn test_blank_name_uses_type_name() {
        let spec = StageDescriptor::new("  ", || Tally { count: 0 }, CommandRegistry::new());
        assert_eq!(spec.name(), "Tally");
        assert!(spec.stage_type().ends_with("Tally"));
    }

    #[test]
    fn test_each_stage_gets_fresh_instance() {
        let spec = StageDescriptor::new("tally", || Tally { count: 0 }, CommandRegistry::new());

        let mut first = spec.create_runtime();
        first.instance_mut().unwrap().count = 5;
        let second = spec.create_runtime();

        assert_eq!(second.instance().unwrap().count, 0);
        assert_eq!(first.name(), "tally");
    }

    #[test]
    fn test_create_stage_is_erased() {
        let spec: Arc<dyn StageSpec> =
            Arc::new(StageDescriptor::new("tally", || Tally { count: 1 }, CommandRegistry::new()));

        let stage = spec.create_stage();
        assert_eq!(stage.name(), "tally");
        assert_eq!(stage.session_status(), SessionStatus::NeverStarted);
        assert_eq!(spec.command_count(), 0);
        assert!(stage
            .instance_any()
            .and_then(|any| any.downcast_ref::<Tally>())
            .is_some());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<u8>(), "u8");
        assert!(short_type_name::<Vec<String>>().starts_with("Vec<"));
    }
}
