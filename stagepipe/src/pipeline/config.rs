//! Pipeline configuration: an ordered, name-unique set of stage descriptors.

use super::engine::PipelineEngine;
use super::options::EngineOptions;
use super::spec::{StageDescriptor, StageSpec};
use crate::commands::CommandRegistry;
use crate::errors::{DuplicateStageError, PipelineError};
use crate::events::{EventSink, NoOpEventSink};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Registry of stage descriptors and factory for [`PipelineEngine`]s.
///
/// Stages are appended during a build-up phase. Afterwards the configuration
/// is read-only and can be shared (e.g. behind an `Arc`) by any number of
/// engines, each of which gets its own stage instances.
#[derive(Clone)]
pub struct PipelineConfig {
    stages: Vec<Arc<dyn StageSpec>>,
    index: HashMap<String, usize>,
    options: EngineOptions,
    event_sink: Arc<dyn EventSink>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            index: HashMap::new(),
            options: EngineOptions::default(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }
}

impl PipelineConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateStage`] if the name is taken; the
    /// stage registered first stays in place.
    pub fn add_stage<S, F>(
        &mut self,
        name: impl Into<String>,
        factory: F,
        commands: CommandRegistry<S>,
    ) -> Result<(), PipelineError>
    where
        S: Send + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.add_descriptor(StageDescriptor::new(name, factory, commands))
    }

    /// Fluent form of [`add_stage`](Self::add_stage).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateStage`] if the name is taken.
    pub fn with_stage<S, F>(
        mut self,
        name: impl Into<String>,
        factory: F,
        commands: CommandRegistry<S>,
    ) -> Result<Self, PipelineError>
    where
        S: Send + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.add_stage(name, factory, commands)?;
        Ok(self)
    }

    /// Appends a prepared descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateStage`] if the name is taken.
    pub fn add_descriptor<S: Send + 'static>(
        &mut self,
        descriptor: StageDescriptor<S>,
    ) -> Result<(), PipelineError> {
        let name = descriptor.name().to_string();
        if self.index.contains_key(&name) {
            return Err(DuplicateStageError::new(name).into());
        }

        debug!(stage = %name, position = self.stages.len(), "Stage registered");
        self.index.insert(name, self.stages.len());
        self.stages.push(Arc::new(descriptor));
        Ok(())
    }

    /// Sets the options for engines created from now on.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the event sink engines report to.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// The engine options.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// The event sink.
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.event_sink)
    }

    /// Looks a stage up by name.
    pub fn stage(&self, name: &str) -> Option<&dyn StageSpec> {
        self.index.get(name).map(|&i| self.stages[i].as_ref())
    }

    /// Looks a stage up by position.
    pub fn stage_at(&self, index: usize) -> Option<&dyn StageSpec> {
        self.stages.get(index).map(AsRef::as_ref)
    }

    /// All stages, in registration order.
    pub fn stages(&self) -> impl Iterator<Item = &dyn StageSpec> + '_ {
        self.stages.iter().map(AsRef::as_ref)
    }

    /// Stage names, in registration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage is registered.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Creates an engine with fresh instances of every stage.
    pub fn create_pipeline(&self) -> PipelineEngine {
        let stages = self.stages.iter().map(|spec| spec.create_stage()).collect();
        PipelineEngine::new(stages, self.options, self.event_sink())
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("stages", &self.stage_names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DUPLICATE_STAGE_CODE;
    use pretty_assertions::assert_eq;

    struct Store;
    struct Audit;

    #[test]
    fn test_stages_keep_registration_order() {
        let config = PipelineConfig::new()
            .with_stage("store", || Store, CommandRegistry::new())
            .unwrap()
            .with_stage("audit", || Audit, CommandRegistry::new())
            .unwrap();

        assert_eq!(config.stage_names(), vec!["store", "audit"]);
        assert_eq!(config.len(), 2);
        assert_eq!(config.stage_at(1).unwrap().name(), "audit");
        assert!(config.stage("store").unwrap().stage_type().ends_with("Store"));
        assert!(config.stage("missing").is_none());
        assert!(config.stage_at(2).is_none());
    }

    #[test]
    fn test_duplicate_name_fails_and_keeps_first() {
        let mut config = PipelineConfig::new();
        config.add_stage("main", || Store, CommandRegistry::new()).unwrap();

        let err = config
            .add_stage("main", || Audit, CommandRegistry::new())
            .unwrap_err();

        assert!(matches!(err, PipelineError::DuplicateStage(_)));
        assert_eq!(err.error_info().unwrap().code, DUPLICATE_STAGE_CODE);
        assert_eq!(config.len(), 1);
        assert!(config.stage("main").unwrap().stage_type().ends_with("Store"));
    }

    #[test]
    fn test_blank_names_collide_on_type_name() {
        let mut config = PipelineConfig::new();
        config.add_stage("", || Store, CommandRegistry::new()).unwrap();
        assert!(config.add_stage(" ", || Store, CommandRegistry::new()).is_err());
        assert_eq!(config.stage_names(), vec!["Store"]);
    }

    #[test]
    fn test_engines_get_independent_stages() {
        let config = PipelineConfig::new()
            .with_options(EngineOptions::new().with_emit_events(false))
            .with_stage("store", || Store, CommandRegistry::new())
            .unwrap();

        let first = config.create_pipeline();
        let second = config.create_pipeline();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.stages().count(), 1);
        assert!(!config.options().emit_events);
        assert!(!config.is_empty());
    }
}
