//! Command and session handler traits and their closure-backed definitions.

use crate::core::{CommandParams, PipelineAction};
use crate::errors::HandlerError;
use std::fmt;

/// What every handler returns.
pub type HandlerResult = Result<PipelineAction, HandlerError>;

type CommandFn<S, P> =
    Box<dyn Fn(&mut S, &mut CommandParams<'_, P>) -> HandlerResult + Send + Sync>;

type SessionFn<S> = Box<dyn Fn(&mut S) -> HandlerResult + Send + Sync>;

/// A command implementation for stages of type `S` taking payloads of type `P`.
///
/// `run` is called while the command descends through the stages and
/// `run_post` while it unwinds in reverse order.
pub trait CommandHandler<S, P>: Send + Sync {
    /// Runs the pre-handler.
    fn run(&self, stage: &mut S, params: &mut CommandParams<'_, P>) -> HandlerResult;

    /// Runs the post-handler.
    fn run_post(&self, stage: &mut S, params: &mut CommandParams<'_, P>) -> HandlerResult {
        let _ = (stage, params);
        Ok(PipelineAction::Continue)
    }
}

/// A session command implementation for stages of type `S`.
///
/// Session commands carry no payload; stages keep whatever state they need
/// to start, abort or end their own session.
pub trait SessionHandler<S>: Send + Sync {
    /// Runs the pre-handler.
    fn run(&self, stage: &mut S) -> HandlerResult;

    /// Runs the post-handler.
    fn run_post(&self, stage: &mut S) -> HandlerResult {
        let _ = stage;
        Ok(PipelineAction::Continue)
    }
}

/// A closure-backed [`CommandHandler`].
///
/// Either half may be absent, in which case it returns `Continue`.
pub struct CommandDefinition<S, P> {
    pre: Option<CommandFn<S, P>>,
    post: Option<CommandFn<S, P>>,
}

impl<S, P> CommandDefinition<S, P> {
    /// Creates a definition with the given pre-handler.
    pub fn new<F>(pre: F) -> Self
    where
        F: Fn(&mut S, &mut CommandParams<'_, P>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            pre: Some(Box::new(pre)),
            post: None,
        }
    }

    /// Creates a definition whose handlers both return `Continue`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pre: None,
            post: None,
        }
    }

    /// Sets the post-handler.
    #[must_use]
    pub fn with_post<F>(mut self, post: F) -> Self
    where
        F: Fn(&mut S, &mut CommandParams<'_, P>) -> HandlerResult + Send + Sync + 'static,
    {
        self.post = Some(Box::new(post));
        self
    }
}

impl<S, P> Default for CommandDefinition<S, P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S, P> fmt::Debug for CommandDefinition<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("payload_type", &std::any::type_name::<P>())
            .field("has_pre", &self.pre.is_some())
            .field("has_post", &self.post.is_some())
            .finish()
    }
}

impl<S, P> CommandHandler<S, P> for CommandDefinition<S, P> {
    fn run(&self, stage: &mut S, params: &mut CommandParams<'_, P>) -> HandlerResult {
        match &self.pre {
            Some(pre) => pre(stage, params),
            None => Ok(PipelineAction::Continue),
        }
    }

    fn run_post(&self, stage: &mut S, params: &mut CommandParams<'_, P>) -> HandlerResult {
        match &self.post {
            Some(post) => post(stage, params),
            None => Ok(PipelineAction::Continue),
        }
    }
}

/// A closure-backed [`SessionHandler`].
pub struct SessionCommandDefinition<S> {
    pre: Option<SessionFn<S>>,
    post: Option<SessionFn<S>>,
}

impl<S> SessionCommandDefinition<S> {
    /// Creates a definition with the given pre-handler.
    pub fn new<F>(pre: F) -> Self
    where
        F: Fn(&mut S) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            pre: Some(Box::new(pre)),
            post: None,
        }
    }

    /// Creates a definition with only a post-handler.
    pub fn post_only<F>(post: F) -> Self
    where
        F: Fn(&mut S) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            pre: None,
            post: Some(Box::new(post)),
        }
    }

    /// Sets the post-handler.
    #[must_use]
    pub fn with_post<F>(mut self, post: F) -> Self
    where
        F: Fn(&mut S) -> HandlerResult + Send + Sync + 'static,
    {
        self.post = Some(Box::new(post));
        self
    }
}

impl<S> fmt::Debug for SessionCommandDefinition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCommandDefinition")
            .field("has_pre", &self.pre.is_some())
            .field("has_post", &self.post.is_some())
            .finish()
    }
}

impl<S> SessionHandler<S> for SessionCommandDefinition<S> {
    fn run(&self, stage: &mut S) -> HandlerResult {
        match &self.pre {
            Some(pre) => pre(stage),
            None => Ok(PipelineAction::Continue),
        }
    }

    fn run_post(&self, stage: &mut S) -> HandlerResult {
        match &self.post {
            Some(post) => post(stage),
            None => Ok(PipelineAction::Continue),
        }
    }
}
