//! Stage-type-erased commands the engine drives.

use super::definition::{CommandHandler, HandlerResult};
use crate::core::{CommandParams, HandlerPhase, Invocation, Payload, PayloadType, PipelineAction};
use crate::errors::PipelineError;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A command ready to run against one stage instance.
///
/// The stage is passed in as `&mut dyn Any` so the engine can drive stages
/// of different types through one interface. Implementations check the
/// stage type and the payload view before calling into user code.
pub trait StageCommand: Send + Sync {
    /// The payload type the command was declared for.
    fn declared_type(&self) -> PayloadType;

    /// Runs one half of the command.
    fn invoke(
        &self,
        phase: HandlerPhase,
        stage: &mut dyn Any,
        invocation: &mut Invocation<'_>,
    ) -> HandlerResult;

    /// Returns true for the stand-in that does nothing.
    fn is_noop(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCommand")
            .field("declared_type", &self.declared_type().name())
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Binds a typed handler into a [`StageCommand`].
pub fn bind_command<S, P, H>(handler: H) -> Arc<dyn StageCommand>
where
    S: 'static,
    P: Payload,
    H: CommandHandler<S, P> + 'static,
{
    Arc::new(TypedCommand {
        handler,
        _marker: PhantomData::<fn(&mut S, &mut P)>,
    })
}

/// The no-op stand-in for stages without a compatible command.
pub fn null_command() -> Arc<dyn StageCommand> {
    Arc::new(NullCommand)
}

struct TypedCommand<S, P, H> {
    handler: H,
    _marker: PhantomData<fn(&mut S, &mut P)>,
}

impl<S, P, H> StageCommand for TypedCommand<S, P, H>
where
    S: 'static,
    P: Payload,
    H: CommandHandler<S, P>,
{
    fn declared_type(&self) -> PayloadType {
        PayloadType::of::<P>()
    }

    fn invoke(
        &self,
        phase: HandlerPhase,
        stage: &mut dyn Any,
        invocation: &mut Invocation<'_>,
    ) -> HandlerResult {
        let stage = stage
            .downcast_mut::<S>()
            .ok_or_else(|| PipelineError::StageTypeMismatch {
                expected: type_name::<S>(),
            })?;

        let command_name = invocation.command_name();
        let view = invocation.payload_mut();
        let actual = view.payload_type();
        let payload = view
            .view_mut(TypeId::of::<P>())
            .and_then(|any| any.downcast_mut::<P>())
            .ok_or_else(|| PipelineError::PayloadMismatch {
                expected: type_name::<P>(),
                actual: actual.name(),
            })?;

        let mut params = CommandParams::new(command_name, payload);
        match phase {
            HandlerPhase::Pre => self.handler.run(stage, &mut params),
            HandlerPhase::Post => self.handler.run_post(stage, &mut params),
        }
    }
}

struct NullCommand;

impl StageCommand for NullCommand {
    fn declared_type(&self) -> PayloadType {
        PayloadType::of::<()>()
    }

    fn invoke(
        &self,
        _phase: HandlerPhase,
        _stage: &mut dyn Any,
        _invocation: &mut Invocation<'_>,
    ) -> HandlerResult {
        Ok(PipelineAction::Continue)
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandDefinition;

    struct Shouter {
        heard: Vec<String>,
    }

    #[test]
    fn test_bound_command_drives_typed_handler() {
        let command = bind_command(
            CommandDefinition::<Shouter, String>::new(|s, p| {
                s.heard.push(p.payload().to_uppercase());
                Ok(PipelineAction::Continue)
            })
            .with_post(|_, p| {
                p.payload_mut().push('!');
                Ok(PipelineAction::Stop)
            }),
        );

        let mut stage = Shouter { heard: Vec::new() };
        let mut payload = "hi".to_string();
        let mut invocation = Invocation::new(Some("Shout"), &mut payload);

        let pre = command.invoke(HandlerPhase::Pre, &mut stage, &mut invocation).unwrap();
        let post = command.invoke(HandlerPhase::Post, &mut stage, &mut invocation).unwrap();

        assert_eq!(pre, PipelineAction::Continue);
        assert_eq!(post, PipelineAction::Stop);
        assert_eq!(stage.heard, vec!["HI".to_string()]);
        assert_eq!(payload, "hi!");
        assert_eq!(command.declared_type(), PayloadType::of::<String>());
    }

    #[test]
    fn test_bound_command_rejects_wrong_stage_type() {
        let command = bind_command(CommandDefinition::<Shouter, String>::empty());
        let mut wrong_stage = 5_u8;
        let mut payload = String::new();
        let mut invocation = Invocation::new(None, &mut payload);

        let err = command
            .invoke(HandlerPhase::Pre, &mut wrong_stage, &mut invocation)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::StageTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bound_command_rejects_incompatible_payload() {
        let command = bind_command(CommandDefinition::<Shouter, String>::empty());
        let mut stage = Shouter { heard: Vec::new() };
        let mut payload = 42_i32;
        let mut invocation = Invocation::new(None, &mut payload);

        let err = command
            .invoke(HandlerPhase::Post, &mut stage, &mut invocation)
            .unwrap_err();
        assert!(err.to_string().contains("cannot be viewed as"));
    }

    #[test]
    fn test_null_command_continues() {
        let command = null_command();
        let mut stage = 0_u8;
        let mut payload = 1_u32;
        let mut invocation = Invocation::new(None, &mut payload);

        assert!(command.is_noop());
        assert!(command
            .invoke(HandlerPhase::Pre, &mut stage, &mut invocation)
            .unwrap()
            .is_continue());
    }
}
