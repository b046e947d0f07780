//! Per-call views handed to command handlers.

use super::payload::PayloadView;
use std::fmt;

/// What a command handler sees of the current call.
pub struct CommandParams<'a, P> {
    command_name: Option<&'a str>,
    payload: &'a mut P,
}

impl<'a, P> CommandParams<'a, P> {
    /// Creates a parameter view.
    pub fn new(command_name: Option<&'a str>, payload: &'a mut P) -> Self {
        Self {
            command_name,
            payload,
        }
    }

    /// The command name the pipeline was invoked with.
    ///
    /// `None` when the caller used the default bucket, even if this handler
    /// was registered under a name.
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        self.command_name
    }

    /// The payload, viewed as the type the handler was declared for.
    #[must_use]
    pub fn payload(&self) -> &P {
        self.payload
    }

    /// Mutable access to the payload, for handlers that return results.
    pub fn payload_mut(&mut self) -> &mut P {
        self.payload
    }
}

impl<P: fmt::Debug> fmt::Debug for CommandParams<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandParams")
            .field("command_name", &self.command_name)
            .field("payload", &self.payload)
            .finish()
    }
}

/// The type-erased state of one command invocation.
pub struct Invocation<'a> {
    command_name: Option<&'a str>,
    payload: &'a mut dyn PayloadView,
}

impl<'a> Invocation<'a> {
    /// Creates an invocation over `payload`.
    pub fn new(command_name: Option<&'a str>, payload: &'a mut dyn PayloadView) -> Self {
        Self {
            command_name,
            payload,
        }
    }

    /// The command name of the call.
    #[must_use]
    pub fn command_name(&self) -> Option<&'a str> {
        self.command_name
    }

    /// The payload, erased.
    pub fn payload_mut(&mut self) -> &mut dyn PayloadView {
        &mut *self.payload
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command_name", &self.command_name)
            .field("payload_type", &self.payload.payload_type())
            .finish()
    }
}
