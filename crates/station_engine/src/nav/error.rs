use std::fmt;

use thiserror::Error;

use super::DestinationId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    /// Programmer error: the requested mode/destination pair breaks the
    /// navigation state invariant, or the mode name is not recognized.
    #[error("invalid mode request `{mode}`: {reason}")]
    InvalidMode { mode: String, reason: &'static str },
    #[error("destination `{0}` is not registered")]
    UnknownDestination(DestinationId),
    #[error("travel to `{destination}` aborted: {cause}")]
    TransitionAborted {
        destination: DestinationId,
        cause: AbortCause,
    },
}

impl NavError {
    pub fn is_unknown_destination(&self) -> bool {
        matches!(self, NavError::UnknownDestination(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    Requested,
    ExternalReset,
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::Requested => f.write_str("abort requested"),
            AbortCause::ExternalReset => f.write_str("mode reset to docked externally"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{hook} hook failed: {message}")]
pub struct HookError {
    pub hook: &'static str,
    pub message: String,
}

impl HookError {
    pub fn new(hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            hook,
            message: message.into(),
        }
    }
}
