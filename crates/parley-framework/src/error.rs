//! Error types for the Parley framework.

use std::time::Duration;

use thiserror::Error;

use parley_core::{MemoryError, TransportError};

/// Errors raised by registration and bot operations.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// A cron schedule could not be parsed.
    #[error("invalid schedule '{expression}': {reason}")]
    InvalidSchedule {
        /// The rejected expression.
        expression: String,
        /// Parser message.
        reason: String,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Memory error.
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors that end a conversation wait without a matching event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    /// No matching event arrived within the caller's budget.
    #[error("no matching event within {0:?}")]
    TimedOut(Duration),

    /// The wait's listener was dropped before anything matched.
    #[error("wait abandoned before a matching event arrived")]
    Abandoned,
}

/// A script that failed to register.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The registration function returned an error.
    #[error("script '{name}' failed: {reason}")]
    Failed {
        /// Script name.
        name: String,
        /// Error message, with its causes.
        reason: String,
    },

    /// The registration function panicked.
    #[error("script '{name}' panicked during registration")]
    Panicked {
        /// Script name.
        name: String,
    },
}

impl ScriptError {
    /// Returns the name of the failed script.
    pub fn name(&self) -> &str {
        match self {
            Self::Failed { name, .. } | Self::Panicked { name } => name,
        }
    }
}

/// Result type for framework operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Result type for conversation waits.
pub type WaitResult<T> = Result<T, WaitError>;
