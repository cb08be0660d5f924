//! Runtime error types.

use thiserror::Error;

use parley_core::{EngineError, MemoryError, TransportError};

use crate::config::ConfigError;

/// Errors that stop the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured engine is not registered.
    #[error("unknown engine '{name}' (available: {available})")]
    UnknownEngine { name: String, available: String },

    /// The configured memory backend is not registered.
    #[error("unknown memory backend '{name}' (available: {available})")]
    UnknownMemory { name: String, available: String },

    /// A component's configuration section did not deserialize.
    #[error("invalid configuration for '{name}': {reason}")]
    ComponentConfig { name: String, reason: String },

    /// The engine could not be created or set up.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The memory backend could not be created or set up.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The engine stopped delivering events.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Shutdown signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
