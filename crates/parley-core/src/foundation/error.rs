//! Unified error types for the Parley core.
//!
//! Framework-level errors (waits, scripts) are defined in `parley-framework`;
//! configuration errors live in `parley-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by an engine while talking to its chat backend.
///
/// Every variant is fatal to the dispatch loop: the core never retries and
/// never swallows a transport failure.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The endpoint that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The connection closed while the engine was waiting for events.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Outbound delivery failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The backend answered with something the engine cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The engine does not implement this operation.
    #[error("operation '{operation}' is not supported by engine '{engine}'")]
    Unsupported {
        /// Engine name.
        engine: String,
        /// The missing operation.
        operation: &'static str,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl TransportError {
    /// Creates a connection-closed error.
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors that can occur while constructing or setting up an engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A required credential was not provided.
    #[error("{name} required for engine '{engine}'")]
    MissingCredential {
        /// Engine name.
        engine: &'static str,
        /// The credential that is missing (e.g. `SLACK_TOKEN`).
        name: &'static str,
    },

    /// The engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// The backend rejected the session during setup.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Transport error during setup.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Memory Errors
// =============================================================================

/// Errors raised by a memory backend.
#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    /// The backend could not be reached.
    #[error("memory backend unreachable at {url}: {reason}")]
    Unreachable {
        /// Backend location.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// The backend answered with an error.
    #[error("memory backend error: {0}")]
    Backend(String),

    /// A value could not be encoded or decoded.
    #[error("memory serialization error: {0}")]
    Serialization(String),

    /// The memory configuration is unusable.
    #[error("invalid memory configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for engine construction and setup.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
