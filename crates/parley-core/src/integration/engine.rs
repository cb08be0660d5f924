//! Engine and event-source contracts.
//!
//! An engine is the bridge between Parley and one chat backend. It has two
//! halves:
//!
//! - the **inbound** half, [`EventSource::next_event`], which suspends until
//!   exactly one event is available;
//! - the **outbound** half, [`Engine::send`] and friends, which deliver
//!   replies at most once and propagate failures.
//!
//! Engines are selected by name at startup through [`ConfigurableEngine`].

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::foundation::error::{EngineResult, TransportError, TransportResult};
use crate::foundation::event::Event;

/// The inbound half of an engine.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Waits for the next event.
    ///
    /// Implementations must suspend (never spin) while nothing is ready and
    /// resolve with exactly one event per call. A disconnect is reported as an
    /// error; callers treat it as fatal.
    async fn next_event(&self) -> TransportResult<Event>;
}

/// The text, author and destination of a message-like event.
///
/// Engines disagree about where these live in their raw events; every engine
/// can override [`Engine::chat_parts`] to normalize them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatParts {
    /// Message text (empty when absent).
    pub text: String,
    /// Originating user identifier (empty when absent).
    pub user: String,
    /// Originating channel identifier (empty when absent).
    pub channel: String,
}

impl ChatParts {
    /// Reads the conventional `text`, `user` and `channel` fields.
    pub fn from_event(event: &Event) -> Self {
        let field = |key: &str| event.get_str(key).unwrap_or_default().to_string();
        Self {
            text: field("text"),
            user: field("user"),
            channel: field("channel"),
        }
    }
}

/// A chat backend.
///
/// # Example Implementation
///
/// ```rust,ignore
/// #[async_trait]
/// impl EventSource for EchoEngine {
///     async fn next_event(&self) -> TransportResult<Event> {
///         self.inbox.lock().await.recv().await.ok_or_else(|| TransportError::closed("inbox"))
///     }
/// }
///
/// #[async_trait]
/// impl Engine for EchoEngine {
///     fn name(&self) -> &str { "echo" }
///
///     fn as_any(&self) -> &dyn Any { self }
///
///     async fn send(&self, text: &str, to: &str) -> TransportResult<()> {
///         println!("[{to}] {text}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Engine: EventSource {
    /// Returns the engine name (e.g. `"cli"`, `"slack"`).
    fn name(&self) -> &str;

    /// Returns `self` for downcasting to the concrete engine.
    fn as_any(&self) -> &dyn Any;

    /// Engine-specific setup: authentication, connecting sockets, prompts.
    ///
    /// Called once by the runtime before the first event is fetched.
    async fn setup(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Sends `text` to the destination `to` (a channel identifier).
    ///
    /// Delivery is attempted at most once; failures are returned, not retried.
    async fn send(&self, text: &str, to: &str) -> TransportResult<()>;

    /// Adds a reaction to the message carried by `event`.
    async fn react(&self, _event: &Event, _channel: &str, _reaction: &str) -> TransportResult<()> {
        Err(TransportError::Unsupported {
            engine: self.name().to_string(),
            operation: "react",
        })
    }

    /// Extracts the text, user and channel of an event.
    fn chat_parts(&self, event: &Event) -> ChatParts {
        ChatParts::from_event(event)
    }

    /// Returns `true` if the message was addressed directly to the bot.
    fn is_direct(&self, _parts: &ChatParts) -> bool {
        false
    }

    /// Releases backend resources. Called once on shutdown.
    async fn shutdown(&self) {}
}

/// A shared engine trait object.
pub type BoxedEngine = Arc<dyn Engine>;

/// An engine that can be constructed by name from configuration.
///
/// The runtime looks up `engines.<NAME>` in its configuration, deserializes it
/// into [`Config`](Self::Config) (falling back to `Default`), and calls
/// [`from_config`](Self::from_config).
pub trait ConfigurableEngine: Engine + Sized + 'static {
    /// The engine configuration type.
    type Config: DeserializeOwned + Default + Send;

    /// The name used to select this engine.
    const NAME: &'static str;

    /// Creates the engine from its configuration.
    ///
    /// Missing credentials must be reported here so that startup fails fast.
    fn from_config(config: Self::Config) -> EngineResult<Self>;
}
