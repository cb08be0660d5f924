//! Handler system for the Parley framework.
//!
//! Handlers are plain async functions. The registration builders accept any
//! `Fn` returning a future and erase it into one of two object-safe traits:
//!
//! - [`Handler`]: reacts to an event, `(Bot, Event) -> HandlerResult`
//! - [`Job`]: runs without an event (start hooks, schedules), `(Bot) -> HandlerResult`
//!
//! Command handlers take a [`Chat`](crate::Chat) instead; the command builder
//! adapts them into a [`Handler`].
//!
//! # Example
//!
//! ```rust,ignore
//! async fn on_reaction(bot: Bot, event: Event) -> HandlerResult {
//!     bot.memory().save("last_reaction", event.to_value()).await?;
//!     Ok(())
//! }
//!
//! bot.on(Predicate::event_type("reaction_added")).handle(on_reaction);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parley_core::Event;

use crate::bot::Bot;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler returns.
///
/// An `Err` is caught by the dispatcher, logged, and reported to the
/// originating channel; it never stops the bot.
pub type HandlerResult = anyhow::Result<()>;

// ============================================================================
// Handler
// ============================================================================

/// Type-erased event handler.
pub trait Handler: Send + Sync {
    /// Starts the handler for one event.
    fn call(&self, bot: Bot, event: Event) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Bot, Event) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, bot: Bot, event: Event) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(bot, event))
    }
}

/// A shared handler trait object.
pub type BoxedHandler = Arc<dyn Handler>;

/// Converts an async function into a boxed handler.
pub fn into_handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Bot, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

// ============================================================================
// Job
// ============================================================================

/// Type-erased event-less handler, used for start hooks and schedules.
pub trait Job: Send + Sync {
    /// Starts one run of the job.
    fn call(&self, bot: Bot) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Job for F
where
    F: Fn(Bot) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, bot: Bot) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(bot))
    }
}

/// A shared job trait object.
pub type BoxedJob = Arc<dyn Job>;

/// Converts an async function into a boxed job.
pub fn into_job<F, Fut>(f: F) -> BoxedJob
where
    F: Fn(Bot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}
