//! Failure-contained handler tasks.
//!
//! Every handler invocation runs in its own task. A handler that returns an
//! error or panics is logged and, when the triggering event carries a
//! channel, reported there with [`ERROR_REPLY`]. Nothing propagates back to
//! the dispatcher or to sibling handlers.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info_span, warn};

use parley_core::Event;

use crate::bot::Bot;
use crate::handler::HandlerResult;

/// Reply sent to the originating channel when a handler fails.
pub const ERROR_REPLY: &str = "Script had an error.";

/// Spawns `fut` as an independent task with failure containment.
///
/// `origin` is the event that triggered the handler, if any; its channel
/// receives [`ERROR_REPLY`] on failure.
pub fn spawn_guarded<Fut>(
    bot: &Bot,
    name: impl Into<String>,
    origin: Option<Event>,
    fut: Fut,
) -> JoinHandle<()>
where
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let bot = bot.clone();
    let name = name.into();
    let span = info_span!("handler", name = %name);

    tokio::spawn(
        async move {
            let failure = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => format!("{e:#}"),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };

            error!(error = %failure, "Script had an error");

            let Some(event) = origin else { return };
            let channel = bot.engine().chat_parts(&event).channel;
            if channel.is_empty() {
                return;
            }
            if let Err(e) = bot.send(ERROR_REPLY, &channel).await {
                warn!(channel = %channel, error = %e, "Failed to report script error");
            }
        }
        .instrument(span),
    )
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;

    async fn succeed() -> HandlerResult {
        Ok(())
    }

    async fn fail() -> HandlerResult {
        anyhow::bail!("boom")
    }

    async fn explode() -> HandlerResult {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_success_sends_nothing() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        let origin = Event::message("hi", "U1", "C1");

        spawn_guarded(&bot, "ok", Some(origin), succeed())
            .await
            .unwrap();

        assert!(engine.sent().is_empty());
    }

    #[tokio::test]
    async fn test_error_is_reported_to_origin_channel() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        let origin = Event::message("hi", "U1", "C1");

        spawn_guarded(&bot, "failing", Some(origin), fail())
            .await
            .unwrap();

        let sent = engine.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, ERROR_REPLY);
        assert_eq!(sent[0].to, "C1");
    }

    #[tokio::test]
    async fn test_panic_is_contained_and_reported() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        let origin = Event::message("hi", "U1", "C9");

        let handle = spawn_guarded(&bot, "panicking", Some(origin), explode());

        // The task itself completes normally.
        assert!(handle.await.is_ok());
        assert_eq!(engine.sent_texts(), vec![ERROR_REPLY.to_string()]);
    }

    #[tokio::test]
    async fn test_error_without_channel_is_only_logged() {
        let (bot, engine, _feed) = ScriptedEngine::bot();

        spawn_guarded(&bot, "job", None, fail())
            .await
            .unwrap();

        assert!(engine.sent().is_empty());
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
