//! Event dispatcher for the Parley framework.
//!
//! The [`Dispatcher`] owns the main loop: fetch one event from the engine,
//! offer it to every registered listener, repeat.
//!
//! # Fan-out
//!
//! For each event the dispatcher takes a snapshot of the registry and walks
//! it in registration order. Every listener whose predicate (and filter)
//! accepts the event is triggered:
//!
//! - [`ListenerAction::Spawn`] handlers start as independent tasks. The loop
//!   never awaits them, so a slow handler cannot hold up the next event, and
//!   a failing one cannot stop its siblings.
//! - [`ListenerAction::Inline`] actions run immediately on the loop. They
//!   resume conversation waits and must not block. A panicking inline action
//!   or filter is logged and skipped.
//!
//! After each pass the loop yields once so that freshly spawned handlers get
//! a chance to run before the next fetch.

use std::panic::{self, AssertUnwindSafe};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, span, trace};

use parley_core::{Event, TransportResult};

use crate::bot::Bot;
use crate::registry::ListenerAction;
use crate::task::{panic_message, spawn_guarded};

/// Drives events from the engine to the listeners of a [`Bot`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    bot: Bot,
}

impl Dispatcher {
    /// Creates a dispatcher for `bot`.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Offers one event to every registered listener.
    ///
    /// Returns the handles of the handler tasks spawned for it; callers other
    /// than tests are free to drop them.
    pub fn dispatch(&self, event: Event) -> Vec<JoinHandle<()>> {
        let event_type = event.event_type().unwrap_or("unknown").to_string();
        let span = span!(Level::DEBUG, "dispatch", event_type = %event_type);
        let _enter = span.enter();

        let mut handles = Vec::new();
        for listener in self.bot.registry().snapshot() {
            let accepted =
                panic::catch_unwind(AssertUnwindSafe(|| listener.accepts(&self.bot, &event)));
            match accepted {
                Ok(true) => {}
                Ok(false) => continue,
                Err(panic) => {
                    error!(
                        listener = %listener.name(),
                        error = %panic_message(panic.as_ref()),
                        "Listener filter panicked"
                    );
                    continue;
                }
            }
            trace!(listener = %listener.name(), id = %listener.id(), "Listener matched");

            match listener.action() {
                ListenerAction::Spawn(handler) => {
                    let fut = handler.call(self.bot.clone(), event.clone());
                    handles.push(spawn_guarded(
                        &self.bot,
                        listener.name(),
                        Some(event.clone()),
                        fut,
                    ));
                }
                ListenerAction::Inline(action) => {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| action(&event))) {
                        error!(
                            listener = %listener.name(),
                            error = %panic_message(panic.as_ref()),
                            "Inline listener panicked"
                        );
                    }
                }
            }
        }

        debug!(triggered = handles.len(), "Event dispatched");
        handles
    }

    /// Runs the dispatch loop.
    ///
    /// Returns `Ok(())` when `shutdown` is cancelled, or the engine's error
    /// when the event source fails. Handler failures never end the loop.
    pub async fn run(&self, shutdown: CancellationToken) -> TransportResult<()> {
        info!("Bot started! Listening to events.");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Dispatch loop stopping");
                    return Ok(());
                }
                result = self.bot.engine().next_event() => match result {
                    Ok(event) => event,
                    Err(e) => {
                        error!(error = %e, "Event source failed");
                        return Err(e);
                    }
                },
            };

            trace!(event = %event, "Received event");
            self.dispatch(event);
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;
    use crate::registry::{EventFilter, ListenerSpec};
    use crate::task::ERROR_REPLY;
    use crate::testing::ScriptedEngine;
    use parley_core::{Predicate, TransportError};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn fail(_bot: Bot, _event: Event) -> HandlerResult {
        anyhow::bail!("first handler fails")
    }

    async fn reply_ok(bot: Bot, event: Event) -> HandlerResult {
        let channel = event.get_str("channel").unwrap_or_default().to_string();
        bot.send("second ran", &channel).await?;
        Ok(())
    }

    fn counter(bot: &Bot, predicate: Predicate) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        bot.on(predicate).handle(move |_bot, _event| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                HandlerResult::Ok(())
            }
        });
        count
    }

    #[tokio::test]
    async fn test_only_matching_listeners_fire() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let messages = counter(&bot, Predicate::event_type("message"));
        let reactions = counter(&bot, Predicate::event_type("reaction_added"));

        let dispatcher = Dispatcher::new(bot);
        for handle in dispatcher.dispatch(Event::message("hi", "U1", "C1")) {
            handle.await.unwrap();
        }

        assert_eq!(messages.load(Ordering::SeqCst), 1);
        assert_eq!(reactions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_siblings() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        bot.on(Predicate::event_type("message")).name("fail").handle(fail);
        bot.on(Predicate::event_type("message")).name("ok").handle(reply_ok);

        let dispatcher = Dispatcher::new(bot);
        for handle in dispatcher.dispatch(Event::message("hi", "U1", "C1")) {
            handle.await.unwrap();
        }

        let mut texts = engine.sent_texts();
        texts.sort();
        assert_eq!(texts, vec![ERROR_REPLY.to_string(), "second ran".to_string()]);
    }

    #[tokio::test]
    async fn test_self_removing_listener_runs_once_in_its_pass() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let calls = Arc::new(AtomicUsize::new(0));
        let id_slot = Arc::new(parking_lot::Mutex::new(None));

        let seen = calls.clone();
        let slot = id_slot.clone();
        let registry = bot.registry().clone();
        let id = bot.registry().add(ListenerSpec::inline(
            "once",
            Predicate::event_type("message"),
            move |_event| {
                seen.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot.lock() {
                    registry.remove(id);
                }
            },
        ));
        *id_slot.lock() = Some(id);
        let after = counter(&bot, Predicate::event_type("message"));

        let dispatcher = Dispatcher::new(bot.clone());
        for handle in dispatcher.dispatch(Event::message("a", "U1", "C1")) {
            handle.await.unwrap();
        }
        for handle in dispatcher.dispatch(Event::message("b", "U1", "C1")) {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The listener registered after it still saw both events.
        assert_eq!(after.load(Ordering::SeqCst), 2);
        assert!(!bot.registry().contains(id));
    }

    #[tokio::test]
    async fn test_listener_added_during_pass_waits_for_next_event() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let late = Arc::new(AtomicUsize::new(0));

        let registry = bot.registry().clone();
        let late_seen = late.clone();
        bot.registry().add(ListenerSpec::inline(
            "adder",
            Predicate::event_type("message"),
            move |_event| {
                let late_seen = late_seen.clone();
                registry.add(ListenerSpec::inline(
                    "late",
                    Predicate::event_type("message"),
                    move |_event| {
                        late_seen.fetch_add(1, Ordering::SeqCst);
                    },
                ));
            },
        ));

        let dispatcher = Dispatcher::new(bot);
        dispatcher.dispatch(Event::message("a", "U1", "C1"));
        assert_eq!(late.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(Event::message("b", "U1", "C1"));
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_engine_close() {
        let (bot, _engine, feed) = ScriptedEngine::bot();
        let count = counter(&bot, Predicate::event_type("message"));

        feed.push(Event::message("one", "U1", "C1"));
        feed.push(Event::from_value(json!({"type": "presence_change"})).unwrap());
        feed.push(Event::message("two", "U1", "C1"));
        feed.close();

        let result = bot.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed { .. })));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert!(bot.run(shutdown).await.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_inline_listener_is_contained() {
        let (bot, _engine, feed) = ScriptedEngine::bot();
        bot.registry().add(ListenerSpec::inline(
            "boom",
            Predicate::event_type("message"),
            |_event| panic!("inline boom"),
        ));
        let picky: EventFilter = Arc::new(|_bot: &Bot, _event: &Event| -> bool { panic!("filter boom") });
        bot.registry().add(
            ListenerSpec::inline("picky", Predicate::event_type("message"), |_event| {})
                .with_filter(picky),
        );
        let after = counter(&bot, Predicate::event_type("message"));

        feed.push(Event::message("one", "U1", "C1"));
        feed.push(Event::message("two", "U1", "C1"));
        feed.close();

        let result = bot.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed { .. })));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(after.load(Ordering::SeqCst), 2);
    }
}
