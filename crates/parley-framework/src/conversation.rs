//! Conversation continuations.
//!
//! A handler that needs a later event (the user's answer to a question)
//! registers a one-shot listener and suspends until it matches. The listener
//! is [inline](crate::ListenerAction::Inline): the dispatcher resumes the
//! waiter during the pass of the matching event, so the first matching event
//! after registration is the one delivered, and no later one is.
//!
//! The listener is removed when the wait ends for any reason: a match, a
//! timeout, or the waiting future being dropped.
//!
//! ```rust,ignore
//! async fn ask(chat: Chat) -> HandlerResult {
//!     chat.reply("Coffee or tea?").await?;
//!     let answer = chat.listen_for_timeout("coffee|tea", Duration::from_secs(60)).await?;
//!     chat.reply(&format!("One {} coming up", answer.text())).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use parley_core::{Event, Predicate};

use crate::bot::Bot;
use crate::error::{WaitError, WaitResult};
use crate::registry::{EventFilter, ListenerId, ListenerRegistry, ListenerSpec};

/// Removes the wait's listener when the wait ends.
struct WaitGuard {
    registry: ListenerRegistry,
    id: ListenerId,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if self.registry.remove(self.id) {
            debug!(id = %self.id, "Wait listener removed");
        }
    }
}

impl Bot {
    /// Suspends until an event matching `predicate` arrives and returns it.
    ///
    /// There is no deadline; see [`wait_for_event_timeout`](Self::wait_for_event_timeout).
    pub async fn wait_for_event(&self, predicate: Predicate) -> WaitResult<Event> {
        self.wait_with("wait_for_event", predicate, None, None).await
    }

    /// Like [`wait_for_event`](Self::wait_for_event), giving up after `timeout`.
    pub async fn wait_for_event_timeout(
        &self,
        predicate: Predicate,
        timeout: Duration,
    ) -> WaitResult<Event> {
        self.wait_with("wait_for_event", predicate, None, Some(timeout))
            .await
    }

    pub(crate) async fn wait_with(
        &self,
        name: &str,
        predicate: Predicate,
        filter: Option<EventFilter>,
        timeout: Option<Duration>,
    ) -> WaitResult<Event> {
        let (tx, rx) = oneshot::channel::<Event>();
        let slot = Mutex::new(Some(tx));

        let mut spec = ListenerSpec::inline(name, predicate, move |event| {
            // Only the first match resumes the waiter.
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(event.clone());
            }
        });
        if let Some(filter) = filter {
            spec = spec.with_filter(filter);
        }

        let registry = self.registry().clone();
        let id = registry.add(spec);
        let _guard = WaitGuard { registry, id };

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| WaitError::TimedOut(limit))?,
            None => rx.await,
        };
        received.map_err(|_| WaitError::Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::testing::ScriptedEngine;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn reaction(name: &str) -> Event {
        Event::from_value(json!({"type": "reaction_added", "reaction": name})).unwrap()
    }

    #[tokio::test]
    async fn test_first_matching_event_resumes_waiter() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let waiter = {
            let bot = bot.clone();
            tokio::spawn(async move {
                bot.wait_for_event(Predicate::event_type("reaction_added"))
                    .await
            })
        };
        while bot.registry().is_empty() {
            tokio::task::yield_now().await;
        }

        let dispatcher = Dispatcher::new(bot.clone());
        dispatcher.dispatch(Event::message("noise", "U1", "C1"));
        dispatcher.dispatch(reaction("tada"));
        dispatcher.dispatch(reaction("thumbsup"));

        let event = assert_ok!(waiter.await.unwrap());
        assert_eq!(event.get_str("reaction"), Some("tada"));
        assert!(bot.registry().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_removes_listener() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let result = bot
            .wait_for_event_timeout(Predicate::event_type("never"), Duration::from_millis(20))
            .await;

        let err = assert_err!(result);
        assert_eq!(err, WaitError::TimedOut(Duration::from_millis(20)));
        assert!(bot.registry().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_wait_removes_listener() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let waiter = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.wait_for_event(Predicate::event_type("never")).await })
        };
        while bot.registry().is_empty() {
            tokio::task::yield_now().await;
        }

        waiter.abort();
        let _ = waiter.await;
        assert!(bot.registry().is_empty());
    }
}
