//! In-memory engine for exercising scripts.
//!
//! [`ScriptedEngine`] yields events pushed through an [`EngineFeed`] and
//! records everything the bot sends, so a test can drive a bot end to end
//! without a chat backend.
//!
//! ```rust,ignore
//! let (bot, engine, feed) = ScriptedEngine::bot();
//! load_scripts(&bot, &[my_script()]);
//!
//! feed.push(Event::message("ping", "U1", "C1"));
//! let runner = bot.clone();
//! tokio::spawn(async move { runner.run(shutdown).await });
//!
//! assert!(engine.wait_for_sent(1, Duration::from_secs(1)).await);
//! assert_eq!(engine.sent_texts(), vec!["pong"]);
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};

use parley_core::{ChatParts, Engine, Event, EventSource, TransportError, TransportResult};
use parley_memory::MemoryDict;

use crate::bot::Bot;

/// A message delivered through [`Engine::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Message text.
    pub text: String,
    /// Destination channel.
    pub to: String,
}

/// Pushes events into a [`ScriptedEngine`].
#[derive(Debug, Clone)]
pub struct EngineFeed {
    tx: mpsc::UnboundedSender<Event>,
}

impl EngineFeed {
    /// Queues an event for the engine to yield.
    pub fn push(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Drops this feed. Once every feed is gone and the queue is drained,
    /// the engine reports a closed connection.
    pub fn close(self) {}
}

/// Engine driven by an [`EngineFeed`] that records outgoing messages.
///
/// Channels whose identifier starts with `D` count as direct messages.
pub struct ScriptedEngine {
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    sent: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<String>>,
    activity: Notify,
}

impl ScriptedEngine {
    /// Creates an engine and the feed that drives it.
    pub fn new() -> (Arc<Self>, EngineFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            inbox: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
            activity: Notify::new(),
        });
        (engine, EngineFeed { tx })
    }

    /// Creates a bot over a fresh engine and an in-process memory.
    pub fn bot() -> (Bot, Arc<Self>, EngineFeed) {
        let (engine, feed) = Self::new();
        let bot = Bot::new(engine.clone(), Arc::new(MemoryDict::new()));
        (bot, engine, feed)
    }

    /// Messages sent so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Texts of the messages sent so far, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }

    /// Reactions added so far, in order.
    pub fn reactions(&self) -> Vec<String> {
        self.reactions.lock().clone()
    }

    /// Waits until at least `count` messages were sent.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let reached = async {
            loop {
                let notified = self.activity.notified();
                if self.sent.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, reached).await.is_ok()
    }
}

#[async_trait]
impl EventSource for ScriptedEngine {
    async fn next_event(&self) -> TransportResult<Event> {
        self.inbox
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| TransportError::closed("scripted feed closed"))
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn send(&self, text: &str, to: &str) -> TransportResult<()> {
        self.sent.lock().push(SentMessage {
            text: text.to_string(),
            to: to.to_string(),
        });
        self.activity.notify_waiters();
        Ok(())
    }

    async fn react(&self, _event: &Event, _channel: &str, reaction: &str) -> TransportResult<()> {
        self.reactions.lock().push(reaction.to_string());
        Ok(())
    }

    fn is_direct(&self, parts: &ChatParts) -> bool {
        parts.channel.starts_with('D')
    }
}
