//! The bot handle.
//!
//! A [`Bot`] is the one shared context of a running bot: the engine, the
//! memory backend, the listener registry, the help registry and the
//! scheduler. It is created once at startup and handed (by cheap clone) to
//! every handler, so there is no process-global state.
//!
//! # Example
//!
//! ```rust,ignore
//! let bot = Bot::new(engine, memory);
//!
//! bot.on(Predicate::event_type("team_join"))
//!     .name("welcome")
//!     .handle(welcome);
//!
//! bot.command("ping").handle(|chat: Chat| async move {
//!     chat.reply("pong").await?;
//!     Ok(())
//! });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parley_core::{BoxedEngine, BoxedMemory, Event, Predicate, TransportResult};

use crate::chat::Chat;
use crate::dispatcher::Dispatcher;
use crate::handler::{BoxedJob, HandlerResult, into_handler, into_job};
use crate::help::HelpRegistry;
use crate::registry::{ListenerId, ListenerRegistry, ListenerSpec};
use crate::scheduler::Scheduler;
use crate::task::spawn_guarded;

struct BotInner {
    engine: BoxedEngine,
    memory: BoxedMemory,
    registry: ListenerRegistry,
    help: HelpRegistry,
    scheduler: Scheduler,
    start_hooks: Mutex<Vec<(String, BoxedJob)>>,
}

/// Shared handle to a running bot.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Creates a bot over an engine and a memory backend.
    pub fn new(engine: BoxedEngine, memory: BoxedMemory) -> Self {
        Self {
            inner: Arc::new(BotInner {
                engine,
                memory,
                registry: ListenerRegistry::new(),
                help: HelpRegistry::new(),
                scheduler: Scheduler::new(),
                start_hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &BoxedEngine {
        &self.inner.engine
    }

    /// Returns the memory backend.
    pub fn memory(&self) -> &BoxedMemory {
        &self.inner.memory
    }

    /// Returns the listener registry.
    pub fn registry(&self) -> &ListenerRegistry {
        &self.inner.registry
    }

    /// Returns the help registry.
    pub fn help(&self) -> &HelpRegistry {
        &self.inner.help
    }

    /// Returns the scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Returns `true` if both handles refer to the same bot.
    pub fn ptr_eq(a: &Bot, b: &Bot) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    // ─── Registration ──────────────────────────────────────────────────

    /// Starts registering a listener for events matching `predicate`.
    pub fn on(&self, predicate: Predicate) -> ListenerBuilder<'_> {
        ListenerBuilder {
            bot: self,
            predicate,
            name: None,
        }
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.registry.remove(id)
    }

    /// Registers a job to run once when the bot starts, before the first
    /// event is dispatched.
    pub fn on_start<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Bot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = name.into();
        debug!(hook = %name, "Registered start hook");
        self.inner.start_hooks.lock().push((name, into_job(f)));
    }

    /// Records help text for a command.
    ///
    /// `tags` default to the usage string when empty.
    pub fn add_help(&self, name: &str, usage: &str, description: &str, tags: &[&str]) {
        self.inner.help.update(name, usage, description, tags);
    }

    // ─── Outbound ──────────────────────────────────────────────────────

    /// Sends `text` to the channel `to` through the engine.
    pub async fn send(&self, text: &str, to: &str) -> TransportResult<()> {
        self.inner.engine.send(text, to).await
    }

    /// Builds the message view of an event.
    pub fn chat(&self, event: &Event) -> Chat {
        Chat::new(self.clone(), event.clone())
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────

    /// Runs the start hooks and starts the scheduled jobs.
    ///
    /// Returns the handles of the spawned tasks.
    pub fn start(&self, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        let hooks = self.inner.start_hooks.lock().clone();
        let mut handles: Vec<JoinHandle<()>> = hooks
            .into_iter()
            .map(|(name, job)| {
                let fut = job.call(self.clone());
                spawn_guarded(self, name, None, fut)
            })
            .collect();
        handles.extend(self.inner.scheduler.start(self, shutdown));
        handles
    }

    /// Runs the dispatch loop until `shutdown` fires or the engine fails.
    pub async fn run(&self, shutdown: CancellationToken) -> TransportResult<()> {
        info!(
            engine = %self.inner.engine.name(),
            listeners = self.inner.registry.len(),
            "Bot starting"
        );
        Dispatcher::new(self.clone()).run(shutdown).await
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("engine", &self.inner.engine.name())
            .field("registry", &self.inner.registry)
            .field("start_hooks", &self.inner.start_hooks.lock().len())
            .finish()
    }
}

/// Builder returned by [`Bot::on`].
pub struct ListenerBuilder<'a> {
    bot: &'a Bot,
    predicate: Predicate,
    name: Option<String>,
}

impl ListenerBuilder<'_> {
    /// Names the listener in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers `f` to be spawned for every matching event.
    pub fn handle<F, Fut>(self, f: F) -> ListenerId
    where
        F: Fn(Bot, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = self
            .name
            .unwrap_or_else(|| format!("on {}", self.predicate));
        self.bot
            .registry()
            .add(ListenerSpec::spawn(name, self.predicate, into_handler(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use parley_core::MemoryExt;
    use std::time::Duration;

    async fn remember(bot: Bot, event: Event) -> HandlerResult {
        bot.memory().save("last", event.to_value()).await?;
        Ok(())
    }

    async fn greet(bot: Bot) -> HandlerResult {
        bot.send("hello", "general").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_on_registers_listener() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let id = bot
            .on(Predicate::event_type("reaction_added"))
            .name("remember")
            .handle(remember);

        assert!(bot.registry().contains(id));
        assert!(bot.remove_listener(id));
        assert!(!bot.remove_listener(id));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let other = bot.clone();
        assert!(Bot::ptr_eq(&bot, &other));

        other.memory().store("n", &7).await.unwrap();
        assert_eq!(bot.memory().load::<i32>("n").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_start_runs_hooks() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        bot.on_start("greet", greet);

        let shutdown = CancellationToken::new();
        for handle in bot.start(&shutdown) {
            handle.await.unwrap();
        }

        assert!(engine.wait_for_sent(1, Duration::from_secs(1)).await);
        assert_eq!(engine.sent()[0].to, "general");
    }

    #[tokio::test]
    async fn test_add_help_defaults_tags_to_usage() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        bot.add_help("lunch", "lunch", "Suggest a place", &[]);

        let entries = bot.help().list(Some("lun"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].usage, "lunch");
    }
}
