//! # Parley
//!
//! An event-driven chat-bot runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ next_event ┌────────────┐ snapshot ┌──────────────────────────┐
//! │  Engine  │───────────▶│ Dispatcher │─────────▶│ listener "lunch"  (task) │──▶ reply / memory
//! │ cli/slack│            │            │─────────▶│ listener "help"   (task) │──▶ reply
//! └──────────┘            └────────────┘─────────▶│ wait_for_event  (inline) │──▶ wakes a handler
//!                                                 └──────────────────────────┘
//! ```
//!
//! - **Engines** deliver events and carry replies (console, Slack)
//! - **Listeners** pair a structural predicate with a handler; commands add a
//!   regex over the message text
//! - **Handlers** run as their own tasks; failures are logged and reported
//!   to the channel without touching the loop or other handlers
//! - **Conversations** suspend a handler until a matching event arrives
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//!
//! async fn lunch(chat: Chat) -> HandlerResult {
//!     chat.reply("How about Chipotle?").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = ParleyRuntime::builder().build()?;
//!     runtime
//!         .register_engine::<ConsoleEngine>()
//!         .register_script(script("lunch", |bot| {
//!             bot.command("lunch").help("lunch", "Suggest a place to eat").handle(lunch);
//!             Ok(())
//!         }));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `console` *(default)*: terminal engine
//! - `slack`: Slack real-time engine
//! - `redis-memory`: Redis memory backend
//! - `toml-config` *(default)*, `yaml-config`: config file formats
//! - `json-log`: JSON log lines
//! - `testing`: `ScriptedEngine` for exercising scripts in tests

pub use parley_core as core;
pub use parley_framework as framework;
pub use parley_memory as memory;
pub use parley_runtime as runtime;

#[cfg(feature = "console")]
pub use parley_adapter_console as console;
#[cfg(feature = "slack")]
pub use parley_adapter_slack as slack;

/// Common imports for writing scripts and binaries.
pub mod prelude {
    pub use parley_runtime::{ParleyConfig, ParleyRuntime};

    pub use parley_framework::{
        Bot, BoxedScript, Chat, CronFields, HandlerResult, ListenerId, Script, WaitError, script,
    };

    pub use parley_core::{Event, Memory, MemoryExt, Predicate};

    #[cfg(feature = "console")]
    pub use parley_adapter_console::ConsoleEngine;
    #[cfg(feature = "slack")]
    pub use parley_adapter_slack::{SlackEngine, slack_script};
}
