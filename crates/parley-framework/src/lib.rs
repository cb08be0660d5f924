//! # Parley Framework
//!
//! The event dispatch core of the Parley chat-bot runtime.
//!
//! This layer provides:
//! - A listener registry with snapshot iteration ([`ListenerRegistry`])
//! - The dispatch loop with fire-and-forget, failure-contained fan-out ([`Dispatcher`])
//! - Regex commands over message text ([`CommandBuilder`])
//! - Conversation continuations: `wait_for_event` and [`Chat::listen_for`]
//! - Help, cron schedules and the script registration phase
//!
//! Everything a handler touches goes through the [`Bot`] handle, a cheap clone
//! of one shared context created at startup.
//!
//! ```rust,ignore
//! use parley_framework::{Bot, Chat, HandlerResult};
//!
//! async fn lunch(chat: Chat) -> HandlerResult {
//!     chat.reply("How about Chipotle?").await?;
//!     Ok(())
//! }
//!
//! bot.command("lunch").help("lunch", "Suggest a place to eat").handle(lunch);
//! ```

pub mod bot;
pub mod chat;
pub mod command;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod help;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod task;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bot::{Bot, ListenerBuilder};
pub use chat::Chat;
pub use command::CommandBuilder;
pub use dispatcher::Dispatcher;
pub use error::{FrameworkError, FrameworkResult, ScriptError, WaitError, WaitResult};
pub use handler::{BoxFuture, BoxedHandler, BoxedJob, Handler, HandlerResult, Job};
pub use help::{HelpEntry, HelpRegistry};
pub use registry::{EventFilter, Listener, ListenerAction, ListenerId, ListenerRegistry, ListenerSpec};
pub use scheduler::{CronFields, ScheduleBuilder, Scheduler};
pub use script::{BoxedScript, FnScript, Script, ScriptReport, load_scripts, script};
pub use task::{ERROR_REPLY, spawn_guarded};
