//! # Parley Console Engine
//!
//! A chat engine that reads lines from the terminal and prints replies.
//! Every non-blank line becomes one `message` event from user `User` in
//! channel `CLI`; every message counts as addressed to the bot.
//!
//! ```toml
//! engine = "cli"
//!
//! [engines.cli]
//! prompt = "bot> "
//! ```

mod config;
mod engine;

pub use config::ConsoleConfig;
pub use engine::ConsoleEngine;
