//! Regex commands.
//!
//! A command is a message listener whose text must match a regular
//! expression at its start. The pattern is checked on the dispatcher, so a
//! message that does not look like the command never costs a task; only a
//! match spawns the handler, with the capture groups already recorded on the
//! [`Chat`].
//!
//! ```rust,ignore
//! bot.command(r"remind me in (\d+) minutes")
//!     .direct(true)
//!     .help("remind me in <n> minutes", "Sets a reminder")
//!     .handle(remind);
//! ```

use std::future::Future;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error};

use parley_core::{Event, Predicate};

use crate::bot::Bot;
use crate::chat::Chat;
use crate::handler::{HandlerResult, into_handler};
use crate::registry::{EventFilter, ListenerId, ListenerSpec};

/// Compiles `pattern` so that it only matches at the start of the text.
pub fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Builder returned by [`Bot::command`].
pub struct CommandBuilder<'a> {
    bot: &'a Bot,
    pattern: String,
    direct: bool,
    name: Option<String>,
    help: Option<(String, String)>,
}

impl Bot {
    /// Starts registering a command whose text matches `pattern`.
    pub fn command(&self, pattern: impl Into<String>) -> CommandBuilder<'_> {
        CommandBuilder {
            bot: self,
            pattern: pattern.into(),
            direct: false,
            name: None,
            help: None,
        }
    }
}

impl CommandBuilder<'_> {
    /// Only respond when the message is addressed to the bot.
    pub fn direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    /// Names the command in logs and in the help registry.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Records usage and description in the help registry.
    pub fn help(mut self, usage: impl Into<String>, description: impl Into<String>) -> Self {
        self.help = Some((usage.into(), description.into()));
        self
    }

    /// Registers `f` to be spawned for every matching message.
    pub fn handle<F, Fut>(self, f: F) -> ListenerId
    where
        F: Fn(Chat) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = self.name.unwrap_or_else(|| self.pattern.clone());
        if let Some((usage, description)) = &self.help {
            self.bot.add_help(&name, usage, description, &[]);
        }

        let regex = match compile_anchored(&self.pattern) {
            Ok(regex) => Some(Arc::new(regex)),
            Err(e) => {
                error!(
                    command = %name,
                    pattern = %self.pattern,
                    error = %e,
                    "Invalid command pattern; it will never match"
                );
                None
            }
        };

        let direct = self.direct;
        let filter_regex = regex.clone();
        let filter: EventFilter = Arc::new(move |bot: &Bot, event: &Event| {
            let Some(regex) = &filter_regex else {
                return false;
            };
            let engine = bot.engine();
            let parts = engine.chat_parts(event);
            if direct && !engine.is_direct(&parts) {
                return false;
            }
            regex.is_match(&parts.text)
        });

        let handler = into_handler(move |bot: Bot, event: Event| {
            let mut chat = bot.chat(&event);
            if let Some(regex) = &regex {
                chat.matches_regex(regex);
            }
            f(chat)
        });

        debug!(command = %name, direct, "Registered command");
        self.bot.registry().add(
            ListenerSpec::spawn(name, Predicate::event_type("message"), handler)
                .with_filter(filter),
        )
    }
}
