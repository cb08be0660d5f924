//! Message view passed to command handlers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, error};

use parley_core::{Event, Predicate, TransportResult};

use crate::bot::Bot;
use crate::command::compile_anchored;
use crate::error::WaitResult;
use crate::registry::EventFilter;

#[derive(Default)]
struct ListenState {
    listening_for: Option<String>,
    heard: Option<Event>,
}

/// Clears `listening_for` when the listen ends, including when its future
/// is dropped.
struct ListeningGuard<'a>(&'a Mutex<ListenState>);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().listening_for = None;
    }
}

/// A message event seen through the engine: text, author and channel, plus
/// the regex captures of the command that matched it.
///
/// Cloning is cheap; clones share the listen state.
#[derive(Clone)]
pub struct Chat {
    text: String,
    user: String,
    channel: String,
    raw: Event,
    bot: Bot,
    groups: Vec<Option<String>>,
    listen: Arc<Mutex<ListenState>>,
}

impl Chat {
    pub(crate) fn new(bot: Bot, raw: Event) -> Self {
        let parts = bot.engine().chat_parts(&raw);
        Self {
            text: parts.text,
            user: parts.user,
            channel: parts.channel,
            raw,
            bot,
            groups: Vec::new(),
            listen: Arc::new(Mutex::new(ListenState::default())),
        }
    }

    /// Message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Author identifier.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Channel identifier.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The underlying event.
    pub fn raw(&self) -> &Event {
        &self.raw
    }

    /// The bot this message was received by.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Capture groups of the last successful [`matches_regex`](Self::matches_regex),
    /// excluding the whole match. Unmatched optional groups are `None`.
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }

    /// Returns capture group `index` (1-based, as in the pattern).
    pub fn group(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(|g| g.as_deref())
    }

    /// Matches `regex` against the start of the text, recording its groups.
    pub fn matches_regex(&mut self, regex: &Regex) -> bool {
        match regex.captures(&self.text) {
            Some(captures) => {
                self.groups = captures
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()))
                    .collect();
                true
            }
            None => false,
        }
    }

    /// Returns `true` if the message was addressed to the bot.
    pub fn is_direct(&self) -> bool {
        let parts = self.bot.engine().chat_parts(&self.raw);
        self.bot.engine().is_direct(&parts)
    }

    /// Replies in the message's channel.
    pub async fn reply(&self, text: &str) -> TransportResult<()> {
        self.bot.send(text, &self.channel).await
    }

    /// Reacts to the message.
    pub async fn react(&self, reaction: &str) -> TransportResult<()> {
        self.bot
            .engine()
            .react(&self.raw, &self.channel, reaction)
            .await
    }

    /// Returns `true` while a [`listen_for`](Self::listen_for) is pending.
    pub fn is_listening(&self) -> bool {
        self.listen.lock().listening_for.is_some()
    }

    /// The message that ended the last completed `listen_for`.
    pub fn heard_message(&self) -> Option<Chat> {
        let heard = self.listen.lock().heard.clone()?;
        Some(self.bot.chat(&heard))
    }

    /// Waits for the next message from the same user whose text matches
    /// `pattern` (anchored at the start).
    ///
    /// The returned chat carries the pattern's capture groups. Messages from
    /// other users are ignored. A malformed pattern is logged and never
    /// matches.
    pub async fn listen_for(&self, pattern: &str) -> WaitResult<Chat> {
        self.listen(pattern, None).await
    }

    /// Like [`listen_for`](Self::listen_for), giving up after `timeout`.
    pub async fn listen_for_timeout(&self, pattern: &str, timeout: Duration) -> WaitResult<Chat> {
        self.listen(pattern, Some(timeout)).await
    }

    async fn listen(&self, pattern: &str, timeout: Option<Duration>) -> WaitResult<Chat> {
        let regex = match compile_anchored(pattern) {
            Ok(regex) => Some(Arc::new(regex)),
            Err(e) => {
                error!(pattern = %pattern, error = %e, "Invalid listen pattern; it will never match");
                None
            }
        };

        let user = self.user.clone();
        let filter_regex = regex.clone();
        let filter: EventFilter = Arc::new(move |bot: &Bot, event: &Event| {
            let Some(regex) = &filter_regex else { return false };
            let parts = bot.engine().chat_parts(event);
            if parts.user != user {
                debug!(user = %parts.user, "Heard this from a wrong user");
                return false;
            }
            regex.is_match(&parts.text)
        });

        self.listen.lock().listening_for = Some(pattern.to_string());
        let listening = ListeningGuard(&*self.listen);
        let result = self
            .bot
            .wait_with("listen_for", Predicate::event_type("message"), Some(filter), timeout)
            .await;
        drop(listening);

        let event = result?;
        self.listen.lock().heard = Some(event.clone());

        let mut heard = self.bot.chat(&event);
        if let Some(regex) = &regex {
            heard.matches_regex(regex);
        }
        Ok(heard)
    }
}

impl fmt::Debug for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chat")
            .field("text", &self.text)
            .field("user", &self.user)
            .field("channel", &self.channel)
            .field("groups", &self.groups)
            .finish()
    }
}

impl fmt::Display for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.channel, self.user, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::error::WaitError;
    use crate::testing::ScriptedEngine;

    #[tokio::test]
    async fn test_fields_come_from_engine() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("hello", "U1", "C1"));
        assert_eq!(chat.text(), "hello");
        assert_eq!(chat.user(), "U1");
        assert_eq!(chat.channel(), "C1");
        assert_eq!(chat.to_string(), "C1:U1: hello");
    }

    #[tokio::test]
    async fn test_matches_regex_records_groups() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let mut chat = bot.chat(&Event::message("remind me at 5", "U1", "C1"));
        let regex = compile_anchored(r"remind me at (\d+)( pm)?").unwrap();

        assert!(chat.matches_regex(&regex));
        assert_eq!(chat.groups().len(), 2);
        assert_eq!(chat.group(1), Some("5"));
        assert_eq!(chat.group(2), None);
        assert_eq!(chat.group(0), None);
    }

    #[tokio::test]
    async fn test_reply_goes_to_message_channel() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("hi", "U1", "C7"));
        chat.reply("hello back").await.unwrap();

        let sent = engine.sent();
        assert_eq!(sent[0].text, "hello back");
        assert_eq!(sent[0].to, "C7");
    }

    #[tokio::test]
    async fn test_react_reaches_engine() {
        let (bot, engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("hi", "U1", "C7"));
        chat.react("tada").await.unwrap();
        assert_eq!(engine.reactions(), vec!["tada".to_string()]);
    }

    #[tokio::test]
    async fn test_listen_for_ignores_other_users() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("coffee?", "A", "C1"));

        let waiter = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.listen_for("yes|no").await })
        };
        while !chat.is_listening() {
            tokio::task::yield_now().await;
        }

        let dispatcher = Dispatcher::new(bot.clone());
        dispatcher.dispatch(Event::message("yes", "B", "C1"));
        dispatcher.dispatch(Event::message("maybe", "A", "C1"));
        dispatcher.dispatch(Event::message("no", "A", "C1"));

        let answer = waiter.await.unwrap().unwrap();
        assert_eq!(answer.text(), "no");
        assert_eq!(answer.user(), "A");
        assert!(!chat.is_listening());
        assert_eq!(chat.heard_message().map(|c| c.text().to_string()), Some("no".into()));
        assert!(bot.registry().is_empty());
    }

    #[tokio::test]
    async fn test_listen_for_invalid_pattern_never_matches() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("hi", "A", "C1"));

        let waiter = {
            let chat = chat.clone();
            tokio::spawn(async move {
                chat.listen_for_timeout("(unclosed", Duration::from_millis(50))
                    .await
            })
        };
        while !chat.is_listening() {
            tokio::task::yield_now().await;
        }
        Dispatcher::new(bot).dispatch(Event::message("(unclosed", "A", "C1"));

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(WaitError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_cancelled_listen_clears_listening_flag() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("coffee?", "A", "C1"));

        let outer = tokio::time::timeout(Duration::from_millis(20), chat.listen_for("yes")).await;
        assert!(outer.is_err());
        assert!(!chat.is_listening());
        assert!(bot.registry().is_empty());
    }

    #[tokio::test]
    async fn test_aborted_listen_clears_listening_flag() {
        let (bot, _engine, _feed) = ScriptedEngine::bot();
        let chat = bot.chat(&Event::message("coffee?", "A", "C1"));

        let waiter = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.listen_for("yes").await })
        };
        while !chat.is_listening() {
            tokio::task::yield_now().await;
        }
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        assert!(!chat.is_listening());
        assert!(bot.registry().is_empty());
    }
}
