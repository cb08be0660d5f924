//! The console engine.

use std::any::Any;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info};

use parley_core::{
    ChatParts, ConfigurableEngine, Engine, EngineResult, Event, EventSource, TransportError,
    TransportResult,
};

use crate::config::ConsoleConfig;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Reads messages from a line-oriented input and writes replies to an
/// output, normally the terminal.
pub struct ConsoleEngine {
    config: ConsoleConfig,
    input: Mutex<Reader>,
    output: Mutex<Writer>,
}

impl ConsoleEngine {
    /// Creates an engine over stdin and stdout.
    pub fn new(config: ConsoleConfig) -> Self {
        Self::from_io(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            config,
        )
    }

    /// Creates an engine over arbitrary input and output streams.
    pub fn from_io<R, W>(input: R, output: W, config: ConsoleConfig) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            config,
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    async fn write(&self, text: &str) -> TransportResult<()> {
        let mut output = self.output.lock().await;
        output.write_all(text.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }

    async fn prompt(&self) -> TransportResult<()> {
        self.write(&self.config.prompt).await
    }
}

#[async_trait]
impl EventSource for ConsoleEngine {
    async fn next_event(&self) -> TransportResult<Event> {
        let mut input = self.input.lock().await;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                info!("Console input closed");
                return Err(TransportError::closed("console input ended"));
            }

            // Stray bytes are replaced, not fatal.
            let line = String::from_utf8_lossy(&buf);
            let text = line.trim();
            if text.is_empty() {
                self.prompt().await?;
                continue;
            }

            debug!(text = %text, "Console line");
            let event = Event::message(text, &self.config.user, &self.config.channel);
            self.prompt().await?;
            return Ok(event);
        }
    }
}

#[async_trait]
impl Engine for ConsoleEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn setup(&self) -> EngineResult<()> {
        self.prompt().await?;
        Ok(())
    }

    async fn send(&self, text: &str, _to: &str) -> TransportResult<()> {
        self.write(&format!("{text}\n")).await
    }

    async fn react(&self, _event: &Event, _channel: &str, reaction: &str) -> TransportResult<()> {
        self.write(&format!("(:{reaction}:)\n")).await
    }

    fn is_direct(&self, _parts: &ChatParts) -> bool {
        true
    }
}

impl ConfigurableEngine for ConsoleEngine {
    type Config = ConsoleConfig;

    const NAME: &'static str = "cli";

    fn from_config(config: Self::Config) -> EngineResult<Self> {
        Ok(Self::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn quiet_config() -> ConsoleConfig {
        ConsoleConfig {
            prompt: "> ".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lines_become_message_events() {
        let engine = ConsoleEngine::from_io(&b"hello\n\n   \nrandom\n"[..], tokio::io::sink(), quiet_config());

        let first = engine.next_event().await.unwrap();
        assert_eq!(first.event_type(), Some("message"));
        assert_eq!(first.get_str("text"), Some("hello"));
        assert_eq!(first.get_str("user"), Some("User"));
        assert_eq!(first.get_str("channel"), Some("CLI"));

        // Blank lines are skipped.
        let second = engine.next_event().await.unwrap();
        assert_eq!(second.get_str("text"), Some("random"));

        let err = engine.next_event().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_decoded_lossily() {
        let engine = ConsoleEngine::from_io(&b"caf\xe9\nhello\n"[..], tokio::io::sink(), quiet_config());

        let first = engine.next_event().await.unwrap();
        assert_eq!(first.get_str("text"), Some("caf\u{FFFD}"));
        let second = engine.next_event().await.unwrap();
        assert_eq!(second.get_str("text"), Some("hello"));
    }

    #[tokio::test]
    async fn test_send_prints_line_after_prompt() {
        let (output, mut terminal) = tokio::io::duplex(1024);
        let engine = ConsoleEngine::from_io(&b""[..], output, quiet_config());

        engine.setup().await.unwrap();
        engine.send("Chipotle", "CLI").await.unwrap();
        engine.react(&Event::message("x", "User", "CLI"), "CLI", "tada").await.unwrap();
        drop(engine);

        let mut printed = String::new();
        terminal.read_to_string(&mut printed).await.unwrap();
        assert_eq!(printed, "> Chipotle\n(:tada:)\n");
    }

    #[test]
    fn test_every_message_is_direct() {
        let engine = ConsoleEngine::from_io(&b""[..], tokio::io::sink(), quiet_config());
        assert!(engine.is_direct(&ChatParts::default()));
        assert_eq!(engine.name(), "cli");
    }

    #[test]
    fn test_default_prompt() {
        assert_eq!(ConsoleConfig::default().prompt, "\x1b[4mParley\x1b[0m> ");
    }
}
