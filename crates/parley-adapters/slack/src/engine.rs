//! The Slack engine.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use parley_core::{
    ChatParts, ConfigurableEngine, Engine, EngineError, EngineResult, Event, EventSource,
    TransportError, TransportResult,
};
use parley_transport::{FormConverter, WebhookServer, WsConnection};

use crate::action::button_action_event;
use crate::config::SlackConfig;

const TOKEN_ENV: &str = "SLACK_TOKEN";

/// Who the bot is on Slack, as reported at connect time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlackIdentity {
    /// User identifier, e.g. `U024BE7LH`.
    pub id: String,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    ok: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "self")]
    identity: Option<SlackIdentity>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slack real-time messaging engine.
pub struct SlackEngine {
    config: SlackConfig,
    token: String,
    http: Client,
    socket: OnceLock<WsConnection>,
    identity: OnceLock<SlackIdentity>,
    side_tx: mpsc::UnboundedSender<Event>,
    side_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    webhook: Mutex<Option<WebhookServer>>,
    throttled: AtomicBool,
    next_message_id: AtomicU64,
}

impl SlackEngine {
    /// Creates the engine; fails if no token is configured or exported.
    pub fn new(config: SlackConfig) -> EngineResult<Self> {
        let token = resolve_token(config.token.clone(), std::env::var(TOKEN_ENV).ok())?;
        let (side_tx, side_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            token,
            http: Client::new(),
            socket: OnceLock::new(),
            identity: OnceLock::new(),
            side_tx,
            side_rx: tokio::sync::Mutex::new(side_rx),
            webhook: Mutex::new(None),
            throttled: AtomicBool::new(false),
            next_message_id: AtomicU64::new(1),
        })
    }

    /// The bot's identity, once connected.
    pub fn identity(&self) -> Option<&SlackIdentity> {
        self.identity.get()
    }

    /// Queues an event to be yielded ahead of socket traffic.
    pub fn push_side_event(&self, event: Event) {
        let _ = self.side_tx.send(event);
    }

    /// Records that Slack asked the bot to slow down.
    pub fn mark_throttled(&self) {
        self.throttled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once a rate-limit warning was seen.
    pub fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::Relaxed)
    }

    fn api_url(&self, method: &str, params: &[(&str, &str)]) -> TransportResult<Url> {
        let base = format!("{}/{method}", self.config.api_base.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| TransportError::protocol(format!("invalid API URL '{base}': {e}")))?;
        url.query_pairs_mut()
            .append_pair("token", &self.token)
            .extend_pairs(params);
        Ok(url)
    }

    fn socket(&self) -> TransportResult<&WsConnection> {
        self.socket
            .get()
            .ok_or_else(|| TransportError::protocol("slack engine used before setup"))
    }

    async fn connect(&self) -> EngineResult<ConnectResponse> {
        let url = self.api_url(&self.config.connect_method, &[])?;
        info!(method = %self.config.connect_method, "Authenticating");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                url: self.config.api_base.clone(),
                reason: e.to_string(),
            })?
            .json::<ConnectResponse>()
            .await
            .map_err(|e| TransportError::protocol(format!("unreadable connect response: {e}")))?;

        if !response.ok {
            return Err(EngineError::AuthFailed(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(response)
    }
}

/// Picks the configured token, else the exported one; blank counts as absent.
fn resolve_token(configured: Option<String>, exported: Option<String>) -> EngineResult<String> {
    configured
        .filter(|t| !t.trim().is_empty())
        .or_else(|| exported.filter(|t| !t.trim().is_empty()))
        .ok_or(EngineError::MissingCredential {
            engine: "slack",
            name: TOKEN_ENV,
        })
}

#[async_trait]
impl EventSource for SlackEngine {
    async fn next_event(&self) -> TransportResult<Event> {
        let socket = self.socket()?;
        let mut side = self.side_rx.lock().await;

        loop {
            let text = tokio::select! {
                biased;
                Some(event) = side.recv() => return Ok(event),
                text = socket.recv_text() => text?,
            };

            trace!(frame = %text, "Received frame");
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => match Event::from_value(value) {
                    Some(event) => return Ok(event),
                    None => debug!("Skipping non-object frame"),
                },
                Err(e) => warn!(error = %e, "Skipping unparseable frame"),
            }
        }
    }
}

#[async_trait]
impl Engine for SlackEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn setup(&self) -> EngineResult<()> {
        let response = self.connect().await?;
        let socket_url = response
            .url
            .ok_or_else(|| EngineError::AuthFailed("connect response has no socket url".into()))?;
        if let Some(identity) = response.identity {
            info!(id = %identity.id, name = %identity.name, "Logged in");
            let _ = self.identity.set(identity);
        }

        let socket = WsConnection::connect(&socket_url).await?;
        if self.socket.set(socket).is_err() {
            return Err(EngineError::InvalidConfig("slack engine set up twice".into()));
        }

        if let Some(webhook) = &self.config.webhook {
            let converter: FormConverter = Arc::new(button_action_event);
            let server =
                WebhookServer::bind(&webhook.bind, &webhook.path, converter, self.side_tx.clone())
                    .await?;
            *self.webhook.lock() = Some(server);
        }
        Ok(())
    }

    async fn send(&self, text: &str, to: &str) -> TransportResult<()> {
        let payload = json!({
            "id": self.next_message_id.fetch_add(1, Ordering::Relaxed),
            "type": "message",
            "channel": to,
            "text": text,
        });
        trace!(payload = %payload, "Sending");
        self.socket()?.send_text(&payload.to_string()).await
    }

    async fn react(&self, event: &Event, channel: &str, reaction: &str) -> TransportResult<()> {
        let ts = event
            .get_str("ts")
            .ok_or_else(|| TransportError::protocol("cannot react to an event without 'ts'"))?;
        let url = self.api_url(
            "reactions.add",
            &[("name", reaction), ("timestamp", ts), ("channel", channel)],
        )?;

        let response = self
            .http
            .post(url)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?
            .json::<ApiResponse>()
            .await
            .map_err(|e| TransportError::protocol(e.to_string()))?;
        if !response.ok {
            return Err(TransportError::SendFailed(format!(
                "reactions.add failed: {}",
                response.error.unwrap_or_default()
            )));
        }
        Ok(())
    }

    fn is_direct(&self, parts: &ChatParts) -> bool {
        if parts.channel.starts_with('D') {
            return true;
        }
        match self.identity.get() {
            Some(me) => {
                parts.text.starts_with(&format!("<@{}>", me.id))
                    || (!me.name.is_empty() && parts.text.starts_with(&format!("@{}", me.name)))
            }
            None => false,
        }
    }

    async fn shutdown(&self) {
        if let Some(server) = self.webhook.lock().take() {
            server.shutdown();
        }
        if let Some(socket) = self.socket.get() {
            if let Err(e) = socket.close().await {
                debug!(error = %e, "Socket close failed");
            }
        }
    }
}

impl ConfigurableEngine for SlackEngine {
    type Config = SlackConfig;

    const NAME: &'static str = "slack";

    fn from_config(config: Self::Config) -> EngineResult<Self> {
        Self::new(config)
    }
}
