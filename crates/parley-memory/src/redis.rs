//! Redis-backed memory.
//!
//! Values are stored as JSON strings under their key with `SET`/`GET`. The
//! connection is opened and checked with `PING` during
//! [`setup`](Memory::setup), so a bot configured with an unreachable server
//! stops before handling any event.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use parley_core::{ConfigurableMemory, Memory, MemoryError, MemoryResult};

/// Configuration for [`RedisMemory`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisMemoryConfig {
    /// Full connection URL. Takes precedence over `host`, `port` and `db`.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: i64,
    /// Connect and response timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RedisMemoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            timeout_secs: 5,
        }
    }
}

impl RedisMemoryConfig {
    /// The URL the client connects to.
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// Memory backed by a Redis server.
pub struct RedisMemory {
    client: Client,
    url: String,
    timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl RedisMemory {
    /// Creates a client for the configured server. No connection is made
    /// until [`setup`](Memory::setup) or the first access.
    pub fn new(config: RedisMemoryConfig) -> MemoryResult<Self> {
        let url = config.connection_url();
        let client = Client::open(url.as_str())
            .map_err(|e| MemoryError::InvalidConfig(format!("invalid redis url '{url}': {e}")))?;
        Ok(Self {
            client,
            url,
            timeout: Duration::from_secs(config.timeout_secs),
            connection: OnceCell::new(),
        })
    }

    /// The URL this backend connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connection(&self) -> MemoryResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(0)
                    .set_connection_timeout(self.timeout)
                    .set_response_timeout(self.timeout);
                self.client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| self.unreachable(e))
            })
            .await?;
        Ok(manager.clone())
    }

    fn unreachable(&self, e: RedisError) -> MemoryError {
        MemoryError::Unreachable {
            url: self.url.clone(),
            reason: e.to_string(),
        }
    }

    fn command_error(&self, key: &str, e: RedisError) -> MemoryError {
        if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            self.unreachable(e)
        } else {
            MemoryError::Backend(format!("redis command on '{key}' failed: {e}"))
        }
    }
}

impl std::fmt::Debug for RedisMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisMemory")
            .field("url", &self.url)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

#[async_trait]
impl Memory for RedisMemory {
    async fn setup(&self) -> MemoryResult<()> {
        let mut connection = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| self.unreachable(e))?;
        info!(url = %self.url, reply = %pong, "Redis memory reachable");
        Ok(())
    }

    async fn save(&self, key: &str, value: Value) -> MemoryResult<()> {
        let encoded = serde_json::to_string(&value)?;
        let mut connection = self.connection().await?;
        let () = connection
            .set(key, encoded)
            .await
            .map_err(|e| self.command_error(key, e))?;
        debug!(key = %key, "Saved value");
        Ok(())
    }

    async fn get(&self, key: &str) -> MemoryResult<Option<Value>> {
        let mut connection = self.connection().await?;
        let stored: Option<String> = connection
            .get(key)
            .await
            .map_err(|e| self.command_error(key, e))?;
        match stored {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}

impl ConfigurableMemory for RedisMemory {
    type Config = RedisMemoryConfig;

    const NAME: &'static str = "redis";

    fn from_config(config: Self::Config) -> MemoryResult<Self> {
        Self::new(config)
    }
}
