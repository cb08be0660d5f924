//! Memory contract.
//!
//! Handlers use a [`Memory`] backend to keep state across invocations (the
//! last random number drawn, a counter, ...). Values are JSON so that every
//! backend can store them without knowing handler types; [`MemoryExt`] adds
//! typed access on top.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::foundation::error::MemoryResult;

/// Key/value persistence used by handlers.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Backend-specific setup, run once at startup.
    ///
    /// Remote backends verify connectivity here so that an unreachable store
    /// stops the process before any event is handled.
    async fn setup(&self) -> MemoryResult<()> {
        Ok(())
    }

    /// Stores `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: Value) -> MemoryResult<()>;

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> MemoryResult<Option<Value>>;

    /// Returns the value stored under `key`, or `default` when absent.
    async fn get_or(&self, key: &str, default: Value) -> MemoryResult<Value> {
        Ok(self.get(key).await?.unwrap_or(default))
    }
}

/// A shared memory trait object.
pub type BoxedMemory = Arc<dyn Memory>;

/// Typed helpers over [`Memory`].
#[async_trait]
pub trait MemoryExt: Memory {
    /// Serializes and stores `value`.
    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T) -> MemoryResult<()> {
        self.save(key, serde_json::to_value(value)?).await
    }

    /// Loads and deserializes the value stored under `key`.
    async fn load<T: DeserializeOwned>(&self, key: &str) -> MemoryResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl<M: Memory + ?Sized> MemoryExt for M {}

/// A memory backend that can be constructed by name from configuration.
pub trait ConfigurableMemory: Memory + Sized + 'static {
    /// The backend configuration type.
    type Config: DeserializeOwned + Default + Send;

    /// The name used to select this backend.
    const NAME: &'static str;

    /// Creates the backend from its configuration.
    fn from_config(config: Self::Config) -> MemoryResult<Self>;
}
