//! Ephemeral in-process memory.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;

use parley_core::{ConfigurableMemory, Memory, MemoryResult};

/// Configuration for [`MemoryDict`]. It has no settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryDictConfig {}

/// Stores values in a map that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryDict {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryDict {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Memory for MemoryDict {
    async fn save(&self, key: &str, value: Value) -> MemoryResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> MemoryResult<Option<Value>> {
        Ok(self.values.read().get(key).cloned())
    }
}

impl ConfigurableMemory for MemoryDict {
    type Config = MemoryDictConfig;

    const NAME: &'static str = "dict";

    fn from_config(_config: Self::Config) -> MemoryResult<Self> {
        Ok(Self::new())
    }
}
