//! Configuration types for the console engine.

use serde::{Deserialize, Serialize};

/// Console engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Prompt printed before each line is read.
    pub prompt: String,
    /// User identifier attached to every line.
    pub user: String,
    /// Channel identifier attached to every line.
    pub channel: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "\x1b[4mParley\x1b[0m> ".to_string(),
            user: "User".to_string(),
            channel: "CLI".to_string(),
        }
    }
}
