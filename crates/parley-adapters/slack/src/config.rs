//! Configuration types for the Slack engine.

use serde::{Deserialize, Serialize};

/// Slack engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token. Falls back to the `SLACK_TOKEN` environment variable.
    pub token: Option<String>,

    /// Web API base URL.
    pub api_base: String,

    /// Web API method that returns the real-time socket URL.
    pub connect_method: String,

    /// Receiver for interactive button actions (disabled when absent).
    pub webhook: Option<WebhookConfig>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://slack.com/api".to_string(),
            connect_method: "rtm.start".to_string(),
            webhook: None,
        }
    }
}

/// Button action receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Address to listen on.
    pub bind: String,
    /// Route Slack posts actions to.
    pub path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            path: "/slack-button-action".to_string(),
        }
    }
}
