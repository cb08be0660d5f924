//! # Parley Slack Engine
//!
//! Connects Parley to Slack's real-time messaging API.
//!
//! ## Overview
//!
//! - `setup` authenticates over the Web API (`rtm.start` by default) and opens
//!   the real-time WebSocket.
//! - Every JSON object received on the socket becomes one event, unchanged.
//! - Replies go out over the same socket; reactions use `reactions.add`.
//! - An optional webhook receives interactive button clicks and queues them
//!   as `message-action` events, which are yielded ahead of socket traffic.
//!
//! ## Configuration
//!
//! ```toml
//! engine = "slack"
//!
//! [engines.slack]
//! # Falls back to the SLACK_TOKEN environment variable.
//! token = "xoxb-..."
//!
//! [engines.slack.webhook]
//! bind = "0.0.0.0:8000"
//! path = "/slack-button-action"
//! ```
//!
//! ## Scripts
//!
//! [`slack_script`] registers the Slack-specific listeners (rate-limit
//! warnings); add it next to your own scripts when running on Slack.

mod action;
mod config;
mod engine;
mod script;

pub use action::{BUTTON_ACTION_TYPE, button_action_event};
pub use config::{SlackConfig, WebhookConfig};
pub use engine::{SlackEngine, SlackIdentity};
pub use script::{slack_script, throttle_predicate};
