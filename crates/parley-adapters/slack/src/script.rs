//! Slack-specific listeners.

use serde_json::json;
use tracing::warn;

use parley_core::{Event, Predicate};
use parley_framework::{Bot, BoxedScript, HandlerResult, script};

use crate::engine::SlackEngine;

const SLOW_DOWN_MSG: &str = "slow down, too many messages...";

/// Matches Slack's rate-limit warning frame.
pub fn throttle_predicate() -> Predicate {
    Predicate::new()
        .field("ok", false)
        .field("error", json!({"code": -1, "msg": SLOW_DOWN_MSG}))
}

async fn on_throttle(bot: Bot, _event: Event) -> HandlerResult {
    warn!("Detected a slow-down warning");
    match bot.engine().as_any().downcast_ref::<SlackEngine>() {
        Some(slack) => slack.mark_throttled(),
        None => warn!(engine = bot.engine().name(), "Slow-down warning on a non-Slack engine"),
    }
    Ok(())
}

/// Registers the listeners every Slack bot wants.
pub fn slack_script() -> BoxedScript {
    script("slack", |bot: &Bot| {
        bot.on(throttle_predicate())
            .name("slack throttle")
            .handle(on_throttle);
        Ok(())
    })
}
