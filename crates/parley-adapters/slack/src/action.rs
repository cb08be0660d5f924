//! Interactive button actions.
//!
//! Slack posts a form with a single `payload` field holding JSON. It becomes
//! an event shaped so that both plain listeners and the chat view work:
//!
//! ```text
//! {type: "message-action", callback_id, user, channel, text: "", payload}
//! ```

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{info, warn};

use parley_core::Event;

/// Event type of button actions.
pub const BUTTON_ACTION_TYPE: &str = "message-action";

/// Converts the form fields of a button action POST into an event.
///
/// Returns `None` when the payload is missing or malformed.
pub fn button_action_event(fields: HashMap<String, String>) -> Option<Event> {
    let raw = fields.get("payload")?;
    let payload: Value = match serde_json::from_str(raw) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Button action payload is not JSON");
            return None;
        }
    };

    let id_of = |key: &str| payload.get(key)?.get("id")?.as_str().map(str::to_string);
    let (Some(user), Some(channel)) = (id_of("user"), id_of("channel")) else {
        warn!("Button action payload lacks user or channel");
        return None;
    };
    let callback_id = payload
        .get("callback_id")
        .cloned()
        .unwrap_or(Value::Null);

    info!(callback_id = %callback_id, "Received a button action");

    let mut fields = Map::new();
    fields.insert("type".into(), Value::from(BUTTON_ACTION_TYPE));
    fields.insert("callback_id".into(), callback_id);
    fields.insert("user".into(), Value::from(user));
    fields.insert("channel".into(), Value::from(channel));
    fields.insert("text".into(), Value::from(""));
    fields.insert("payload".into(), payload);
    Some(Event::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(payload: &str) -> HashMap<String, String> {
        HashMap::from([("payload".to_string(), payload.to_string())])
    }

    #[test]
    fn test_payload_becomes_action_event() {
        let payload = json!({
            "callback_id": "coffee_order",
            "user": {"id": "U1", "name": "ada"},
            "channel": {"id": "C1"},
            "actions": [{"name": "size", "value": "large"}]
        });
        let event = button_action_event(form(&payload.to_string())).unwrap();

        assert_eq!(event.event_type(), Some(BUTTON_ACTION_TYPE));
        assert_eq!(event.get_str("callback_id"), Some("coffee_order"));
        assert_eq!(event.get_str("user"), Some("U1"));
        assert_eq!(event.get_str("channel"), Some("C1"));
        assert_eq!(event.get_str("text"), Some(""));
        assert_eq!(event.get("payload"), Some(&payload));
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert!(button_action_event(HashMap::new()).is_none());
        assert!(button_action_event(form("not json")).is_none());
        assert!(button_action_event(form(r#"{"user": {"id": "U1"}}"#)).is_none());
    }
}
