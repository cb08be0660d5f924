//! The event model.
//!
//! An [`Event`] is one inbound occurrence from the chat backend, represented as
//! an immutable mapping of field names to JSON values. There is no fixed
//! schema; a console line and a real-time socket frame are both just events,
//! distinguished by their fields (`type`, `text`, `user`, `channel`, ...).
//!
//! A [`Predicate`] selects events by **subset match**: it is satisfied when
//! every one of its fields is present in the event with a structurally equal
//! value. Extra fields in the event are ignored.
//!
//! ```rust
//! use parley_core::{Event, Predicate};
//! use serde_json::json;
//!
//! let event = Event::from_value(json!({
//!     "ok": false,
//!     "error": {"code": -1, "msg": "slow down"},
//!     "reply_to": 3,
//! }))
//! .unwrap();
//!
//! let throttled = Predicate::new()
//!     .field("ok", false)
//!     .field("error", json!({"code": -1, "msg": "slow down"}));
//!
//! assert!(throttled.matches(&event));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// =============================================================================
// Event
// =============================================================================

/// An immutable inbound event.
///
/// Cloning an `Event` is cheap: the field map is shared behind an `Arc` and is
/// never mutated after construction.
#[derive(Clone, PartialEq)]
pub struct Event {
    fields: Arc<Map<String, Value>>,
}

impl Event {
    /// Creates an event from a field map.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields: Arc::new(fields),
        }
    }

    /// Creates an event from a JSON value.
    ///
    /// Returns `None` unless the value is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    /// Creates a plain `message` event, the shape produced by text-only
    /// engines.
    pub fn message(
        text: impl Into<String>,
        user: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::String("message".into()));
        fields.insert("text".into(), Value::String(text.into()));
        fields.insert("user".into(), Value::String(user.into()));
        fields.insert("channel".into(), Value::String(channel.into()));
        Self::new(fields)
    }

    /// Returns the value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the value of a field if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if the field is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the `type` field, if present.
    pub fn event_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Returns the underlying field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the event has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the event as an owned JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.as_ref().clone())
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self.fields.as_ref()) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unprintable event>"),
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::new)
    }
}

// =============================================================================
// Predicate
// =============================================================================

/// A structural subset predicate over events.
///
/// An empty predicate matches every event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicate {
    required: Map<String, Value>,
}

impl Predicate {
    /// Creates an empty predicate (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `key` to be present with a value equal to `value`.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.required.insert(key.into(), value.into());
        self
    }

    /// Shorthand for `Predicate::new().field("type", event_type)`.
    pub fn event_type(event_type: impl Into<String>) -> Self {
        Self::new().field("type", event_type.into())
    }

    /// Creates a predicate from a JSON value.
    ///
    /// Returns `None` unless the value is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(required) => Some(Self { required }),
            _ => None,
        }
    }

    /// Returns the required fields.
    pub fn required(&self) -> &Map<String, Value> {
        &self.required
    }

    /// Returns `true` if every required field is present in `event` with an
    /// equal value.
    ///
    /// Equality is structural: nested objects and arrays compare by value.
    pub fn matches(&self, event: &Event) -> bool {
        self.required
            .iter()
            .all(|(key, expected)| event.get(key) == Some(expected))
    }
}

impl From<Map<String, Value>> for Predicate {
    fn from(required: Map<String, Value>) -> Self {
        Self { required }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.required) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<unprintable predicate>"),
        }
    }
}
