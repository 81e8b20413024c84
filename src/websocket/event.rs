use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// The closed set of event kinds a subscriber can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A pushed user notification (`"type": "notification"` on the wire).
    Notification,
    /// Emitted locally once the reconnection budget is exhausted. Never
    /// parsed from an inbound frame. Payload: `{"attempts": <u32>}`.
    ConnectionLost,
}

impl EventKind {
    /// Maps an inbound envelope tag to a kind. Local-only kinds and unknown
    /// tags yield `None`.
    pub fn from_wire(tag: &str) -> Option<Self> {
        match tag {
            "notification" => Some(EventKind::Notification),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Notification => "notification",
            EventKind::ConnectionLost => "connection_lost",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound `{ "type": ..., "data": ... }` frame.
///
/// Some server builds put the payload under `notification` instead of `data`;
/// both are accepted. A frame without any payload carries `Value::Null`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, alias = "notification")]
    pub data: Value,
}

impl Envelope {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
