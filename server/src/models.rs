//! Core chat data types and the wire frames exchanged over the live channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order-independent identifier for the conversation between two users.
///
/// `ChatKey::new(a, b) == ChatKey::new(b, a)` for all `a`, `b`, so history
/// and presence lookups are symmetric regardless of who is sender and who is
/// recipient. Rendered as `chat:{lo}:{hi}`, the format the history backend
/// uses as its list key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatKey {
    lo: i64,
    hi: i64,
}

impl ChatKey {
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }
}

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat:{}:{}", self.lo, self.hi)
    }
}

/// A single stored chat message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub from: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_username: Option<String>,
    pub to: i64,
    pub message: String,
    /// Second-resolution epoch timestamp.
    pub timestamp: i64,
}

/// The payload delivered to live sessions during fan-out.
///
/// `to` is intentionally omitted: the recipient's identity is implicit in
/// channel ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFrame {
    pub from: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_username: Option<String>,
    pub message: String,
    pub timestamp: i64,
}

impl DeliveryFrame {
    pub fn from_record(record: &MessageRecord) -> Self {
        Self {
            from: record.from,
            from_username: record.from_username.clone(),
            message: record.message.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Structured error frame sent to a client over the live channel for
/// recoverable conditions. Internal error text never lands in `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
    pub message: String,
}

impl ErrorFrame {
    pub fn new(kind: &str, message: &str) -> Self {
        Self {
            error: kind.to_string(),
            message: message.to_string(),
        }
    }
}
