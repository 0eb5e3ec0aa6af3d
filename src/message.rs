//! Message protocol definitions
//!
//! JSON wire format for the room:
//! - clients send `{"message": "..."}`
//! - the room delivers `{"name", "message", "when", "avatar_url"}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client → Room frame
///
/// Only the body is trusted from the client. Everything else is stamped
/// by the read pump.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InboundMessage {
    pub message: String,
}

impl InboundMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One broadcast unit
///
/// Built once per inbound frame and shared behind an `Arc` by every
/// mailbox it is delivered to. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender display name
    pub name: String,
    /// Body text
    pub message: String,
    /// Time the read pump received the frame
    pub when: DateTime<Utc>,
    /// Sender avatar reference (empty when lookup failed)
    pub avatar_url: String,
}

impl Message {
    /// Stamp an inbound frame with sender details and the current time
    pub fn stamp(inbound: InboundMessage, name: impl Into<String>, avatar_url: String) -> Self {
        Self {
            name: name.into(),
            message: inbound.message,
            when: Utc::now(),
            avatar_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_deserialize() {
        let json = r#"{"message": "hello"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message, "hello");
    }

    #[test]
    fn test_inbound_message_requires_body() {
        let result = serde_json::from_str::<InboundMessage>(r#"{"text": "hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_message_serialize() {
        let msg = Message::stamp(
            InboundMessage::new("hi"),
            "Alice",
            "//example.com/a.png".to_string(),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"name\":\"Alice\""));
        assert!(json.contains("\"message\":\"hi\""));
        assert!(json.contains("\"avatar_url\":\"//example.com/a.png\""));
        assert!(json.contains("\"when\":\""));
    }
}
