//! Message envelope and persisted record types.

use serde::{Deserialize, Serialize};

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Attachment,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Attachment => "attachment",
        }
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        match value {
            "attachment" => MessageKind::Attachment,
            _ => MessageKind::Text,
        }
    }
}

/// Transient message as submitted by a client, before persistence.
///
/// The `client_id` is the caller's correlation id; it travels back to the
/// origin inside the acknowledgment and is never broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub chat_id: String,
    pub sender_id: String,
    pub kind: MessageKind,
    pub content: String,
    pub client_id: Option<String>,
}

/// Authoritative form of a message as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: String,
}
