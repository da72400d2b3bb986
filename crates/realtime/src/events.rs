//! Outbound events pushed to live connections.

use serde::{Deserialize, Serialize};

use crate::message::MessageRecord;

/// Online/offline status derived from connection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

/// Server events sent to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Welcome message after successful connection
    Hello {
        user_id: String,
        connection_id: String,
    },
    /// Heartbeat response
    Pong,
    /// A co-member's presence changed (broadcast on the 0→1 / 1→0 edges only)
    StatusChanged {
        user_id: String,
        status: PresenceStatus,
    },
    /// Point-to-point answer to a status query; never broadcast
    StatusResponse {
        user_id: String,
        status: PresenceStatus,
    },
    /// New message, in its persisted authoritative form
    MessageNew {
        message: MessageRecord,
    },
    /// Message was deleted
    MessageDeleted {
        chat_id: String,
        message_id: String,
        deleted_by: String,
    },
    /// Message content was edited
    MessageEdited {
        message: MessageRecord,
    },
    /// Reaction added to a message
    MessageReaction {
        chat_id: String,
        message_id: String,
        user_id: String,
        reaction: String,
    },
    /// User started typing
    TypingStart {
        chat_id: String,
        user_id: String,
        name: String,
    },
    /// User stopped typing (explicit stop or expiry)
    TypingStop {
        chat_id: String,
        user_id: String,
        name: String,
    },
    /// A participant read a message
    MessageRead {
        chat_id: String,
        message_id: String,
        reader_id: String,
    },
    /// A participant read the whole chat (single aggregate notice)
    ReadAll {
        chat_id: String,
        reader_id: String,
    },
    /// Delivery signal, broadcast only, never persisted
    Delivered {
        chat_id: String,
        message_id: String,
    },
    /// Result of a state-changing operation, sent to the originator only
    Ack {
        correlation_id: Option<String>,
        success: bool,
        message_id: Option<String>,
        error: Option<String>,
    },
    /// Error response for frames that never reached an operation
    Error {
        error: String,
        message: String,
    },
}

impl ServerEvent {
    /// Get event type name for logging/metrics
    pub fn event_type_name(&self) -> &'static str {
        match self {
            ServerEvent::Hello { .. } => "hello",
            ServerEvent::Pong => "pong",
            ServerEvent::StatusChanged { .. } => "status_changed",
            ServerEvent::StatusResponse { .. } => "status_response",
            ServerEvent::MessageNew { .. } => "message_new",
            ServerEvent::MessageDeleted { .. } => "message_deleted",
            ServerEvent::MessageEdited { .. } => "message_edited",
            ServerEvent::MessageReaction { .. } => "message_reaction",
            ServerEvent::TypingStart { .. } => "typing_start",
            ServerEvent::TypingStop { .. } => "typing_stop",
            ServerEvent::MessageRead { .. } => "message_read",
            ServerEvent::ReadAll { .. } => "read_all",
            ServerEvent::Delivered { .. } => "delivered",
            ServerEvent::Ack { .. } => "ack",
            ServerEvent::Error { .. } => "error",
        }
    }

    /// Successful acknowledgment for the originating caller.
    pub fn ack_success(correlation_id: Option<String>, message_id: Option<String>) -> Self {
        ServerEvent::Ack {
            correlation_id,
            success: true,
            message_id,
            error: None,
        }
    }

    /// Failed acknowledgment carrying the error text.
    pub fn ack_failure(correlation_id: Option<String>, error: impl Into<String>) -> Self {
        ServerEvent::Ack {
            correlation_id,
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = ServerEvent::StatusChanged {
            user_id: "u1".to_string(),
            status: PresenceStatus::Online,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "online");
    }

    #[test]
    fn ack_helpers_set_success_flag() {
        let ok = ServerEvent::ack_success(Some("c1".to_string()), Some("m1".to_string()));
        let err = ServerEvent::ack_failure(None, "store unavailable");

        match ok {
            ServerEvent::Ack { success, message_id, .. } => {
                assert!(success);
                assert_eq!(message_id.as_deref(), Some("m1"));
            }
            _ => panic!("expected ack"),
        }
        match err {
            ServerEvent::Ack { success, error, .. } => {
                assert!(!success);
                assert!(error.unwrap().contains("unavailable"));
            }
            _ => panic!("expected ack"),
        }
    }
}
