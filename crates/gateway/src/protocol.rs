//! Wire protocol: inbound events received from WebSocket clients.
//!
//! Outbound events are the realtime crate's `ServerEvent`s, serialised
//! with the same `type`-tagged snake_case convention.

use serde::{Deserialize, Serialize};

use intercom_realtime::MessageKind;

/// Client events received from WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat to keep connection alive
    Ping,
    /// Send a message
    SendMessage {
        chat_id: String,
        #[serde(default)]
        kind: MessageKind,
        content: String,
        /// Client-generated correlation id for reconciling the optimistic
        /// local copy with the authoritative record.
        correlation_id: Option<String>,
    },
    /// Delete a message (soft delete; any participant may do this)
    DeleteMessage {
        chat_id: String,
        message_id: String,
    },
    /// Edit a message's content
    EditMessage {
        chat_id: String,
        message_id: String,
        content: String,
    },
    /// React to a message
    React {
        chat_id: String,
        message_id: String,
        reaction: String,
    },
    /// Typing indicator started / refreshed
    TypingStart {
        chat_id: String,
    },
    /// Typing indicator explicitly stopped
    TypingStop {
        chat_id: String,
    },
    /// Mark one message read
    MarkRead {
        chat_id: String,
        message_id: String,
    },
    /// Mark the whole chat read
    MarkReadAll {
        chat_id: String,
    },
    /// Delivery signal for a received message
    Delivered {
        chat_id: String,
        message_id: String,
    },
    /// Ask whether a user is currently online
    QueryStatus {
        user_id: String,
    },
    /// Log out: forced offline plus teardown of every connection
    Logout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_parses_with_defaults() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","chat_id":"c1","content":"hi","correlation_id":"x1"}"#,
        )
        .unwrap();

        match event {
            ClientEvent::SendMessage {
                chat_id,
                kind,
                content,
                correlation_id,
            } => {
                assert_eq!(chat_id, "c1");
                assert_eq!(kind, MessageKind::Text);
                assert_eq!(content, "hi");
                assert_eq!(correlation_id.as_deref(), Some("x1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_is_a_parse_error() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type":"mark_read","chat_id":"c1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn typing_and_logout_round_trip() {
        for json in [
            r#"{"type":"typing_start","chat_id":"c1"}"#,
            r#"{"type":"typing_stop","chat_id":"c1"}"#,
            r#"{"type":"logout"}"#,
            r#"{"type":"ping"}"#,
        ] {
            let event: ClientEvent = serde_json::from_str(json).unwrap();
            let back = serde_json::to_string(&event).unwrap();
            let again: ClientEvent = serde_json::from_str(&back).unwrap();
            assert_eq!(
                serde_json::to_value(&event).unwrap(),
                serde_json::to_value(&again).unwrap()
            );
        }
    }

    #[test]
    fn attachment_kind_parses() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","chat_id":"c1","kind":"attachment","content":"https://cdn/x.png","correlation_id":null}"#,
        )
        .unwrap();
        match event {
            ClientEvent::SendMessage { kind, .. } => assert_eq!(kind, MessageKind::Attachment),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
