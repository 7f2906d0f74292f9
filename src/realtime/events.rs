// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire format for realtime events.
//!
//! Events are JSON objects tagged by a snake_case `type` field with
//! camelCase payload keys. Message bodies travel as opaque JSON: the
//! notifier relays what the sending client provides and never
//! interprets it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events a connected client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe to the caller's personal notification room
    JoinUserRoom { user_id: String },
    JoinConversation { conversation_id: String },
    LeaveConversation { conversation_id: String },
    /// Relay a freshly persisted message to the other participant
    SendMessage {
        conversation_id: String,
        message: Value,
        #[serde(default)]
        recipient_id: Option<String>,
        #[serde(default)]
        sender: Option<Value>,
    },
    TypingStart {
        conversation_id: String,
        user_id: String,
        user_name: String,
    },
    TypingStop {
        conversation_id: String,
        user_id: String,
    },
    MessageRead {
        conversation_id: String,
        user_id: String,
        message_ids: Vec<String>,
    },
    /// Tab visibility report, driving the presence state machine
    VisibilityChange { hidden: bool },
    /// Explicit activity ping, for clients with nothing else to send
    Activity,
}

/// Events fanned out to room subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    NewMessage {
        message: Value,
    },
    MessageNotification {
        conversation_id: String,
        message: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender: Option<Value>,
    },
    UserTyping {
        user_id: String,
        user_name: String,
    },
    UserStoppedTyping {
        user_id: String,
    },
    MessagesRead {
        user_id: String,
        message_ids: Vec<String>,
    },
}

/// A broadcast event stamped with the emitting session, so fan-out can
/// skip echoing back to the sender.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: u64,
    pub event: ServerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_snake_type_and_camel_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"typing_start","conversationId":"alex_maria","userId":"maria","userName":"Maria"}"#,
        )
        .unwrap();
        match event {
            ClientEvent::TypingStart {
                conversation_id,
                user_id,
                user_name,
            } => {
                assert_eq!(conversation_id, "alex_maria");
                assert_eq!(user_id, "maria");
                assert_eq!(user_name, "Maria");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn activity_ping_is_a_bare_tag() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"activity"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Activity));
    }

    #[test]
    fn send_message_carries_opaque_payload() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"send_message","conversationId":"alex_maria","message":{"id":"m1","content":"hola"},"recipientId":"alex"}"#,
        )
        .unwrap();
        match event {
            ClientEvent::SendMessage {
                conversation_id,
                message,
                recipient_id,
                sender,
            } => {
                assert_eq!(conversation_id, "alex_maria");
                assert_eq!(message["content"], "hola");
                assert_eq!(recipient_id.as_deref(), Some("alex"));
                assert!(sender.is_none());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn server_events_serialize_with_type_tag() {
        let event = ServerEvent::MessagesRead {
            user_id: "maria".to_string(),
            message_ids: vec!["m1".to_string(), "m2".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messages_read");
        assert_eq!(json["userId"], "maria");
        assert_eq!(json["messageIds"][1], "m2");
    }
}
