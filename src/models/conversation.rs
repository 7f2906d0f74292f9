// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Conversation and message models for storage and API.

use serde::{Deserialize, Serialize};

use super::user::{ProfileCard, User};

/// A conversation between two matched users.
///
/// The document ID is the pair-sorted participant ID, which makes
/// get-or-create naturally idempotent. Conversations are never deleted;
/// blocking hides them from listings but keeps the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Pair-sorted participant ID (also used as document ID)
    pub id: String,
    /// The two participant uids, sorted
    pub participants: Vec<String>,
    pub created_at: String,
    /// ID of the most recent message, if any
    pub last_message: Option<String>,
    /// Cached preview text of the most recent message
    pub last_message_text: String,
    pub last_message_date: String,
    pub is_active: bool,
}

impl Conversation {
    pub fn new(a: &str, b: &str, created_at: String) -> Self {
        let mut participants = vec![a.to_string(), b.to_string()];
        participants.sort();
        let id = super::heart::pair_id(a, b);
        Self {
            id,
            participants,
            last_message: None,
            last_message_text: String::new(),
            last_message_date: created_at.clone(),
            created_at,
            is_active: true,
        }
    }

    pub fn includes(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        self.participants
            .iter()
            .find(|p| p.as_str() != user_id)
            .map(|p| p.as_str())
    }
}

/// A chat message stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID (also used as document ID)
    pub id: String,
    /// Conversation this message belongs to
    pub conversation: String,
    /// Sender uid
    pub sender: String,
    /// Recipient uid (the other participant at send time)
    pub recipient: String,
    pub content: String,
    /// Content type tag ("text" unless the client says otherwise)
    pub content_type: String,
    pub created_at: String,
    pub is_read: bool,
    #[serde(default)]
    pub read_at: Option<String>,
}

/// Sender snapshot embedded in message API payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: String,
    pub name: String,
    pub profile_photo: Option<String>,
}

impl From<&User> for MessageSender {
    fn from(user: &User) -> Self {
        Self {
            id: user.uid.clone(),
            name: user.name.clone(),
            profile_photo: user.profile_photo.clone(),
        }
    }
}

/// A message as returned by the API, with the sender expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub conversation: String,
    pub sender: MessageSender,
    pub recipient: String,
    pub content: String,
    pub content_type: String,
    pub created_at: String,
    pub is_read: bool,
    pub read_at: Option<String>,
}

impl MessageView {
    pub fn from_message(message: Message, sender: MessageSender) -> Self {
        Self {
            id: message.id,
            conversation: message.conversation,
            sender,
            recipient: message.recipient,
            content: message.content,
            content_type: message.content_type,
            created_at: message.created_at,
            is_read: message.is_read,
            read_at: message.read_at,
        }
    }
}

/// A conversation as returned by the API, participants expanded to cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: String,
    pub participants: Vec<ProfileCard>,
    pub created_at: String,
    pub last_message: Option<String>,
    pub last_message_text: String,
    pub last_message_date: String,
    pub is_active: bool,
}

impl ConversationView {
    pub fn from_conversation(conversation: Conversation, participants: Vec<ProfileCard>) -> Self {
        Self {
            id: conversation.id,
            participants,
            created_at: conversation.created_at,
            last_message: conversation.last_message,
            last_message_text: conversation.last_message_text,
            last_message_date: conversation.last_message_date,
            is_active: conversation.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_order_independent() {
        let now = "2026-02-01T10:00:00.000Z".to_string();
        let a = Conversation::new("maria", "alex", now.clone());
        let b = Conversation::new("alex", "maria", now);
        assert_eq!(a.id, b.id);
        assert_eq!(a.participants, vec!["alex", "maria"]);
    }

    #[test]
    fn other_participant_finds_the_peer() {
        let conv = Conversation::new("maria", "alex", "2026-02-01T10:00:00.000Z".to_string());
        assert_eq!(conv.other_participant("maria"), Some("alex"));
        assert_eq!(conv.other_participant("alex"), Some("maria"));
    }
}
