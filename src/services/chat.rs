// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation and message operations.
//!
//! Conversations are gated on an existing match and keyed by the
//! canonical pair ID, so creating one is idempotent. Listing derives
//! from the user's match mirror, which is why a destroyed match (block)
//! hides the conversation without deleting its history.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{
    pair_id, Conversation, ConversationView, Message, MessageSender, MessageView, ProfileCard,
    User,
};
use crate::time_utils::now_rfc3339;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct ChatService {
    db: FirestoreDb,
}

impl ChatService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Open the conversation with a matched user, creating it on first
    /// contact.
    pub async fn get_or_create_conversation(
        &self,
        current: &User,
        participant_id: &str,
    ) -> Result<ConversationView, AppError> {
        if !current.has_matched(participant_id) {
            return Err(AppError::Forbidden(
                "You can only chat with your matches".to_string(),
            ));
        }

        let id = pair_id(&current.uid, participant_id);
        let conversation = match self.db.get_conversation(&id).await? {
            Some(existing) => existing,
            None => {
                let created = Conversation::new(&current.uid, participant_id, now_rfc3339());
                self.db.upsert_conversation(&created).await?;
                tracing::info!(conversation = %created.id, "Conversation created");
                created
            }
        };

        let participants = self.participant_cards(&conversation).await?;
        Ok(ConversationView::from_conversation(conversation, participants))
    }

    /// All conversations for the user's current matches, most recent
    /// activity first.
    pub async fn list_conversations(
        &self,
        current: &User,
    ) -> Result<Vec<ConversationView>, AppError> {
        let mut conversations = Vec::new();
        for other in &current.matches {
            let id = pair_id(&current.uid, other);
            if let Some(conversation) = self.db.get_conversation(&id).await? {
                conversations.push(conversation);
            }
        }
        conversations.sort_by(|a, b| b.last_message_date.cmp(&a.last_message_date));

        let mut views = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let participants = self.participant_cards(&conversation).await?;
            views.push(ConversationView::from_conversation(conversation, participants));
        }
        Ok(views)
    }

    /// One page of messages, oldest first within the page.
    ///
    /// Pages are counted from the newest message, so page 1 is the most
    /// recent `limit` messages.
    pub async fn list_messages(
        &self,
        current: &User,
        conversation_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<MessageView>, AppError> {
        let conversation = self.load_for(&current.uid, conversation_id).await?;

        let offset = (page - 1) * limit;
        let mut messages = self
            .db
            .get_messages_page(&conversation.id, limit, offset)
            .await?;
        messages.reverse();

        let sender_ids: Vec<String> = {
            let mut ids: Vec<String> = messages.iter().map(|m| m.sender.clone()).collect();
            ids.sort();
            ids.dedup();
            ids
        };
        let senders = self.db.get_users_by_ids(&sender_ids).await?;

        let views = messages
            .into_iter()
            .map(|message| {
                let sender = senders
                    .iter()
                    .find(|u| u.uid == message.sender)
                    .map(MessageSender::from)
                    .unwrap_or_else(|| MessageSender {
                        id: message.sender.clone(),
                        name: String::new(),
                        profile_photo: None,
                    });
                MessageView::from_message(message, sender)
            })
            .collect();
        Ok(views)
    }

    /// Persist a message and refresh the conversation preview.
    pub async fn send_message(
        &self,
        current: &User,
        conversation_id: &str,
        content: &str,
        content_type: Option<String>,
    ) -> Result<MessageView, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest(
                "Message content is required".to_string(),
            ));
        }
        if content.chars().count() > 1000 {
            return Err(AppError::BadRequest(
                "Message must be between 1 and 1000 characters".to_string(),
            ));
        }

        let mut conversation = self.load_for(&current.uid, conversation_id).await?;
        let recipient = conversation
            .other_participant(&current.uid)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "conversation {} has no second participant",
                    conversation.id
                ))
            })?
            .to_string();

        let now = now_rfc3339();
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation: conversation.id.clone(),
            sender: current.uid.clone(),
            recipient,
            content: content.to_string(),
            content_type: content_type.unwrap_or_else(|| "text".to_string()),
            created_at: now.clone(),
            is_read: false,
            read_at: None,
        };
        self.db.set_message(&message).await?;

        conversation.last_message = Some(message.id.clone());
        conversation.last_message_text = message.content.clone();
        conversation.last_message_date = now.clone();
        self.db.upsert_conversation(&conversation).await?;

        // Keep the match record's preview in sync; the match may be
        // gone if one side blocked after this conversation started.
        if let Some(mut match_record) = self
            .db
            .get_match(&conversation.participants[0], &conversation.participants[1])
            .await?
        {
            match_record.last_message = Some(message.id.clone());
            match_record.last_message_at = Some(now);
            self.db.set_match(&match_record).await?;
        }

        Ok(MessageView::from_message(message, MessageSender::from(current)))
    }

    /// Mark every unread message addressed to the current user in this
    /// conversation as read. Returns how many were marked.
    pub async fn mark_read(
        &self,
        current: &User,
        conversation_id: &str,
    ) -> Result<usize, AppError> {
        let conversation = self.load_for(&current.uid, conversation_id).await?;

        let unread = self
            .db
            .get_unread_messages(&conversation.id, &current.uid)
            .await?;
        if unread.is_empty() {
            return Ok(0);
        }

        self.db.mark_messages_read(&unread, &now_rfc3339()).await?;
        Ok(unread.len())
    }

    /// Total unread messages for the user across all conversations.
    pub async fn unread_count(&self, uid: &str) -> Result<usize, AppError> {
        self.db.count_unread(uid).await
    }

    /// Fetch a conversation and check the caller participates in it.
    async fn load_for(
        &self,
        uid: &str,
        conversation_id: &str,
    ) -> Result<Conversation, AppError> {
        let Some(conversation) = self.db.get_conversation(conversation_id).await? else {
            return Err(AppError::NotFound("Conversation not found".to_string()));
        };
        if !conversation.includes(uid) {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        Ok(conversation)
    }

    async fn participant_cards(
        &self,
        conversation: &Conversation,
    ) -> Result<Vec<ProfileCard>, AppError> {
        let users = self.db.get_users_by_ids(&conversation.participants).await?;
        Ok(users.iter().map(ProfileCard::from).collect())
    }
}
