// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage with relationship mirrors)
//! - Hearts / Passes / Blocks (directed edge collections)
//! - Matches (pair-keyed mutual edges)
//! - Conversations and Messages (chat storage)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    directed_id, pair_id, Block, Conversation, Heart, Match, Message, Pass, PresenceUpdate, User,
};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All write operations will return service-unavailable if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Whether the store is unreachable. The auth middleware turns this
    /// into a 503 before any handler runs.
    pub fn is_offline(&self) -> bool {
        self.client.is_none()
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Firestore not available".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by uid.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch every user profile.
    ///
    /// Discovery filters in memory over the full collection, which is
    /// fine at current scale. Revisit with a queryable index once the
    /// user count makes this scan noticeable.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch several users by uid concurrently, skipping missing docs.
    ///
    /// Used to expand id lists (matches, participants, blocked) into
    /// profile cards without serializing the reads.
    pub async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        let client = self.get_client()?;

        let results = stream::iter(ids.to_vec())
            .map(|id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::USERS)
                    .obj::<User>()
                    .one(&id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        // Deleted accounts are silently dropped; restore the input order
        // since buffer_unordered completes in arbitrary order.
        let mut found: Vec<User> = results.into_iter().flatten().collect();
        found.sort_by_key(|user| ids.iter().position(|id| *id == user.uid));
        Ok(found)
    }

    /// Write the presence fields of a user document.
    ///
    /// Reads, patches and rewrites the profile so concurrent profile
    /// updates are not clobbered by a stale full-document write.
    pub async fn update_presence(
        &self,
        uid: &str,
        update: &PresenceUpdate,
    ) -> Result<(), AppError> {
        let Some(mut user) = self.get_user(uid).await? else {
            return Err(AppError::NotFound(format!("User {uid} not found")));
        };
        user.online_status = update.online_status;
        user.is_online = update.is_online;
        user.last_active = update.last_active.clone();
        self.upsert_user(&user).await
    }

    // ─── Heart / Pass / Block Edges ──────────────────────────────

    /// Get a heart edge by direction.
    pub async fn get_heart(&self, from: &str, to: &str) -> Result<Option<Heart>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::HEARTS)
            .obj()
            .one(&directed_id(from, to))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a heart edge.
    pub async fn set_heart(&self, heart: &Heart) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::HEARTS)
            .document_id(heart.doc_id())
            .object(heart)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a pass edge.
    pub async fn set_pass(&self, pass: &Pass) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PASSES)
            .document_id(directed_id(&pass.from_user_id, &pass.to_user_id))
            .object(pass)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a block edge.
    pub async fn set_block(&self, block: &Block) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BLOCKS)
            .document_id(directed_id(&block.from_user_id, &block.to_user_id))
            .object(block)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a block edge (unblock).
    pub async fn delete_block(&self, from: &str, to: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::BLOCKS)
            .document_id(directed_id(from, to))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Match Operations ────────────────────────────────────────

    /// Get the match record for a pair, if any.
    pub async fn get_match(&self, a: &str, b: &str) -> Result<Option<Match>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MATCHES)
            .obj()
            .one(&pair_id(a, b))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a match record.
    pub async fn set_match(&self, match_record: &Match) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MATCHES)
            .document_id(match_record.doc_id())
            .object(match_record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete the match record for a pair (used on block).
    pub async fn delete_match(&self, a: &str, b: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::MATCHES)
            .document_id(pair_id(a, b))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Atomic Match Completion ─────────────────────────────────

    /// Atomically complete a mutual match: write the match record and
    /// flip both heart edges to matched.
    ///
    /// A Firestore transaction keeps the three writes together, so a
    /// crash can never leave one heart matched while the match record
    /// is missing. The user-document match mirrors are updated outside
    /// the transaction by the caller; those updates are idempotent and
    /// safe to retry.
    pub async fn complete_match_atomic(
        &self,
        match_record: &Match,
        hearts: &[Heart],
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::MATCHES)
            .document_id(match_record.doc_id())
            .object(match_record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add match to transaction: {}", e)))?;

        for heart in hearts {
            client
                .fluent()
                .update()
                .in_col(collections::HEARTS)
                .document_id(heart.doc_id())
                .object(heart)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add heart to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    // ─── Conversation Operations ─────────────────────────────────

    /// Get a conversation by its pair-sorted ID.
    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONVERSATIONS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a conversation.
    pub async fn upsert_conversation(&self, conversation: &Conversation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONVERSATIONS)
            .document_id(&conversation.id)
            .object(conversation)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Message Operations ──────────────────────────────────────

    /// Store a message.
    pub async fn set_message(&self, message: &Message) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MESSAGES)
            .document_id(&message.id)
            .object(message)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get one page of messages for a conversation, newest first.
    pub async fn get_messages_page(
        &self,
        conversation_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, AppError> {
        let conversation_id = conversation_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MESSAGES)
            .filter(move |q| q.field("conversation").eq(conversation_id.clone()))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get every unread message addressed to `recipient` in a conversation.
    pub async fn get_unread_messages(
        &self,
        conversation_id: &str,
        recipient: &str,
    ) -> Result<Vec<Message>, AppError> {
        let conversation_id = conversation_id.to_string();
        let recipient = recipient.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MESSAGES)
            .filter(move |q| {
                q.for_all([
                    q.field("conversation").eq(conversation_id.clone()),
                    q.field("recipient").eq(recipient.clone()),
                    q.field("isRead").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count unread messages addressed to a user across all conversations.
    pub async fn count_unread(&self, recipient: &str) -> Result<usize, AppError> {
        let recipient = recipient.to_string();
        let unread: Vec<Message> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::MESSAGES)
            .filter(move |q| {
                q.for_all([
                    q.field("recipient").eq(recipient.clone()),
                    q.field("isRead").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(unread.len())
    }

    /// Mark a set of messages read, in transaction-sized chunks.
    pub async fn mark_messages_read(
        &self,
        messages: &[Message],
        read_at: &str,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in messages.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for message in chunk {
                let mut updated = message.clone();
                updated.is_read = true;
                updated.read_at = Some(read_at.to_string());

                client
                    .fluent()
                    .update()
                    .in_col(collections::MESSAGES)
                    .document_id(&updated.id)
                    .object(&updated)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add read receipt to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit read receipts: {}", e)))?;
        }

        Ok(())
    }
}
