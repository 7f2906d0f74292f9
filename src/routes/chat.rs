// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversation and message routes.
//!
//! Unlike the user routes these return bare objects and arrays without a
//! `success` envelope, matching what chat clients consume.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ConversationView, MessageView};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 50;
const MAX_PAGE: u32 = 1000;
const MAX_LIMIT: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/chat/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/chat/conversations/{conversation_id}/messages",
            get(list_messages).post(send_message),
        )
        .route(
            "/api/chat/conversations/{conversation_id}/read",
            put(mark_read),
        )
        .route("/api/chat/unread-count", get(unread_count))
}

// ─── Conversations ───────────────────────────────────────────

/// All of the caller's conversations, most recent first.
async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ConversationView>>> {
    let conversations = state.chat.list_conversations(&auth.user).await?;
    Ok(Json(conversations))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub participant_id: Option<String>,
}

/// Open (or create) the conversation with a matched user.
async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<ConversationView>> {
    let participant_id = match request.participant_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            return Err(AppError::BadRequest(
                "Participant ID is required".to_string(),
            ))
        }
    };

    let conversation = state
        .chat
        .get_or_create_conversation(&auth.user, &participant_id)
        .await?;
    Ok(Json(conversation))
}

// ─── Messages ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn validate_pagination(params: &PageParams) -> Result<(u32, u32)> {
    let page = params.page.unwrap_or(DEFAULT_PAGE);
    if page < 1 || page > MAX_PAGE {
        return Err(AppError::BadRequest(
            "Page must be a positive integer between 1 and 1000".to_string(),
        ));
    }
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 || limit > MAX_LIMIT {
        return Err(AppError::BadRequest(
            "Limit must be a positive integer between 1 and 100".to_string(),
        ));
    }
    Ok((page, limit))
}

/// One page of messages, oldest first within the page.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<MessageView>>> {
    let (page, limit) = validate_pagination(&params)?;
    let messages = state
        .chat
        .list_messages(&auth.user, &conversation_id, page, limit)
        .await?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: Option<String>,
    pub content_type: Option<String>,
}

/// Append a message to a conversation.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>)> {
    let content = request.content.unwrap_or_default();
    let message = state
        .chat
        .send_message(&auth.user, &conversation_id, &content, request.content_type)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Serialize)]
pub struct ReadResponse {
    pub message: String,
}

/// Mark every unread message addressed to the caller as read.
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ReadResponse>> {
    let marked = state.chat.mark_read(&auth.user, &conversation_id).await?;
    tracing::debug!(conversation = %conversation_id, marked, "Messages marked as read");
    Ok(Json(ReadResponse {
        message: "Messages marked as read".to_string(),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

/// Total unread messages for the caller across all conversations.
async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UnreadCountResponse>> {
    let count = state.chat.unread_count(&auth.uid).await?;
    Ok(Json(UnreadCountResponse {
        unread_count: count,
    }))
}
