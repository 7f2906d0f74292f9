// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User interaction routes: discovery, hearts, matches, blocks and
//! presence status.
//!
//! All routes here require authentication; the middleware is applied in
//! routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{HeartNoteView, OnlineStatus, PresenceUpdate, ProfileCard, PublicProfile};
use crate::routes::{DataResponse, MessageResponse, SuccessResponse};
use crate::services::matching::DiscoveryFilters;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/discover", get(discover))
        .route("/api/users/online", get(online_users))
        .route("/api/users/like", post(like_user))
        .route("/api/users/pass", post(pass_user))
        .route("/api/users/matches", get(get_matches))
        .route("/api/users/send-heart", post(send_heart))
        .route("/api/users/hearts", get(get_hearts))
        .route("/api/users/hearts/mark-seen", put(mark_hearts_seen))
        .route("/api/users/block", post(block_user))
        .route("/api/users/unblock", post(unblock_user))
        .route("/api/users/blocked", get(get_blocked))
        .route("/api/users/status", post(update_status))
}

/// Body carrying a target user id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetUserRequest {
    pub user_id: Option<String>,
}

/// Validate a target user id from a request body.
fn require_user_id(user_id: Option<String>) -> Result<String> {
    let Some(user_id) = user_id else {
        return Err(AppError::BadRequest("User ID is required".to_string()));
    };
    if user_id.is_empty() || user_id.len() > 100 {
        return Err(AppError::BadRequest(
            "User ID must be between 1 and 100 characters".to_string(),
        ));
    }
    if !user_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::BadRequest(
            "User ID contains invalid characters".to_string(),
        ));
    }
    Ok(user_id)
}

// ─── Discovery ───────────────────────────────────────────────

/// Get discovery candidates for the current user.
async fn discover(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<Vec<PublicProfile>>>> {
    let profiles = state
        .matching
        .discover(
            &auth.user,
            DiscoveryFilters::default(),
            state.presence.read_grace,
        )
        .await?;
    Ok(Json(DataResponse {
        success: true,
        data: profiles,
    }))
}

/// Discovery restricted to currently reachable users.
async fn online_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<Vec<PublicProfile>>>> {
    let profiles = state
        .matching
        .discover(
            &auth.user,
            DiscoveryFilters { online_only: true },
            state.presence.read_grace,
        )
        .await?;
    Ok(Json(DataResponse {
        success: true,
        data: profiles,
    }))
}

// ─── Hearts and Matches ──────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub success: bool,
    #[serde(rename = "match")]
    pub is_match: bool,
    /// Card of the matched profile, null unless this like completed a match
    pub matched_user: Option<ProfileCard>,
}

/// Send a heart; reports whether it completed a match.
async fn like_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<TargetUserRequest>,
) -> Result<Json<LikeResponse>> {
    let target_id = require_user_id(request.user_id)?;
    let outcome = state.matching.send_heart(&auth.user, &target_id).await?;
    Ok(Json(LikeResponse {
        success: true,
        is_match: outcome.is_match,
        matched_user: outcome.matched_user,
    }))
}

/// Pass on a profile.
async fn pass_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<TargetUserRequest>,
) -> Result<Json<SuccessResponse>> {
    let target_id = require_user_id(request.user_id)?;
    state.matching.pass_profile(&auth.user, &target_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// The current user's matches as profile cards.
async fn get_matches(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<Vec<ProfileCard>>>> {
    let matches = state.matching.matches_of(&auth.user).await?;
    Ok(Json(DataResponse {
        success: true,
        data: matches,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendHeartRequest {
    pub user_id: Option<String>,
    pub message: Option<String>,
}

/// Send a heart note to another user's inbox.
async fn send_heart(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<SendHeartRequest>,
) -> Result<Json<MessageResponse>> {
    let target_id = require_user_id(request.user_id)?;
    state
        .matching
        .send_heart_note(&auth.user, &target_id, request.message)
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Heart sent successfully".to_string(),
    }))
}

/// The hearts inbox, newest first.
async fn get_hearts(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<Vec<HeartNoteView>>>> {
    let hearts = state.matching.received_hearts(&auth.user).await?;
    Ok(Json(DataResponse {
        success: true,
        data: hearts,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSeenRequest {
    /// Sender ids whose hearts should be marked seen
    pub heart_ids: Option<Vec<String>>,
}

/// Mark inbox hearts from the given senders as seen.
async fn mark_hearts_seen(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<MarkSeenRequest>,
) -> Result<Json<MessageResponse>> {
    let Some(heart_ids) = request.heart_ids else {
        return Err(AppError::BadRequest("heartIds is required".to_string()));
    };
    state
        .matching
        .mark_hearts_seen(&auth.user, &heart_ids)
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Hearts marked as seen".to_string(),
    }))
}

// ─── Blocking ────────────────────────────────────────────────

/// Block a user, destroying any match between the pair.
async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<TargetUserRequest>,
) -> Result<Json<MessageResponse>> {
    let target_id = require_user_id(request.user_id)?;
    state.matching.block_user(&auth.user, &target_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "User blocked successfully".to_string(),
    }))
}

/// Remove a block. The destroyed match stays gone.
async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<TargetUserRequest>,
) -> Result<Json<MessageResponse>> {
    let target_id = require_user_id(request.user_id)?;
    state.matching.unblock_user(&auth.user, &target_id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "User unblocked successfully".to_string(),
    }))
}

/// Profiles the current user has blocked.
async fn get_blocked(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DataResponse<Vec<ProfileCard>>>> {
    let blocked = state.matching.blocked_profiles(&auth.user).await?;
    Ok(Json(DataResponse {
        success: true,
        data: blocked,
    }))
}

// ─── Presence ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// Set the caller's presence status directly.
///
/// Realtime sessions normally drive presence; this endpoint covers
/// clients without a socket connection.
async fn update_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<DataResponse<PresenceUpdate>>> {
    let status = match request.status.as_deref() {
        Some("online") => OnlineStatus::Online,
        Some("away") => OnlineStatus::Away,
        Some("offline") => OnlineStatus::Offline,
        _ => {
            return Err(AppError::BadRequest(
                "Status must be one of online, away, offline".to_string(),
            ))
        }
    };

    let update = PresenceUpdate::new(status, now_rfc3339());
    state.db.update_presence(&auth.uid, &update).await?;

    Ok(Json(DataResponse {
        success: true,
        data: update,
    }))
}
