// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: registration, login and profile management.

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::models::{AgePreference, OnlineStatus, User};
use crate::routes::DataResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};

const MISSING_REGISTRATION_FIELDS: &str = "Todos los campos son requeridos para el registro";
const DEFAULT_BIO: &str = "Nueva cuenta en Corazón";

/// Public auth routes (no token required).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Auth routes that require a valid session token.
/// The auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/me", get(get_me))
        .route("/api/auth/profile", put(update_profile))
}

/// Token plus the signed-in profile, returned by register and login.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

// ─── Registration ────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    #[validate(
        email(message = "Please provide a valid email"),
        length(max = 100, message = "Email must be less than 100 characters")
    )]
    pub email: Option<String>,
    #[validate(
        length(
            min = 6,
            max = 100,
            message = "Password must be between 6 and 100 characters"
        ),
        custom(function = validate_password_strength)
    )]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 18, max = 100, message = "Age must be between 18 and 100"))]
    pub age: Option<u32>,
    #[validate(length(max = 100, message = "Location must be less than 100 characters"))]
    pub location: Option<String>,
    pub gender_identity: Option<String>,
    pub sexual_orientation: Option<String>,
    #[validate(length(max = 500, message = "Bio must be less than 500 characters"))]
    pub bio: Option<String>,
    pub preferred_language: Option<String>,
}

fn validate_password_strength(password: &str) -> std::result::Result<(), ValidationError> {
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_lowercase && has_uppercase && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("password").with_message(
            "Password must contain at least one lowercase letter, one uppercase letter, and one number"
                .into(),
        ))
    }
}

/// Register a new account.
///
/// Creates the identity-provider account first, then the profile
/// document. If the profile write fails the identity account is rolled
/// back so the email is not left claimed by a half-created account.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (
        Some(username),
        Some(email),
        Some(password),
        Some(name),
        Some(age),
        Some(location),
        Some(gender_identity),
        Some(sexual_orientation),
    ) = (
        request.username.clone(),
        request.email.clone(),
        request.password.clone(),
        request.name.clone(),
        request.age,
        request.location.clone(),
        request.gender_identity.clone(),
        request.sexual_orientation.clone(),
    )
    else {
        return Err(AppError::BadRequest(MISSING_REGISTRATION_FIELDS.to_string()));
    };

    request
        .validate()
        .map_err(|errors| AppError::BadRequest(format!("Validation errors: {errors}")))?;

    if state.db.is_offline() {
        return Err(AppError::Unavailable("Firestore not available".to_string()));
    }

    let identity_user = state.identity.sign_up(&email, &password, &name).await?;

    let now = now_rfc3339();
    let user = User {
        uid: identity_user.local_id.clone(),
        username,
        email,
        name,
        age,
        location,
        gender_identity,
        sexual_orientation,
        bio: request.bio.unwrap_or_else(|| DEFAULT_BIO.to_string()),
        interests: vec![],
        preferred_language: Some(request.preferred_language.unwrap_or_else(|| "es".to_string())),
        profile_photo: None,
        additional_photos: vec![],
        private_album: vec![],
        age_preference: None,
        liked_users: vec![],
        passed_users: vec![],
        matches: vec![],
        blocked_users: vec![],
        received_hearts: vec![],
        is_online: false,
        online_status: OnlineStatus::Offline,
        last_active: now.clone(),
        created_at: now,
    };

    if let Err(err) = state.db.upsert_user(&user).await {
        tracing::error!(uid = %user.uid, %err, "Profile creation failed, rolling back identity account");
        if let Err(rollback_err) = state.identity.delete_account(&identity_user.id_token).await {
            tracing::error!(uid = %user.uid, %rollback_err, "Identity rollback failed");
        }
        return Err(err);
    }

    let token = create_jwt(
        &user.uid,
        &state.config.jwt_secret,
        state.config.jwt_expires_in_secs,
    )?;

    tracing::info!(uid = %user.uid, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        email(message = "Please provide a valid email"),
        length(max = 100, message = "Email must be less than 100 characters")
    )]
    pub email: Option<String>,
    #[validate(length(
        min = 6,
        max = 100,
        message = "Password must be at least 6 characters long"
    ))]
    pub password: Option<String>,
}

/// Log in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    request
        .validate()
        .map_err(|errors| AppError::BadRequest(format!("Validation errors: {errors}")))?;

    let (Some(email), Some(password)) = (request.email, request.password) else {
        return Err(AppError::BadRequest(
            "Please provide email and password".to_string(),
        ));
    };

    let identity_user = state.identity.sign_in(&email, &password).await?;

    let Some(user) = state.db.get_user(&identity_user.local_id).await? else {
        return Err(AppError::NotFound("User profile not found".to_string()));
    };

    let token = create_jwt(
        &user.uid,
        &state.config.jwt_secret,
        state.config.jwt_expires_in_secs,
    )?;

    tracing::debug!(uid = %user.uid, "User logged in");

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

// ─── Profile ─────────────────────────────────────────────────

/// Get the current user's full profile.
async fn get_me(Extension(auth): Extension<AuthUser>) -> Json<DataResponse<User>> {
    Json(DataResponse {
        success: true,
        data: auth.user,
    })
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Bio must be less than 500 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 100, message = "Location must be less than 100 characters"))]
    pub location: Option<String>,
    pub gender_identity: Option<String>,
    pub sexual_orientation: Option<String>,
    #[validate(custom(function = validate_interests))]
    pub interests: Option<Vec<String>>,
    pub preferred_language: Option<String>,
    pub age_preference: Option<AgePreference>,
    pub profile_photo: Option<String>,
    pub additional_photos: Option<Vec<String>>,
    pub private_album: Option<Vec<String>>,
}

fn validate_interests(interests: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if interests.len() > 10 {
        return Err(
            ValidationError::new("interests").with_message("Maximum 10 interests allowed".into())
        );
    }
    if interests.iter().any(|interest| interest.chars().count() > 30) {
        return Err(ValidationError::new("interests")
            .with_message("Each interest must be a string with max 30 characters".into()));
    }
    Ok(())
}

/// Update the whitelisted profile fields.
///
/// Identity (uid, email, username), age and the relationship mirrors
/// are not updatable through this endpoint.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<DataResponse<User>>> {
    request
        .validate()
        .map_err(|errors| AppError::BadRequest(format!("Validation errors: {errors}")))?;

    let mut user = auth.user;
    if let Some(name) = request.name {
        user.name = name;
    }
    if let Some(bio) = request.bio {
        user.bio = bio;
    }
    if let Some(location) = request.location {
        user.location = location;
    }
    if let Some(gender_identity) = request.gender_identity {
        user.gender_identity = gender_identity;
    }
    if let Some(sexual_orientation) = request.sexual_orientation {
        user.sexual_orientation = sexual_orientation;
    }
    if let Some(interests) = request.interests {
        user.interests = interests;
    }
    if let Some(preferred_language) = request.preferred_language {
        user.preferred_language = Some(preferred_language);
    }
    if let Some(age_preference) = request.age_preference {
        user.age_preference = Some(age_preference);
    }
    if let Some(profile_photo) = request.profile_photo {
        user.profile_photo = Some(profile_photo);
    }
    if let Some(additional_photos) = request.additional_photos {
        user.additional_photos = additional_photos;
    }
    if let Some(private_album) = request.private_album {
        user.private_album = private_album;
    }
    user.last_active = now_rfc3339();

    state.db.upsert_user(&user).await?;

    Ok(Json(DataResponse {
        success: true,
        data: user,
    }))
}
