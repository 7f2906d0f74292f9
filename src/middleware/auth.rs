// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user uid)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT, profile included.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub user: User,
}

/// Middleware that requires valid JWT authentication.
///
/// Loads the caller's profile and stashes it as a request extension so
/// handlers do not repeat the read. Every protected endpoint needs the
/// profile, so an offline store fails here with service-unavailable
/// rather than in each handler.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(AppError::Unauthorized),
    };

    let claims = decode_token(token, &state.config.jwt_secret)?;

    if state.db.is_offline() {
        return Err(AppError::Unavailable("Firestore not available".to_string()));
    }
    let user = match state.db.get_user(&claims.sub).await? {
        Some(user) => user,
        // Token is valid but the account is gone
        None => return Err(AppError::InvalidToken),
    };

    let auth_user = AuthUser {
        uid: claims.sub,
        user,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Validate a session token and return its claims.
///
/// Shared by the HTTP middleware and the websocket handshake, which
/// carries the token as a query parameter.
pub fn decode_token(token: &str, signing_key: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

/// Create a JWT for a user session.
pub fn create_jwt(uid: &str, signing_key: &[u8], expires_in_secs: u64) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        iat: now,
        exp: now + expires_in_secs as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
