// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (Google Identity Toolkit REST API).
//!
//! Handles:
//! - Account creation at registration
//! - Password sign-in at login
//! - Account deletion for registration rollback
//!
//! Password hashes never touch this service; credentials are verified
//! by the provider and we only keep the returned uid.

use crate::error::AppError;
use serde::Deserialize;

const PROD_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit client.
#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl IdentityService {
    /// Create a new identity client.
    ///
    /// With `emulator_host` set, requests go to the local Auth emulator
    /// (which accepts any API key). Without an API key the service is
    /// disabled and credential endpoints report service-unavailable.
    pub fn new(api_key: Option<String>, emulator_host: Option<&str>) -> Self {
        let (base_url, api_key) = match emulator_host {
            Some(host) => (
                format!("http://{host}/identitytoolkit.googleapis.com/v1"),
                Some(api_key.unwrap_or_else(|| "emulator-api-key".to_string())),
            ),
            None => (PROD_BASE_URL.to_string(), api_key),
        };

        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Create a disabled client for testing.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: PROD_BASE_URL.to_string(),
            api_key: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("Identity provider not configured".to_string()))
    }

    /// Create an account and return its uid and a provider token.
    ///
    /// The token is only kept long enough to roll the account back if
    /// profile creation fails.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<IdentityUser, AppError> {
        let url = format!("{}/accounts:signUp?key={}", self.base_url, self.api_key()?);

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "displayName": display_name,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Identity provider unreachable: {e}")))?;

        self.check_response_json(response).await
    }

    /// Verify credentials and return the account uid.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityUser, AppError> {
        let url = format!(
            "{}/accounts:signInWithPassword?key={}",
            self.base_url,
            self.api_key()?
        );

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Identity provider unreachable: {e}")))?;

        self.check_response_json(response).await
    }

    /// Delete the account behind `id_token` (registration rollback).
    pub async fn delete_account(&self, id_token: &str) -> Result<(), AppError> {
        let url = format!("{}/accounts:delete?key={}", self.base_url, self.api_key()?);

        let body = serde_json::json!({ "idToken": id_token });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Unavailable(format!("Identity provider unreachable: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Internal(anyhow::anyhow!(
            "Account deletion failed (HTTP {status}): {body}"
        )))
    }

    /// Check response status and parse JSON, mapping provider error
    /// codes onto our taxonomy.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.is_server_error() {
                return Err(AppError::Unavailable(format!(
                    "Identity provider error (HTTP {status})"
                )));
            }

            let code = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            return Err(map_provider_error(&code));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Identity response parse error: {e}")))
    }
}

/// Map an Identity Toolkit error code to a user-facing error.
fn map_provider_error(code: &str) -> AppError {
    if code.starts_with("WEAK_PASSWORD") {
        return AppError::BadRequest("Password is too weak".to_string());
    }
    match code {
        "EMAIL_EXISTS" => AppError::BadRequest("Email address is already in use".to_string()),
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            AppError::BadRequest("Invalid email address".to_string())
        }
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AppError::InvalidCredentials
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AppError::RateLimited,
        other => AppError::BadRequest(format!("Identity provider rejected the request: {other}")),
    }
}

/// Provider account as returned by signUp / signInWithPassword.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    #[serde(rename = "localId")]
    pub local_id: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
