//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. The only hard requirement is the
//! JWT signing secret; identity and Firestore access degrade to an
//! unavailable state when their settings are absent so local tooling can
//! still exercise the request pipeline.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP / Firebase project ID
    pub firebase_project_id: String,
    /// Identity provider web API key (None disables credential endpoints)
    pub firebase_api_key: Option<String>,
    /// Identity emulator host (host:port), for local development
    pub auth_emulator_host: Option<String>,
    /// Server port
    pub port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,

    /// JWT signing key for session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Session token lifetime in seconds
    pub jwt_expires_in_secs: u64,

    /// Seconds without client activity before a session is marked away
    pub presence_away_secs: u64,
    /// Seconds an away session still counts as reachable
    pub presence_grace_secs: u64,

    /// Requests allowed per client per rate-limit window
    pub rate_limit_max: u32,
    /// Rate-limit window length in seconds
    pub rate_limit_window_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            firebase_api_key: None,
            auth_emulator_host: None,
            port: 3001,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            jwt_expires_in_secs: 7 * 24 * 60 * 60,
            presence_away_secs: 300,
            presence_grace_secs: 900,
            rate_limit_max: 100,
            rate_limit_window_secs: 900,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .unwrap_or_else(|_| "local-dev".to_string()),
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            auth_emulator_host: env::var("FIREBASE_AUTH_EMULATOR_HOST").ok(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:5173".to_string(),
                        "http://localhost:3000".to_string(),
                    ]
                }),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            jwt_expires_in_secs: env::var("JWT_EXPIRES_IN")
                .ok()
                .and_then(|v| parse_expiry(&v))
                .unwrap_or(7 * 24 * 60 * 60),
            presence_away_secs: env_u64("PRESENCE_AWAY_SECS", 300),
            presence_grace_secs: env_u64("PRESENCE_GRACE_SECS", 900),
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            rate_limit_window_secs: env_u64("RATE_LIMIT_WINDOW_SECS", 900),
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a lifetime like `7d`, `24h`, `30m` or `3600` (plain seconds).
fn parse_expiry(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        _ => (value, None),
    };
    let number: u64 = number.parse().ok()?;
    let secs = match unit {
        None | Some('s') => number,
        Some('m') => number * 60,
        Some('h') => number * 60 * 60,
        Some('d') => number * 24 * 60 * 60,
        _ => return None,
    };
    Some(secs)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
