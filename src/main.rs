// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Corazón API Server
//!
//! Dating app backend: discovery and matching, conversations, and the
//! realtime presence/chat surface.

use corazon::{config::Config, db::FirestoreDb, services::IdentityService, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Corazón API");

    // Initialize Firestore. A failed connection is not fatal: the server
    // still boots and answers 503 for store-backed routes, which keeps
    // /health and local tooling usable.
    let db = match FirestoreDb::new(&config.firebase_project_id).await {
        Ok(db) => db,
        Err(err) => {
            tracing::warn!(%err, "Firestore unavailable, running in offline mode");
            FirestoreDb::new_mock()
        }
    };

    // Identity provider (registration / credential checks)
    let identity = IdentityService::new(
        config.firebase_api_key.clone(),
        config.auth_emulator_host.as_deref(),
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, identity));

    // Periodically drop idle rate-limit counters
    let purge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(purge_state.config.rate_limit_window_secs));
        loop {
            interval.tick().await;
            purge_state.rate_limiter.purge_stale();
        }
    });

    // Build router
    let app = corazon::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("corazon=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
