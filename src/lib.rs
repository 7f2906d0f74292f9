// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Corazón: backend API for the Corazón dating app
//!
//! This crate provides the match/heart/pass engine, the conversation
//! layer on top of it, and the realtime surface (websocket rooms plus
//! presence tracking) that the web client talks to.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::time::Duration;

use config::Config;
use db::FirestoreDb;
use middleware::RateLimiter;
use realtime::RoomHub;
use services::{ChatService, IdentityService, MatchService, PresenceSettings};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: IdentityService,
    pub matching: MatchService,
    pub chat: ChatService,
    pub rooms: RoomHub,
    pub presence: PresenceSettings,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb, identity: IdentityService) -> Self {
        let presence = PresenceSettings::from_config(&config);
        let rate_limiter = RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );
        Self {
            matching: MatchService::new(db.clone()),
            chat: ChatService::new(db.clone()),
            rooms: RoomHub::new(),
            presence,
            rate_limiter,
            config,
            db,
            identity,
        }
    }
}
