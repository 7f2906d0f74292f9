// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client fixed-window rate limiting.
//!
//! Counters are keyed by client IP. The window resets lazily on the
//! first request after it elapses; `purge_stale` drops idle entries so
//! the map does not grow without bound.

use std::net::IpAddr;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter per client IP.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Count a request from `ip`. Returns false when the window budget
    /// is spent.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }

    /// Drop counters whose window elapsed long ago.
    pub fn purge_stale(&self) {
        let now = Instant::now();
        let window = self.window;
        self.windows
            .retain(|_, entry| now.duration_since(entry.started) < window * 2);
    }
}

/// Middleware that rejects requests over the per-IP budget.
pub async fn rate_limit(
    State(state): State<std::sync::Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(ip) = extract_client_ip(&request) {
        if !state.rate_limiter.check(ip) {
            tracing::warn!(ip = %ip, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }
    }

    Ok(next.run(request).await)
}

/// Client IP: X-Forwarded-For first (we sit behind a proxy), then
/// X-Real-IP, then the socket address.
fn extract_client_ip(request: &Request) -> Option<IpAddr> {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
}
