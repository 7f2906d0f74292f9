// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, rate limiting, security).

pub mod auth;
pub mod rate_limit;
pub mod security;

pub use auth::require_auth;
pub use rate_limit::RateLimiter;
