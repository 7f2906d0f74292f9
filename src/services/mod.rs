// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod chat;
pub mod identity;
pub mod matching;
pub mod presence;

pub use chat::ChatService;
pub use identity::{IdentityService, IdentityUser};
pub use matching::{DiscoveryFilters, LikeOutcome, MatchService};
pub use presence::{PresenceSession, PresenceSettings, PresenceSignal};
