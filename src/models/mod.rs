// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod conversation;
pub mod heart;
pub mod user;

pub use conversation::{Conversation, ConversationView, Message, MessageSender, MessageView};
pub use heart::{directed_id, pair_id, Block, Heart, HeartNote, HeartNoteView, HeartStatus, Match, Pass};
pub use user::{AgePreference, OnlineStatus, PresenceUpdate, ProfileCard, PublicProfile, User};
