// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Relationship edge records: hearts, passes, blocks and matches.
//!
//! Directed edges use the document ID `{from}_{to}`; the undirected
//! match edge uses the pair-sorted ID `{low}_{high}` so both users
//! address the same document.

use serde::{Deserialize, Serialize};

/// Document ID for a directed edge (heart, pass, block).
pub fn directed_id(from: &str, to: &str) -> String {
    format!("{from}_{to}")
}

/// Document ID for an undirected pair edge (match, conversation).
pub fn pair_id(a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{low}_{high}")
}

/// Lifecycle of a heart edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartStatus {
    /// Sent, not (yet) reciprocated
    Sent,
    /// Reciprocated; a match record exists for the pair
    Matched,
}

/// A directed heart from one user to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heart {
    pub from_user_id: String,
    pub to_user_id: String,
    pub created_at: String,
    pub status: HeartStatus,
}

impl Heart {
    pub fn sent(from: &str, to: &str, created_at: String) -> Self {
        Self {
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            created_at,
            status: HeartStatus::Sent,
        }
    }

    pub fn doc_id(&self) -> String {
        directed_id(&self.from_user_id, &self.to_user_id)
    }
}

/// A pass (declined profile). Passes never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pass {
    pub from_user_id: String,
    pub to_user_id: String,
    pub created_at: String,
}

impl Pass {
    pub fn new(from: &str, to: &str, created_at: String) -> Self {
        Self {
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            created_at,
        }
    }
}

/// A directed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub from_user_id: String,
    pub to_user_id: String,
    pub created_at: String,
}

impl Block {
    pub fn new(from: &str, to: &str, created_at: String) -> Self {
        Self {
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            created_at,
        }
    }
}

/// A mutual match between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// The two participant uids, pair-sorted
    pub users: Vec<String>,
    pub created_at: String,
    /// ID of the most recent message, if any
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
}

impl Match {
    pub fn new(a: &str, b: &str, created_at: String) -> Self {
        let mut users = vec![a.to_string(), b.to_string()];
        users.sort();
        Self {
            users,
            created_at,
            last_message: None,
            last_message_at: None,
        }
    }

    pub fn doc_id(&self) -> String {
        pair_id(&self.users[0], &self.users[1])
    }
}

/// A heart note kept on the recipient's user document.
///
/// Distinct from the [`Heart`] edge: notes carry a short message and a
/// seen flag, and drive the hearts inbox rather than matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartNote {
    pub from_user_id: String,
    pub message: String,
    pub timestamp: String,
    pub seen: bool,
}

/// A heart note enriched with the sender's card for the inbox listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartNoteView {
    #[serde(flatten)]
    pub note: HeartNote,
    pub from_user: super::user::ProfileCard,
}
