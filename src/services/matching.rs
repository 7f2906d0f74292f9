// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Match engine: hearts, passes, blocks, matches and discovery.
//!
//! Relationship state lives in two places on purpose. The edge
//! collections (hearts/passes/blocks/matches) are the source of truth;
//! the arrays on the user document mirror them per user so discovery
//! exclusion and list endpoints read one document. Every mirror update
//! is an idempotent append or remove, safe to replay after a partial
//! failure.

use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{
    Block, Heart, HeartNote, HeartNoteView, HeartStatus, Match, Pass, ProfileCard, PublicProfile,
    User,
};
use crate::services::presence;
use crate::time_utils::now_rfc3339;

/// Discovery returns at most this many candidates per call.
const DISCOVERY_PAGE_SIZE: usize = 10;

/// Default note attached to a heart sent without a message.
const DEFAULT_HEART_MESSAGE: &str = "Te envió un corazón 💖";

/// Optional discovery filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryFilters {
    pub online_only: bool,
}

/// Result of a heart: whether it completed a match, and the matched
/// profile card when it did.
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub is_match: bool,
    pub matched_user: Option<ProfileCard>,
}

#[derive(Clone)]
pub struct MatchService {
    db: FirestoreDb,
}

impl MatchService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Send a heart to `target_id`. Completes the match when the
    /// reverse heart already exists.
    pub async fn send_heart(&self, current: &User, target_id: &str) -> Result<LikeOutcome, AppError> {
        let Some(mut target) = self.db.get_user(target_id).await? else {
            return Err(AppError::NotFound("User not found".to_string()));
        };

        let now = now_rfc3339();

        // Mirror first so a crash mid-sequence still excludes the
        // target from this user's discovery.
        let mut me = current.clone();
        if push_unique(&mut me.liked_users, target_id) {
            self.db.upsert_user(&me).await?;
        }

        let existing = self.db.get_heart(&me.uid, target_id).await?;
        if existing
            .as_ref()
            .is_some_and(|h| h.status == HeartStatus::Matched)
        {
            // Re-sent heart on an existing match; nothing to change.
            return Ok(LikeOutcome {
                is_match: true,
                matched_user: Some(ProfileCard::from(&target)),
            });
        }

        // Re-sends keep the original timestamp.
        let mut heart = match existing {
            Some(heart) => heart,
            None => Heart::sent(&me.uid, target_id, now.clone()),
        };
        self.db.set_heart(&heart).await?;

        let Some(mut reverse) = self.db.get_heart(target_id, &me.uid).await? else {
            tracing::debug!(from = %me.uid, to = %target_id, "Heart sent, no match yet");
            return Ok(LikeOutcome {
                is_match: false,
                matched_user: None,
            });
        };

        // Mutual: reuse the canonical match record if a concurrent
        // request already created it.
        let match_record = match self.db.get_match(&me.uid, target_id).await? {
            Some(existing_match) => existing_match,
            None => Match::new(&me.uid, target_id, now),
        };

        heart.status = HeartStatus::Matched;
        reverse.status = HeartStatus::Matched;
        self.db
            .complete_match_atomic(&match_record, &[heart, reverse])
            .await?;

        // List mirrors for both sides, outside the transaction; replays
        // are harmless.
        if push_unique(&mut me.matches, target_id) {
            self.db.upsert_user(&me).await?;
        }
        if push_unique(&mut target.matches, &me.uid) {
            self.db.upsert_user(&target).await?;
        }

        tracing::info!(a = %me.uid, b = %target_id, "New match");

        Ok(LikeOutcome {
            is_match: true,
            matched_user: Some(ProfileCard::from(&target)),
        })
    }

    /// Pass on a profile. Keyed by the pair, so repeats are no-ops.
    pub async fn pass_profile(&self, current: &User, target_id: &str) -> Result<(), AppError> {
        let pass = Pass::new(&current.uid, target_id, now_rfc3339());
        self.db.set_pass(&pass).await?;

        let mut me = current.clone();
        if push_unique(&mut me.passed_users, target_id) {
            self.db.upsert_user(&me).await?;
        }
        Ok(())
    }

    /// Discovery candidates for `current`, excluding everyone they have
    /// already interacted with.
    pub async fn discover(
        &self,
        current: &User,
        filters: DiscoveryFilters,
        read_grace: Duration,
    ) -> Result<Vec<PublicProfile>, AppError> {
        let candidates = self.db.list_users().await?;
        Ok(filter_candidates(current, &candidates, filters, read_grace))
    }

    /// The current user's matches, as profile cards. Deleted accounts
    /// are silently dropped.
    pub async fn matches_of(&self, current: &User) -> Result<Vec<ProfileCard>, AppError> {
        let users = self.db.get_users_by_ids(&current.matches).await?;
        Ok(users.iter().map(ProfileCard::from).collect())
    }

    /// Append a heart note to the target's inbox.
    pub async fn send_heart_note(
        &self,
        current: &User,
        target_id: &str,
        message: Option<String>,
    ) -> Result<(), AppError> {
        let Some(mut target) = self.db.get_user(target_id).await? else {
            return Err(AppError::NotFound("User not found".to_string()));
        };

        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_HEART_MESSAGE.to_string());

        target.received_hearts.push(HeartNote {
            from_user_id: current.uid.clone(),
            message,
            timestamp: now_rfc3339(),
            seen: false,
        });

        self.db.upsert_user(&target).await
    }

    /// The hearts inbox, newest first, senders expanded to cards.
    pub async fn received_hearts(&self, current: &User) -> Result<Vec<HeartNoteView>, AppError> {
        let sender_ids: Vec<String> = current
            .received_hearts
            .iter()
            .map(|note| note.from_user_id.clone())
            .collect();
        let senders = self.db.get_users_by_ids(&sender_ids).await?;

        let mut views: Vec<HeartNoteView> = current
            .received_hearts
            .iter()
            .filter_map(|note| {
                let sender = senders.iter().find(|u| u.uid == note.from_user_id)?;
                Some(HeartNoteView {
                    note: note.clone(),
                    from_user: ProfileCard::from(sender),
                })
            })
            .collect();

        views.sort_by(|a, b| b.note.timestamp.cmp(&a.note.timestamp));
        Ok(views)
    }

    /// Mark inbox hearts from the given senders as seen.
    pub async fn mark_hearts_seen(
        &self,
        current: &User,
        from_user_ids: &[String],
    ) -> Result<(), AppError> {
        let mut me = current.clone();
        let mut changed = false;
        for note in &mut me.received_hearts {
            if !note.seen && from_user_ids.contains(&note.from_user_id) {
                note.seen = true;
                changed = true;
            }
        }
        if changed {
            self.db.upsert_user(&me).await?;
        }
        Ok(())
    }

    /// Block `target_id`: records the edge and destroys any match
    /// between the pair. The conversation history is kept but no longer
    /// listed for either side.
    pub async fn block_user(&self, current: &User, target_id: &str) -> Result<(), AppError> {
        let block = Block::new(&current.uid, target_id, now_rfc3339());
        self.db.set_block(&block).await?;

        let mut me = current.clone();
        let mut me_changed = push_unique(&mut me.blocked_users, target_id);

        if self.db.get_match(&me.uid, target_id).await?.is_some() {
            self.db.delete_match(&me.uid, target_id).await?;
            tracing::info!(blocker = %me.uid, blocked = %target_id, "Match destroyed by block");
        }

        me_changed |= remove_entry(&mut me.matches, target_id);
        if me_changed {
            self.db.upsert_user(&me).await?;
        }

        // The other side loses the match too. Skip silently if the
        // account is gone.
        if let Some(mut target) = self.db.get_user(target_id).await? {
            if remove_entry(&mut target.matches, &me.uid) {
                self.db.upsert_user(&target).await?;
            }
        }

        Ok(())
    }

    /// Remove a block edge. Does not resurrect a destroyed match.
    pub async fn unblock_user(&self, current: &User, target_id: &str) -> Result<(), AppError> {
        self.db.delete_block(&current.uid, target_id).await?;

        let mut me = current.clone();
        if remove_entry(&mut me.blocked_users, target_id) {
            self.db.upsert_user(&me).await?;
        }
        Ok(())
    }

    /// Profiles this user has blocked, as cards.
    pub async fn blocked_profiles(&self, current: &User) -> Result<Vec<ProfileCard>, AppError> {
        let users = self.db.get_users_by_ids(&current.blocked_users).await?;
        Ok(users.iter().map(ProfileCard::from).collect())
    }
}

/// Apply discovery exclusion, age preference and the optional online
/// restriction, capping the result at one page.
pub fn filter_candidates(
    viewer: &User,
    candidates: &[User],
    filters: DiscoveryFilters,
    read_grace: Duration,
) -> Vec<PublicProfile> {
    let mut excluded: HashSet<&str> = HashSet::new();
    excluded.insert(viewer.uid.as_str());
    excluded.extend(viewer.liked_users.iter().map(String::as_str));
    excluded.extend(viewer.passed_users.iter().map(String::as_str));
    excluded.extend(viewer.blocked_users.iter().map(String::as_str));

    let (min_age, max_age) = viewer.age_bounds();
    let now = Utc::now();

    candidates
        .iter()
        .filter(|candidate| !excluded.contains(candidate.uid.as_str()))
        .filter(|candidate| candidate.age >= min_age && candidate.age <= max_age)
        .filter(|candidate| {
            !filters.online_only || presence::is_reachable(candidate, now, read_grace)
        })
        .take(DISCOVERY_PAGE_SIZE)
        .map(PublicProfile::from)
        .collect()
}

/// Append if absent; returns whether the vec changed.
fn push_unique(values: &mut Vec<String>, value: &str) -> bool {
    if values.iter().any(|v| v == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

/// Remove all occurrences; returns whether the vec changed.
fn remove_entry(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|v| v != value);
    values.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OnlineStatus;
    use crate::time_utils::format_utc_rfc3339;

    fn make_user(uid: &str, age: u32) -> User {
        User {
            uid: uid.to_string(),
            username: uid.to_string(),
            email: format!("{uid}@example.com"),
            name: uid.to_string(),
            age,
            location: "Madrid".to_string(),
            gender_identity: "non-binary".to_string(),
            sexual_orientation: "pansexual".to_string(),
            bio: String::new(),
            interests: vec![],
            preferred_language: None,
            profile_photo: None,
            additional_photos: vec![],
            private_album: vec![],
            age_preference: None,
            liked_users: vec![],
            passed_users: vec![],
            matches: vec![],
            blocked_users: vec![],
            received_hearts: vec![],
            is_online: false,
            online_status: OnlineStatus::Offline,
            last_active: "2026-01-01T00:00:00.000Z".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn push_unique_is_idempotent() {
        let mut values = vec![];
        assert!(push_unique(&mut values, "a"));
        assert!(!push_unique(&mut values, "a"));
        assert_eq!(values, vec!["a"]);
    }

    #[test]
    fn discovery_excludes_interacted_users() {
        let mut viewer = make_user("viewer", 30);
        viewer.liked_users.push("liked".to_string());
        viewer.passed_users.push("passed".to_string());
        viewer.blocked_users.push("blocked".to_string());

        let candidates = vec![
            make_user("viewer", 30),
            make_user("liked", 30),
            make_user("passed", 30),
            make_user("blocked", 30),
            make_user("fresh", 30),
        ];

        let profiles =
            filter_candidates(&viewer, &candidates, DiscoveryFilters::default(), GRACE);
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[test]
    fn discovery_applies_default_age_bounds() {
        let viewer = make_user("viewer", 30);
        let candidates = vec![
            make_user("too-young", 17),
            make_user("just-in-low", 18),
            make_user("just-in-high", 100),
            make_user("too-old", 101),
        ];

        let profiles =
            filter_candidates(&viewer, &candidates, DiscoveryFilters::default(), GRACE);
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["just-in-low", "just-in-high"]);
    }

    #[test]
    fn discovery_caps_page_size() {
        let viewer = make_user("viewer", 30);
        let candidates: Vec<User> = (0..25).map(|i| make_user(&format!("u{i}"), 30)).collect();

        let profiles =
            filter_candidates(&viewer, &candidates, DiscoveryFilters::default(), GRACE);
        assert_eq!(profiles.len(), DISCOVERY_PAGE_SIZE);
    }

    #[test]
    fn online_only_keeps_away_users_within_grace() {
        let viewer = make_user("viewer", 30);

        let mut online = make_user("online", 30);
        online.is_online = true;
        online.online_status = OnlineStatus::Online;

        let mut recently_away = make_user("recently-away", 30);
        recently_away.is_online = true;
        recently_away.online_status = OnlineStatus::Away;
        recently_away.last_active = format_utc_rfc3339(Utc::now() - chrono::Duration::minutes(5));

        let mut long_away = make_user("long-away", 30);
        long_away.is_online = true;
        long_away.online_status = OnlineStatus::Away;
        long_away.last_active = format_utc_rfc3339(Utc::now() - chrono::Duration::minutes(20));

        let offline = make_user("offline", 30);

        let filters = DiscoveryFilters { online_only: true };
        let profiles = filter_candidates(
            &viewer,
            &[online, recently_away, long_away, offline],
            filters,
            GRACE,
        );
        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["online", "recently-away"]);
    }

    const GRACE: Duration = Duration::from_secs(15 * 60);
}
