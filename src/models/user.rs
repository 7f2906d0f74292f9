//! User model for storage and API.

use serde::{Deserialize, Serialize};

use super::heart::HeartNote;

/// Presence state stored on the user document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    Online,
    Away,
    #[default]
    Offline,
}

impl OnlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnlineStatus::Online => "online",
            OnlineStatus::Away => "away",
            OnlineStatus::Offline => "offline",
        }
    }
}

/// Preferred age range for discovery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgePreference {
    pub min: u32,
    pub max: u32,
}

impl Default for AgePreference {
    fn default() -> Self {
        Self { min: 18, max: 100 }
    }
}

/// User profile stored in Firestore.
///
/// The document ID is the identity provider uid. The relationship arrays
/// (liked/passed/matches/blocked) are per-user mirrors of the edge
/// collections so list endpoints and discovery exclusion read a single
/// document instead of scanning edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identity provider uid (also used as document ID)
    pub uid: String,
    pub username: String,
    pub email: String,
    /// Display name
    pub name: String,
    pub age: u32,
    pub location: String,
    pub gender_identity: String,
    pub sexual_orientation: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub additional_photos: Vec<String>,
    #[serde(default)]
    pub private_album: Vec<String>,
    #[serde(default)]
    pub age_preference: Option<AgePreference>,

    /// Users this profile has sent a heart to
    #[serde(default)]
    pub liked_users: Vec<String>,
    /// Users this profile has passed on
    #[serde(default)]
    pub passed_users: Vec<String>,
    /// Mutual matches
    #[serde(default)]
    pub matches: Vec<String>,
    /// Users this profile has blocked
    #[serde(default)]
    pub blocked_users: Vec<String>,
    /// Heart notes received from other users
    #[serde(default)]
    pub received_hearts: Vec<HeartNote>,

    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub online_status: OnlineStatus,
    /// Last activity timestamp
    pub last_active: String,
    /// When the account was created
    pub created_at: String,
}

impl User {
    /// Age range this user wants to see in discovery.
    pub fn age_bounds(&self) -> (u32, u32) {
        let prefs = self.age_preference.unwrap_or_default();
        (prefs.min, prefs.max)
    }

    pub fn has_matched(&self, other: &str) -> bool {
        self.matches.iter().any(|id| id == other)
    }
}

/// Minimal profile snapshot used in match lists, cards and chat payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCard {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub location: String,
    pub profile_photo: Option<String>,
}

impl From<&User> for ProfileCard {
    fn from(user: &User) -> Self {
        Self {
            id: user.uid.clone(),
            name: user.name.clone(),
            age: user.age,
            location: user.location.clone(),
            profile_photo: user.profile_photo.clone(),
        }
    }
}

/// Public-safe projection of a profile, as returned by discovery.
///
/// Never exposes email, relationship arrays or the private album.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub age: u32,
    pub location: String,
    pub gender_identity: String,
    pub sexual_orientation: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub profile_photo: Option<String>,
    pub last_active: String,
    pub is_online: bool,
    pub online_status: OnlineStatus,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.uid.clone(),
            uid: user.uid.clone(),
            name: user.name.clone(),
            age: user.age,
            location: user.location.clone(),
            gender_identity: user.gender_identity.clone(),
            sexual_orientation: user.sexual_orientation.clone(),
            bio: user.bio.clone(),
            interests: user.interests.clone(),
            profile_photo: user.profile_photo.clone(),
            last_active: user.last_active.clone(),
            is_online: user.is_online,
            online_status: user.online_status,
        }
    }
}

/// Presence fields written to the user document on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub online_status: OnlineStatus,
    pub is_online: bool,
    pub last_active: String,
}

impl PresenceUpdate {
    /// `is_online` tracks whether a session is alive at all; it stays
    /// true through `away` so the read-side grace window can apply.
    pub fn new(status: OnlineStatus, last_active: String) -> Self {
        Self {
            online_status: status,
            is_online: status != OnlineStatus::Offline,
            last_active,
        }
    }
}
