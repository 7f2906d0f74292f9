//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Directed heart edges (keyed `{from}_{to}`)
    pub const HEARTS: &str = "hearts";
    /// Directed pass edges (keyed `{from}_{to}`)
    pub const PASSES: &str = "passes";
    /// Directed block edges (keyed `{from}_{to}`)
    pub const BLOCKS: &str = "blocks";
    /// Mutual matches (keyed by pair-sorted id)
    pub const MATCHES: &str = "matches";
    /// Conversations (keyed by pair-sorted id)
    pub const CONVERSATIONS: &str = "conversations";
    pub const MESSAGES: &str = "messages";
}
