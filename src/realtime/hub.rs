// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process room registry for realtime fan-out.
//!
//! A room is a lazily created broadcast channel. Sessions subscribe to
//! the rooms they join; publishing to a room nobody joined delivers to
//! no one, same as the channel-per-room model this replaces.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::events::Envelope;

/// Per-room broadcast buffer. A subscriber that falls further behind
/// than this starts losing events (reported as lag, not an error).
const ROOM_BUFFER: usize = 64;

pub fn user_room(uid: &str) -> String {
    format!("user_{uid}")
}

pub fn conversation_room(conversation_id: &str) -> String {
    format!("conversation_{conversation_id}")
}

#[derive(Default)]
pub struct RoomHub {
    rooms: DashMap<String, broadcast::Sender<Envelope>>,
    next_session: AtomicU64,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an identifier for a new connected session. Used as the
    /// envelope origin for sender exclusion.
    pub fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    /// Join a room, creating it on first subscription.
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<Envelope> {
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_BUFFER).0)
            .subscribe()
    }

    /// Publish to a room. Returns how many subscribers received it.
    pub fn publish(&self, room: &str, envelope: Envelope) -> usize {
        match self.rooms.get(room) {
            Some(sender) => sender.send(envelope).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop the room entry once its last subscriber is gone.
    pub fn forget_if_empty(&self, room: &str) {
        self.rooms
            .remove_if(room, |_, sender| sender.receiver_count() == 0);
    }

    #[cfg(test)]
    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
