// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realtime notifier: websocket sessions, rooms and event fan-out.

pub mod events;
pub mod hub;
pub mod socket;

pub use events::{ClientEvent, Envelope, ServerEvent};
pub use hub::RoomHub;
pub use socket::ws_handler;
