// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-session presence tracking.
//!
//! Each realtime connection owns one [`PresenceSession`], a spawned
//! state machine driving the online/away/offline fields on the user
//! document. Timers live inside the task and die with it, so a
//! reconnect can never leak a heartbeat from the previous session.
//!
//! Transitions: sessions start `online` and re-assert it on a heartbeat
//! interval; the inactivity timer (or the tab going hidden) moves them
//! to `away` and suspends the heartbeat; activity or regained
//! visibility moves them back. Teardown writes `offline` best-effort.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::models::{OnlineStatus, PresenceUpdate, User};
use crate::time_utils::{now_rfc3339, parse_rfc3339};

/// How often an active session re-asserts `online`.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Presence timing knobs.
///
/// The write-side away trigger and the read-side grace window are
/// independent: a session goes away after `away_after` of inactivity,
/// but reads still count it as reachable until `read_grace` has passed
/// since its last activity.
#[derive(Debug, Clone, Copy)]
pub struct PresenceSettings {
    pub heartbeat: Duration,
    /// Inactivity span after which a session is marked away
    pub away_after: Duration,
    /// How long an away session still counts as reachable
    pub read_grace: Duration,
}

impl PresenceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            heartbeat: HEARTBEAT_INTERVAL,
            away_after: Duration::from_secs(config.presence_away_secs),
            read_grace: Duration::from_secs(config.presence_grace_secs),
        }
    }
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            heartbeat: HEARTBEAT_INTERVAL,
            away_after: Duration::from_secs(300),
            read_grace: Duration::from_secs(900),
        }
    }
}

/// Client-driven presence triggers, forwarded by the socket handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSignal {
    /// Pointer/keyboard/touch activity or any client event
    Activity,
    /// Tab or window lost visibility
    Hidden,
    /// Tab or window regained visibility
    Visible,
}

/// Handle to a running presence state machine.
///
/// Dropping the handle (or calling [`stop`](Self::stop)) closes the
/// signal channel; the task then writes `offline` and exits, taking its
/// timers with it.
pub struct PresenceSession {
    signals: mpsc::Sender<PresenceSignal>,
    status: watch::Receiver<OnlineStatus>,
    task: JoinHandle<()>,
}

impl PresenceSession {
    pub fn start(db: FirestoreDb, uid: String, settings: PresenceSettings) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(OnlineStatus::Online);
        let task = tokio::spawn(run_session(db, uid, settings, signal_rx, status_tx));
        Self {
            signals: signal_tx,
            status: status_rx,
            task,
        }
    }

    /// Forward a client signal. Silently dropped if the session is
    /// already shutting down.
    pub fn signal(&self, signal: PresenceSignal) {
        let _ = self.signals.try_send(signal);
    }

    /// Current state as last published by the session task.
    pub fn status(&self) -> OnlineStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<OnlineStatus> {
        self.status.clone()
    }

    /// Shut the session down and wait for the final offline write.
    pub async fn stop(self) {
        drop(self.signals);
        let _ = self.task.await;
    }
}

async fn run_session(
    db: FirestoreDb,
    uid: String,
    settings: PresenceSettings,
    mut signals: mpsc::Receiver<PresenceSignal>,
    status_tx: watch::Sender<OnlineStatus>,
) {
    let mut state = OnlineStatus::Online;
    write_status(&db, &uid, state).await;
    let _ = status_tx.send(state);

    let mut heartbeat = interval_at(Instant::now() + settings.heartbeat, settings.heartbeat);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let idle = sleep(settings.away_after);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Heartbeat and inactivity only run while online; away
            // suspends both until a signal revives the session.
            _ = heartbeat.tick(), if state == OnlineStatus::Online => {
                write_status(&db, &uid, OnlineStatus::Online).await;
            }
            () = &mut idle, if state == OnlineStatus::Online => {
                state = OnlineStatus::Away;
                write_status(&db, &uid, state).await;
                let _ = status_tx.send(state);
            }
            signal = signals.recv() => match signal {
                Some(PresenceSignal::Activity) | Some(PresenceSignal::Visible) => {
                    if state != OnlineStatus::Online {
                        state = OnlineStatus::Online;
                        write_status(&db, &uid, state).await;
                        let _ = status_tx.send(state);
                        heartbeat.reset();
                    }
                    idle.as_mut().reset(Instant::now() + settings.away_after);
                }
                Some(PresenceSignal::Hidden) => {
                    if state == OnlineStatus::Online {
                        state = OnlineStatus::Away;
                        write_status(&db, &uid, state).await;
                        let _ = status_tx.send(state);
                    }
                }
                None => break,
            }
        }
    }

    state = OnlineStatus::Offline;
    write_status(&db, &uid, state).await;
    let _ = status_tx.send(state);
}

/// Presence writes never kill a session; a store hiccup just skips one
/// update and the next heartbeat retries.
async fn write_status(db: &FirestoreDb, uid: &str, status: OnlineStatus) {
    let update = PresenceUpdate::new(status, now_rfc3339());
    if let Err(err) = db.update_presence(uid, &update).await {
        tracing::warn!(uid, status = status.as_str(), %err, "Presence write failed");
    }
}

/// The read-side online predicate used by discovery and the online
/// listing. Away sessions still count while their last activity falls
/// within the grace window.
pub fn is_reachable(user: &User, now: DateTime<Utc>, read_grace: Duration) -> bool {
    if !user.is_online {
        return false;
    }
    match user.online_status {
        OnlineStatus::Online => true,
        OnlineStatus::Away => match parse_rfc3339(&user.last_active) {
            Some(last_active) => {
                let idle = now.signed_duration_since(last_active);
                idle.num_seconds() <= read_grace.as_secs() as i64
            }
            None => false,
        },
        OnlineStatus::Offline => false,
    }
}
