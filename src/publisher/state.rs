//! Publisher state and lifecycle types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::location::UserLocation;
use crate::prefs::{PollInterval, Ttl};

/// Lifecycle phase of the publisher.
///
/// ```text
/// Initialized ──start──> Connecting ──connected──> Polling <──> Idle
///      ^                     │                        │          │
///      │                     └────────stop────────────┴──────────┴──> Stopped
///      │                                                               │
///      └──────────────────────── start reconnects ─────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Dependencies are wired and settings loaded; nothing is connected.
    Initialized,
    /// Waiting for the location source to connect.
    Connecting,
    /// Connected and receiving periodic location updates.
    Polling,
    /// Connected, with periodic updates switched off.
    Idle,
    /// Torn down; a new `start` reconnects.
    Stopped,
}

impl Phase {
    /// Whether `start` has been called and not yet undone by `stop`.
    #[must_use]
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Connecting | Self::Polling | Self::Idle)
    }
}

/// What the host should do if the process is killed after `start`.
///
/// Both variants keep the service running; neither means "do not restart".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartStatus {
    /// Keep running and restart with the last start request; returned when
    /// the location capability was unavailable and start should be retried.
    RedeliverIntent,
    /// Keep running and restart without redelivery.
    Sticky,
}

/// In-memory coordinator state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherState {
    /// Current poll interval.
    pub poll_interval: Duration,
    /// Current retention time-to-live.
    pub ttl: Duration,
    /// Time of the last relayed fix (epoch ms).
    pub last_ping: Option<i64>,
    /// Whether periodic updates are requested from the source.
    pub polling: bool,
    /// Durable identifier of this installation.
    pub user_id: String,
    /// Latest known location per peer, in first-seen order.
    pub peers: Vec<UserLocation>,
}

impl PublisherState {
    /// Creates the initial state for `user_id` with the given presets.
    #[must_use]
    pub fn new(user_id: String, poll_interval: PollInterval, ttl: Ttl) -> Self {
        Self {
            poll_interval: poll_interval.duration(),
            ttl: ttl.duration(),
            last_ping: None,
            polling: false,
            user_id,
            peers: Vec::new(),
        }
    }

    /// Records a peer's location, keeping only the newest per peer.
    ///
    /// Returns `false` if the location is this installation's own or older
    /// than what is already cached.
    pub fn remember_peer(&mut self, location: &UserLocation) -> bool {
        if location.id == self.user_id {
            return false;
        }
        match self.peers.iter_mut().find(|peer| peer.id == location.id) {
            Some(known) if known.time > location.time => false,
            Some(known) => {
                *known = location.clone();
                true
            }
            None => {
                self.peers.push(location.clone());
                true
            }
        }
    }
}

/// Point-in-time view of the publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherSnapshot {
    /// Lifecycle phase.
    pub phase: Phase,
    /// Coordinator state.
    pub state: PublisherState,
}
