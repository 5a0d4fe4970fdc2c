//! Device location capability.
//!
//! The platform layer implements [`LocationSource`] on top of whatever
//! provider the device offers. Asynchronous callbacks (connection results
//! and location updates) are reported through [`SourceEvents`], which feeds
//! them into the publisher's queue so they are handled one at a time.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::location::Fix;

/// Errors reported by a location source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source is not connected yet.
    #[error("Location source not connected")]
    NotConnected,

    /// The platform refused the request.
    #[error("Location request rejected: {0}")]
    Rejected(String),
}

/// Callback delivered by a location source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The source finished connecting.
    Connected,
    /// The source failed to connect.
    ConnectionFailed(String),
    /// A new fix arrived while updates were requested.
    LocationChanged(Fix),
}

/// Sender half handed to a [`LocationSource`] on connect.
///
/// Cloneable and usable from any thread. Reports sent after the publisher
/// has shut down are dropped.
#[derive(Debug, Clone)]
pub struct SourceEvents {
    sender: mpsc::UnboundedSender<SourceEvent>,
}

impl SourceEvents {
    pub(crate) const fn new(sender: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self { sender }
    }

    /// Reports a finished connection.
    pub fn connected(&self) {
        self.send(SourceEvent::Connected);
    }

    /// Reports a failed connection with a diagnostic detail.
    pub fn connection_failed(&self, detail: impl Into<String>) {
        self.send(SourceEvent::ConnectionFailed(detail.into()));
    }

    /// Reports a new location fix.
    pub fn location_changed(&self, fix: Fix) {
        self.send(SourceEvent::LocationChanged(fix));
    }

    fn send(&self, event: SourceEvent) {
        if self.sender.send(event).is_err() {
            log::debug!("Location source event dropped: publisher is gone");
        }
    }
}

/// Capability to sample the device location.
pub trait LocationSource: Send + Sync {
    /// Whether the location capability exists on this device at all.
    fn is_available(&self) -> bool;

    /// Whether the user has location services turned on.
    fn is_enabled(&self) -> bool;

    /// Starts connecting; the outcome is reported through `events`, which
    /// also carries subsequent location updates.
    fn connect(&self, events: SourceEvents);

    /// Disconnects and stops any location updates.
    fn disconnect(&self);

    /// Returns the last known fix, if the platform has one.
    fn last_known(&self) -> Option<Fix>;

    /// Requests periodic updates at `interval`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is not connected or the request is
    /// rejected.
    fn request_updates(&self, interval: Duration) -> Result<(), SourceError>;

    /// Stops periodic updates.
    fn remove_updates(&self);
}
