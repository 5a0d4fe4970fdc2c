//! Event bus for decoupled observers.
//!
//! The publisher and the retention scheduler announce what happened on a
//! broadcast channel; UI layers subscribe and map events to notifications
//! or map markers.
//!
//! | Event | Topic | Payload |
//! |-------|-------|---------|
//! | [`LocationPublished`](PublisherEvent::LocationPublished) | `location.published` | - |
//! | [`LocationRequestFailed`](PublisherEvent::LocationRequestFailed) | `location.request.failed` | - |
//! | [`LocationServicesDisabled`](PublisherEvent::LocationServicesDisabled) | `location.services.disabled` | - |
//! | [`LocationSourceUnavailable`](PublisherEvent::LocationSourceUnavailable) | `location.source.unavailable` | - |
//! | [`PublishFailed`](PublisherEvent::PublishFailed) | `location.publish.failed` | error detail |
//! | [`LocationsCleared`](PublisherEvent::LocationsCleared) | `locations.cleared` | [`ApiMessage`] |
//! | [`ClearFailed`](PublisherEvent::ClearFailed) | `locations.clear.failed` | error detail |
//! | [`LocationsForgotten`](PublisherEvent::LocationsForgotten) | `locations.forgotten` | cutoff (epoch ms) |
//! | [`MapUpdate`](PublisherEvent::MapUpdate) | `map.update` | [`UserLocation`] |
//! | [`RemoteApiDisconnected`](PublisherEvent::RemoteApiDisconnected) | `remote.api.disconnected` | failure detail |

use chrono::{Local, TimeZone};
use tokio::sync::broadcast;

use crate::location::{ApiMessage, UserLocation};

/// Something observers may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum PublisherEvent {
    /// The device location was persisted and sent for publication.
    LocationPublished,
    /// No location fix could be obtained.
    LocationRequestFailed,
    /// The device's location services are turned off.
    LocationServicesDisabled,
    /// The location capability itself is unavailable; start was refused.
    LocationSourceUnavailable,
    /// The remote update call failed.
    PublishFailed(String),
    /// The remote API erased all locations. The local wipe that follows is
    /// best-effort: a store failure is logged and does not suppress this
    /// event.
    LocationsCleared(ApiMessage),
    /// The remote remove call failed; nothing was erased locally.
    ClearFailed(String),
    /// Locations older than the cutoff (epoch ms) were forgotten.
    LocationsForgotten(i64),
    /// A location should be shown on the map.
    MapUpdate(UserLocation),
    /// The connection to the location API failed.
    RemoteApiDisconnected(String),
}

impl PublisherEvent {
    /// Returns the topic name of this event.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::LocationPublished => "location.published",
            Self::LocationRequestFailed => "location.request.failed",
            Self::LocationServicesDisabled => "location.services.disabled",
            Self::LocationSourceUnavailable => "location.source.unavailable",
            Self::PublishFailed(_) => "location.publish.failed",
            Self::LocationsCleared(_) => "locations.cleared",
            Self::ClearFailed(_) => "locations.clear.failed",
            Self::LocationsForgotten(_) => "locations.forgotten",
            Self::MapUpdate(_) => "map.update",
            Self::RemoteApiDisconnected(_) => "remote.api.disconnected",
        }
    }
}

/// Renders the user-visible notice for a forget cutoff, e.g.
/// `"Locations forgotten before 2017-09-17 00:00:00"` in local time.
#[must_use]
pub fn forgotten_notice(cutoff_millis: i64) -> String {
    match Local.timestamp_millis_opt(cutoff_millis).single() {
        Some(at) => format!(
            "Locations forgotten before {}",
            at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => format!("Locations forgotten before {cutoff_millis}"),
    }
}

/// Broadcast bus carrying [`PublisherEvent`]s.
///
/// Cloning yields another handle to the same bus. Emitting with no
/// subscribers is not an error; slow subscribers may observe
/// `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PublisherEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers.
    pub fn emit(&self, event: PublisherEvent) {
        log::debug!("Event: {}", event.topic());
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PublisherEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
