//! Location publishing coordinator.
//!
//! The [`LocationPublisher`] samples the device location on a user-chosen
//! interval, stores each fix, publishes it to the remote API, and records
//! the peer locations the API answers with. It also keeps the retention
//! schedule in step with the user's time-to-live setting.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────── commands ─────────────┐
//! LocationPublisher ─┘                                   │
//! LocationSource ──────── SourceEvents ────────────────> │
//! PreferenceSource ────── changed keys ────────────────> ├──> publisher task
//! RemoteLocationService ─ completions (JoinSet) ───────> │        │
//!                                                        ┘        ├──> LocationStore
//!                                                                 ├──> RetentionScheduler
//!                                                                 └──> EventBus
//! ```
//!
//! Every input is handled on a single task, so the poll interval, TTL,
//! polling flag and last ping are never mutated concurrently, and the
//! polling flag always matches the source subscription.
//!
//! # Remote calls
//!
//! Remote calls run concurrently with the loop, each bounded by the
//! configured request timeout. `stop` aborts them, and any result issued
//! before the stop is discarded.

mod actor;
mod error;
mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

pub use error::PublisherError;
pub use state::{Phase, PublisherSnapshot, PublisherState, StartStatus};

use self::actor::{Actor, Collaborators, Command, Inbox};
use crate::config::PublisherConfig;
use crate::events::EventBus;
use crate::identity::load_or_create_user_id;
use crate::location::{Fix, UserLocation};
use crate::prefs::PreferenceSource;
use crate::remote::RemoteLocationService;
use crate::retention::RetentionScheduler;
use crate::source::LocationSource;
use crate::store::LocationStore;

/// Capabilities the publisher is built from.
pub struct PublisherDeps {
    /// Device location capability.
    pub source: Arc<dyn LocationSource>,
    /// Remote location API.
    pub remote: Arc<dyn RemoteLocationService>,
    /// Local location storage.
    pub store: Arc<dyn LocationStore>,
    /// Recurring forget action.
    pub retention: Arc<dyn RetentionScheduler>,
    /// User settings and the durable user id.
    pub prefs: Arc<dyn PreferenceSource>,
    /// Where events are announced.
    pub events: EventBus,
}

/// Handle to the publisher task.
///
/// Cheap to clone; every clone talks to the same task. Methods that only
/// enqueue work return as soon as the request is queued; requests are
/// processed in order.
///
/// # Example
///
/// ```rust,ignore
/// let publisher = LocationPublisher::spawn(deps, PublisherConfig::default())?;
/// let mut events = bus.subscribe();
///
/// publisher.start().await?;
/// publisher.ping()?;
///
/// while let Ok(event) = events.recv().await {
///     println!("{}", event.topic());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocationPublisher {
    commands: mpsc::UnboundedSender<Command>,
}

impl LocationPublisher {
    /// Creates and initializes the publisher, then spawns its task.
    ///
    /// Loads (or generates and persists) the durable user id, reads the
    /// poll interval and TTL settings, and subscribes to setting changes.
    /// Nothing is connected until [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if called outside
    /// a tokio runtime, or if the user id cannot be persisted.
    pub fn spawn(deps: PublisherDeps, config: PublisherConfig) -> Result<Self, PublisherError> {
        config.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PublisherError::NoRuntime)?;

        let user_id = load_or_create_user_id(deps.prefs.as_ref())?;
        let state = PublisherState::new(user_id, deps.prefs.poll_interval(), deps.prefs.ttl());
        let prefs_rx = deps.prefs.subscribe();

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (source_tx, source_rx) = mpsc::unbounded_channel();

        let collaborators = Collaborators {
            source: deps.source,
            remote: deps.remote,
            store: deps.store,
            retention: deps.retention,
            prefs: deps.prefs,
            events: deps.events,
        };
        let actor = Actor::new(collaborators, config, state, source_tx);
        let inbox = Inbox {
            commands: commands_rx,
            source: source_rx,
            prefs: prefs_rx,
        };
        runtime.spawn(actor.run(inbox));

        log::info!("Location publisher initialized");
        Ok(Self { commands })
    }

    /// Connects the location source and local store and schedules
    /// retention.
    ///
    /// If the location capability is unavailable, emits
    /// `location.source.unavailable` and returns
    /// [`StartStatus::RedeliverIntent`]. Starting an already started
    /// publisher is a no-op returning [`StartStatus::Sticky`].
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub async fn start(&self) -> Result<StartStatus, PublisherError> {
        self.request(Command::Start).await
    }

    /// Stops polling, disconnects, cancels retention and in-flight calls.
    /// The publisher can be started again afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub async fn stop(&self) -> Result<(), PublisherError> {
        self.request(Command::Stop).await
    }

    /// Stops the publisher and ends its task.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task had already shut down.
    pub async fn shutdown(&self) -> Result<(), PublisherError> {
        self.request(Command::Shutdown).await
    }

    /// Fetches the last known fix once and relays it.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn ping(&self) -> Result<(), PublisherError> {
        self.send(Command::Ping)
    }

    /// Requests periodic updates at the current interval. No-op if already
    /// polling or not connected.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn poll(&self) -> Result<(), PublisherError> {
        self.send(Command::Poll)
    }

    /// Stops periodic updates. No-op if not polling.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn stop_polling(&self) -> Result<(), PublisherError> {
        self.send(Command::StopPolling)
    }

    /// Erases this user's remote locations, then wipes the local store.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn clear(&self) -> Result<(), PublisherError> {
        self.send(Command::Clear)
    }

    /// Shows and stores a location received from a peer, without
    /// publishing it.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn record(&self, location: UserLocation) -> Result<(), PublisherError> {
        self.send(Command::Record(location))
    }

    /// Persists, announces and publishes a device fix.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn relay(&self, fix: Fix) -> Result<(), PublisherError> {
        self.send(Command::Relay(fix))
    }

    /// Re-reads the setting stored under `key`.
    ///
    /// For hosts whose preference source does not broadcast changes; with a
    /// broadcasting source the change is picked up automatically.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub fn preference_changed(&self, key: &str) -> Result<(), PublisherError> {
        self.send(Command::PreferenceChanged(key.to_string()))
    }

    /// Returns the current phase and state, after every earlier request
    /// has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Closed`] if the task has shut down.
    pub async fn snapshot(&self) -> Result<PublisherSnapshot, PublisherError> {
        self.request(Command::Snapshot).await
    }

    /// Whether the publisher task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), PublisherError> {
        self.commands
            .send(command)
            .map_err(|_| PublisherError::Closed)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, PublisherError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| PublisherError::Closed)
    }
}
