//! The publisher task.
//!
//! All inputs (handle commands, location source callbacks, preference
//! changes and remote call completions) are multiplexed in one loop, so
//! state is only ever mutated by this task.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};

use super::state::{Phase, PublisherSnapshot, PublisherState, StartStatus};
use crate::config::PublisherConfig;
use crate::events::{EventBus, PublisherEvent};
use crate::location::{now_millis, ApiMessage, Fix, UserLocation, UserLocationTimestamped};
use crate::prefs::{PreferenceSource, POLL_INTERVAL_KEY, TTL_KEY};
use crate::remote::{RemoteError, RemoteLocationService, RemoteResult};
use crate::retention::RetentionScheduler;
use crate::source::{LocationSource, SourceEvent, SourceEvents};
use crate::store::LocationStore;

/// Requests sent by [`LocationPublisher`](super::LocationPublisher).
#[derive(Debug)]
pub(crate) enum Command {
    Start(oneshot::Sender<StartStatus>),
    Stop(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
    Ping,
    Poll,
    StopPolling,
    Clear,
    Record(UserLocation),
    Relay(Fix),
    PreferenceChanged(String),
    Snapshot(oneshot::Sender<PublisherSnapshot>),
}

/// Outcome of a remote call, tagged with the generation that issued it.
#[derive(Debug)]
enum Completion {
    Update(RemoteResult<Vec<UserLocation>>),
    Clear(RemoteResult<ApiMessage>),
}

/// Collaborators the publisher drives.
pub(crate) struct Collaborators {
    pub source: Arc<dyn LocationSource>,
    pub remote: Arc<dyn RemoteLocationService>,
    pub store: Arc<dyn LocationStore>,
    pub retention: Arc<dyn RetentionScheduler>,
    pub prefs: Arc<dyn PreferenceSource>,
    pub events: EventBus,
}

pub(crate) struct Actor {
    deps: Collaborators,
    config: PublisherConfig,
    state: PublisherState,
    phase: Phase,
    connected: bool,
    /// Bumped on stop; completions from older generations are discarded.
    generation: u64,
    in_flight: JoinSet<(u64, Completion)>,
    source_tx: mpsc::UnboundedSender<SourceEvent>,
}

/// Receivers the loop selects over.
pub(crate) struct Inbox {
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub source: mpsc::UnboundedReceiver<SourceEvent>,
    pub prefs: broadcast::Receiver<String>,
}

impl Actor {
    pub(crate) fn new(
        deps: Collaborators,
        config: PublisherConfig,
        state: PublisherState,
        source_tx: mpsc::UnboundedSender<SourceEvent>,
    ) -> Self {
        Self {
            deps,
            config,
            state,
            phase: Phase::Initialized,
            connected: false,
            generation: 0,
            in_flight: JoinSet::new(),
            source_tx,
        }
    }

    pub(crate) async fn run(mut self, inbox: Inbox) {
        let Inbox {
            mut commands,
            source: mut source_rx,
            prefs: mut prefs_rx,
        } = inbox;
        let mut prefs_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.stop();
                        break;
                    }
                },
                Some(event) = source_rx.recv() => self.handle_source_event(event),
                changed = prefs_rx.recv(), if prefs_open => match changed {
                    Ok(key) => self.on_preference_changed(&key),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("Missed {missed} preference change(s), reloading");
                        self.reset_poll_interval();
                        self.reset_ttl();
                    }
                    Err(broadcast::error::RecvError::Closed) => prefs_open = false,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.handle_joined(joined);
                }
            }
        }

        log::info!("Location publisher shut down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let status = self.start();
                let _ = reply.send(status);
            }
            Command::Stop(reply) => {
                self.stop();
                let _ = reply.send(());
            }
            // Handled by the loop.
            Command::Shutdown(_) => {}
            Command::Ping => self.ping(),
            Command::Poll => self.poll(),
            Command::StopPolling => self.stop_polling(),
            Command::Clear => self.clear(),
            Command::Record(location) => self.record(location),
            Command::Relay(fix) => self.relay(fix),
            Command::PreferenceChanged(key) => self.on_preference_changed(&key),
            Command::Snapshot(reply) => {
                let _ = reply.send(PublisherSnapshot {
                    phase: self.phase,
                    state: self.state.clone(),
                });
            }
        }
    }

    fn handle_source_event(&mut self, event: SourceEvent) {
        if !self.phase.is_started() {
            log::debug!("Ignoring location source event while {:?}", self.phase);
            return;
        }
        match event {
            SourceEvent::Connected => self.on_connected(),
            SourceEvent::ConnectionFailed(detail) => self.on_connection_failed(detail),
            SourceEvent::LocationChanged(fix) => self.relay(fix),
        }
    }

    // ==================== Lifecycle ====================

    /// Connects everything and schedules retention.
    ///
    /// Starting an already started publisher is a no-op.
    fn start(&mut self) -> StartStatus {
        if !self.deps.source.is_available() {
            log::warn!("Location capability unavailable, start deferred");
            self.deps.events.emit(PublisherEvent::LocationSourceUnavailable);
            return StartStatus::RedeliverIntent;
        }

        if self.phase.is_started() {
            log::debug!("Start ignored: already {:?}", self.phase);
            return StartStatus::Sticky;
        }

        log::info!("Starting location publisher");
        self.phase = Phase::Connecting;
        self.deps
            .source
            .connect(SourceEvents::new(self.source_tx.clone()));
        if let Err(e) = self.deps.store.connect() {
            log::error!("Failed to connect location store: {e}");
        }
        self.deps
            .retention
            .forget(self.config.forget_interval(), self.state.ttl);

        StartStatus::Sticky
    }

    /// Tears down polling, connections, retention and in-flight calls.
    fn stop(&mut self) {
        if !self.phase.is_started() {
            return;
        }

        log::info!("Stopping location publisher");
        self.stop_polling();
        self.deps.source.disconnect();
        self.connected = false;
        self.deps.retention.cancel();
        self.generation += 1;
        self.in_flight.abort_all();
        self.deps.store.disconnect();
        self.phase = Phase::Stopped;
    }

    fn on_connected(&mut self) {
        log::info!("Location source connected");
        self.connected = true;
        if self.phase == Phase::Connecting {
            self.phase = Phase::Idle;
        }
        self.poll();
    }

    fn on_connection_failed(&mut self, detail: String) {
        log::warn!("Location API connection failed: {detail}");
        self.connected = false;
        self.deps
            .events
            .emit(PublisherEvent::RemoteApiDisconnected(detail));
    }

    // ==================== Polling ====================

    fn poll(&mut self) {
        if self.state.polling {
            return;
        }
        if !self.connected {
            log::debug!("Poll ignored: location source not connected");
            return;
        }

        match self.deps.source.request_updates(self.state.poll_interval) {
            Ok(()) => {
                self.state.polling = true;
                self.phase = Phase::Polling;
                log::info!(
                    "Polling every {}ms",
                    self.state.poll_interval.as_millis()
                );
            }
            Err(e) => {
                log::warn!("Failed to request location updates: {e}");
                self.deps.events.emit(PublisherEvent::LocationRequestFailed);
            }
        }
    }

    fn stop_polling(&mut self) {
        if !self.state.polling {
            return;
        }

        self.deps.source.remove_updates();
        self.state.polling = false;
        if self.phase == Phase::Polling {
            self.phase = Phase::Idle;
        }
        log::info!("Polling stopped");
    }

    /// Re-requests updates at the current interval if polling is active.
    fn restart_polling(&mut self) {
        if self.state.polling {
            self.stop_polling();
            self.poll();
        }
    }

    // ==================== Preferences ====================

    fn on_preference_changed(&mut self, key: &str) {
        match key {
            POLL_INTERVAL_KEY => self.reset_poll_interval(),
            TTL_KEY => self.reset_ttl(),
            _ => {}
        }
    }

    fn reset_poll_interval(&mut self) {
        self.state.poll_interval = self.deps.prefs.poll_interval().duration();
        log::debug!(
            "Poll interval set to {}ms",
            self.state.poll_interval.as_millis()
        );
        self.restart_polling();
    }

    fn reset_ttl(&mut self) {
        self.state.ttl = self.deps.prefs.ttl().duration();
        log::debug!("TTL set to {}ms", self.state.ttl.as_millis());
        // Retention only runs between start and stop.
        if self.phase.is_started() {
            self.deps
                .retention
                .forget(self.config.forget_interval(), self.state.ttl);
        }
    }

    // ==================== Locations ====================

    /// Fetches the last known fix once and relays it.
    ///
    /// Without a fix, emits `LocationRequestFailed`, followed by
    /// `LocationServicesDisabled` if location services are off.
    fn ping(&mut self) {
        if let Some(fix) = self.deps.source.last_known() {
            self.relay(fix);
            return;
        }

        log::warn!("No location fix available");
        self.deps.events.emit(PublisherEvent::LocationRequestFailed);
        if !self.deps.source.is_enabled() {
            self.deps
                .events
                .emit(PublisherEvent::LocationServicesDisabled);
        }
    }

    /// Persists, announces and publishes the device's own fix.
    fn relay(&mut self, fix: Fix) {
        let location = UserLocation::with_id(self.state.user_id.clone(), &fix);
        log::debug!("Relaying fix taken at {}", fix.time);

        if let Err(e) = self.deps.store.save(&location) {
            log::warn!("Failed to persist own location: {e}");
        }
        self.deps.events.emit(PublisherEvent::LocationPublished);
        self.update(location);
        self.state.last_ping = Some(fix.time);
    }

    /// Sends a location to the remote API; peers in the response are
    /// recorded in response order.
    fn update(&mut self, location: UserLocation) {
        let call = self
            .deps
            .remote
            .update(UserLocationTimestamped::now(location));
        self.spawn_call("location update", call, Completion::Update);
    }

    /// Shows and persists a location received from elsewhere. Never
    /// republished.
    fn record(&mut self, location: UserLocation) {
        self.deps
            .events
            .emit(PublisherEvent::MapUpdate(location.clone()));
        if let Err(e) = self.deps.store.save(&location) {
            log::warn!("Failed to persist location for {}: {e}", location.id);
        }
        self.state.remember_peer(&location);
    }

    /// Asks the remote API to erase this user's locations; the local store
    /// is wiped once the remote call succeeds.
    fn clear(&mut self) {
        let location = match self.deps.store.get(&self.state.user_id) {
            Ok(Some(location)) => location,
            Ok(None) => self.placeholder_location(),
            Err(e) => {
                log::warn!("Failed to look up own location before clear: {e}");
                self.placeholder_location()
            }
        };

        let call = self.deps.remote.remove(location);
        self.spawn_call("location removal", call, Completion::Clear);
    }

    /// The remote API keys deletions on the user id alone.
    fn placeholder_location(&self) -> UserLocation {
        UserLocation::create(self.state.user_id.clone(), 0.0, 0.0, now_millis())
    }

    // ==================== Remote calls ====================

    fn spawn_call<T>(
        &mut self,
        label: &'static str,
        call: BoxFuture<'static, RemoteResult<T>>,
        wrap: fn(RemoteResult<T>) -> Completion,
    ) where
        T: Send + 'static,
    {
        let timeout = self.config.request_timeout();
        let generation = self.generation;

        self.in_flight.spawn(async move {
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout(label.to_string())),
            };
            (generation, wrap(result))
        });
    }

    fn handle_joined(&mut self, joined: Result<(u64, Completion), JoinError>) {
        match joined {
            Ok((generation, completion)) if generation == self.generation => {
                self.handle_completion(completion);
            }
            Ok(_) => log::debug!("Discarding completion from before stop"),
            Err(e) if e.is_cancelled() => log::debug!("Remote call cancelled"),
            Err(e) => log::error!("Remote call task failed: {e}"),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Update(Ok(peers)) => {
                log::debug!("Update returned {} location(s)", peers.len());
                for peer in peers {
                    self.record(peer);
                }
            }
            Completion::Update(Err(e)) => {
                log::warn!("Location update failed: {e}");
                self.deps
                    .events
                    .emit(PublisherEvent::PublishFailed(e.to_string()));
            }
            Completion::Clear(Ok(message)) => {
                match self.deps.store.clear() {
                    Ok(rows) => log::info!("Cleared {rows} local location(s)"),
                    // The remote erase already happened, so it is still reported.
                    Err(e) => log::error!("Failed to clear local locations: {e}"),
                }
                self.state.peers.clear();
                self.deps
                    .events
                    .emit(PublisherEvent::LocationsCleared(message));
            }
            Completion::Clear(Err(e)) => {
                log::warn!("Location removal failed: {e}");
                self.deps
                    .events
                    .emit(PublisherEvent::ClearFailed(e.to_string()));
            }
        }
    }
}
