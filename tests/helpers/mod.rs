//! Reusable test doubles for publisher integration tests.
//!
//! The publisher runs against a REAL in-memory `SQLite` store and a real
//! `MemoryPreferences`; only the platform location source, the remote API
//! and the retention schedule are replaced with recording doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::{broadcast, oneshot};

use whereat_core::events::{EventBus, PublisherEvent};
use whereat_core::location::{ApiMessage, Fix, UserLocation, UserLocationTimestamped};
use whereat_core::prefs::MemoryPreferences;
use whereat_core::publisher::{LocationPublisher, PublisherDeps, PublisherError, PublisherSnapshot};
use whereat_core::remote::{RemoteError, RemoteLocationService, RemoteResult};
use whereat_core::retention::RetentionScheduler;
use whereat_core::source::{LocationSource, SourceError, SourceEvents};
use whereat_core::store::SqliteLocationStore;
use whereat_core::PublisherConfig;

/// How long to wait for an expected event before failing.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Location source
// ============================================================================

/// Calls the publisher made on the location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Connect,
    Disconnect,
    RequestUpdates(Duration),
    RemoveUpdates,
}

/// Location source that records calls and reports connection on demand.
pub struct RecordingSource {
    available: AtomicBool,
    enabled: AtomicBool,
    auto_connect: AtomicBool,
    last_known: Mutex<Option<Fix>>,
    events: Mutex<Option<SourceEvents>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl RecordingSource {
    /// An available, enabled source that connects immediately.
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            auto_connect: AtomicBool::new(true),
            last_known: Mutex::new(None),
            events: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// When false, `connect` only records the call; use
    /// [`report_connected`](Self::report_connected) or
    /// [`report_connection_failed`](Self::report_connection_failed).
    pub fn set_auto_connect(&self, auto: bool) {
        self.auto_connect.store(auto, Ordering::SeqCst);
    }

    pub fn set_last_known(&self, fix: Option<Fix>) {
        *self.last_known.lock().unwrap() = fix;
    }

    pub fn report_connected(&self) {
        self.sink().connected();
    }

    pub fn report_connection_failed(&self, detail: &str) {
        self.sink().connection_failed(detail);
    }

    /// Delivers a fix as if the platform pushed a location update.
    pub fn report_fix(&self, fix: Fix) {
        self.sink().location_changed(fix);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: SourceCall) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    fn sink(&self) -> SourceEvents {
        self.events
            .lock()
            .unwrap()
            .clone()
            .expect("source was never connected")
    }

    fn record(&self, call: SourceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl LocationSource for RecordingSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn connect(&self, events: SourceEvents) {
        self.record(SourceCall::Connect);
        if self.auto_connect.load(Ordering::SeqCst) {
            events.connected();
        }
        *self.events.lock().unwrap() = Some(events);
    }

    fn disconnect(&self) {
        self.record(SourceCall::Disconnect);
    }

    fn last_known(&self) -> Option<Fix> {
        *self.last_known.lock().unwrap()
    }

    fn request_updates(&self, interval: Duration) -> Result<(), SourceError> {
        self.record(SourceCall::RequestUpdates(interval));
        Ok(())
    }

    fn remove_updates(&self) {
        self.record(SourceCall::RemoveUpdates);
    }
}

// ============================================================================
// Remote API
// ============================================================================

/// How the scripted remote answers a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Succeed,
    Fail,
    Hang,
}

/// Remote API that records requests and answers from a script.
pub struct ScriptedRemote {
    updates: Mutex<Vec<UserLocationTimestamped>>,
    removes: Mutex<Vec<UserLocation>>,
    update_reply: Mutex<Reply>,
    remove_reply: Mutex<Reply>,
    peers: Mutex<Vec<UserLocation>>,
    remove_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
            removes: Mutex::new(Vec::new()),
            update_reply: Mutex::new(Reply::Succeed),
            remove_reply: Mutex::new(Reply::Succeed),
            peers: Mutex::new(Vec::new()),
            remove_gate: Mutex::new(None),
        }
    }

    /// Peer locations returned by successful updates.
    pub fn set_peers(&self, peers: Vec<UserLocation>) {
        *self.peers.lock().unwrap() = peers;
    }

    pub fn set_update_reply(&self, reply: Reply) {
        *self.update_reply.lock().unwrap() = reply;
    }

    pub fn set_remove_reply(&self, reply: Reply) {
        *self.remove_reply.lock().unwrap() = reply;
    }

    /// Holds the next remove call until the returned sender fires.
    pub fn gate_remove(&self) -> oneshot::Sender<()> {
        let (open, gate) = oneshot::channel();
        *self.remove_gate.lock().unwrap() = Some(gate);
        open
    }

    pub fn updates(&self) -> Vec<UserLocationTimestamped> {
        self.updates.lock().unwrap().clone()
    }

    pub fn removes(&self) -> Vec<UserLocation> {
        self.removes.lock().unwrap().clone()
    }
}

fn scripted_failure() -> RemoteError {
    RemoteError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

impl RemoteLocationService for ScriptedRemote {
    fn update(
        &self,
        location: UserLocationTimestamped,
    ) -> BoxFuture<'static, RemoteResult<Vec<UserLocation>>> {
        self.updates.lock().unwrap().push(location);
        match *self.update_reply.lock().unwrap() {
            Reply::Succeed => future::ready(Ok(self.peers.lock().unwrap().clone())).boxed(),
            Reply::Fail => future::ready(Err(scripted_failure())).boxed(),
            Reply::Hang => future::pending().boxed(),
        }
    }

    fn remove(&self, location: UserLocation) -> BoxFuture<'static, RemoteResult<ApiMessage>> {
        self.removes.lock().unwrap().push(location);
        let gate = self.remove_gate.lock().unwrap().take();
        let reply = *self.remove_reply.lock().unwrap();

        async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            match reply {
                Reply::Succeed => Ok(ApiMessage::of("Database erased. 3 record(s) deleted.")),
                Reply::Fail => Err(scripted_failure()),
                Reply::Hang => future::pending().await,
            }
        }
        .boxed()
    }
}

// ============================================================================
// Retention
// ============================================================================

/// Calls the publisher made on the retention scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionCall {
    Forget {
        check_interval: Duration,
        ttl: Duration,
    },
    Cancel,
}

/// Retention scheduler that only records calls.
#[derive(Default)]
pub struct RecordingRetention {
    calls: Mutex<Vec<RetentionCall>>,
}

impl RecordingRetention {
    pub fn calls(&self) -> Vec<RetentionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<RetentionCall> {
        self.calls().last().copied()
    }
}

impl RetentionScheduler for RecordingRetention {
    fn forget(&self, check_interval: Duration, ttl: Duration) {
        self.calls.lock().unwrap().push(RetentionCall::Forget {
            check_interval,
            ttl,
        });
    }

    fn cancel(&self) {
        self.calls.lock().unwrap().push(RetentionCall::Cancel);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A spawned publisher with handles to all of its collaborators.
pub struct Harness {
    pub publisher: LocationPublisher,
    pub source: Arc<RecordingSource>,
    pub remote: Arc<ScriptedRemote>,
    pub store: Arc<SqliteLocationStore>,
    pub retention: Arc<RecordingRetention>,
    pub prefs: Arc<MemoryPreferences>,
    pub events: broadcast::Receiver<PublisherEvent>,
}

impl Harness {
    /// Spawns a publisher with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PublisherConfig::default())
    }

    /// Spawns a publisher with a custom configuration.
    pub fn with_config(config: PublisherConfig) -> Self {
        Self::with_prefs(config, MemoryPreferences::new())
    }

    /// Spawns a publisher over pre-populated preferences.
    pub fn with_prefs(config: PublisherConfig, prefs: MemoryPreferences) -> Self {
        Self::try_with_prefs(config, prefs).expect("spawn publisher")
    }

    pub fn try_with_prefs(
        config: PublisherConfig,
        prefs: MemoryPreferences,
    ) -> Result<Self, PublisherError> {
        let source = Arc::new(RecordingSource::new());
        let remote = Arc::new(ScriptedRemote::new());
        let store = Arc::new(SqliteLocationStore::in_memory().expect("in-memory store"));
        let retention = Arc::new(RecordingRetention::default());
        let prefs = Arc::new(prefs);
        let bus = EventBus::new(config.event_capacity);
        let events = bus.subscribe();

        let publisher = LocationPublisher::spawn(
            PublisherDeps {
                source: source.clone(),
                remote: remote.clone(),
                store: store.clone(),
                retention: retention.clone(),
                prefs: prefs.clone(),
                events: bus,
            },
            config,
        )?;

        Ok(Self {
            publisher,
            source,
            remote,
            store,
            retention,
            prefs,
            events,
        })
    }

    /// Starts the publisher and waits until it is polling.
    pub async fn start_polling(&self) {
        self.publisher.start().await.expect("start");
        self.wait_for(|s| s.state.polling).await;
    }

    pub async fn snapshot(&self) -> PublisherSnapshot {
        self.publisher.snapshot().await.expect("snapshot")
    }

    pub async fn user_id(&self) -> String {
        self.snapshot().await.state.user_id
    }

    /// Polls snapshots until `condition` holds.
    ///
    /// Source callbacks and remote completions arrive on their own channels,
    /// so a single snapshot round-trip does not guarantee they were handled.
    pub async fn wait_for(
        &self,
        condition: impl Fn(&PublisherSnapshot) -> bool,
    ) -> PublisherSnapshot {
        for _ in 0..200 {
            let snapshot = self.snapshot().await;
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::task::yield_now().await;
        }
        panic!("publisher never reached the expected state");
    }

    /// Waits until the remote has seen `count` update calls.
    pub async fn wait_for_updates(&self, count: usize) {
        self.wait_until(|| self.remote.updates().len() >= count).await;
    }

    /// Waits until an arbitrary condition holds, letting the publisher run.
    pub async fn wait_until(&self, condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            let _ = self.publisher.snapshot().await;
            tokio::task::yield_now().await;
        }
        panic!("condition never held");
    }

    /// Waits until the publisher task has exited.
    pub async fn wait_until_closed(&self) {
        for _ in 0..200 {
            if !self.publisher.is_running() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("publisher task never exited");
    }

    /// Receives the next event, failing after [`EVENT_TIMEOUT`].
    pub async fn next_event(&mut self) -> PublisherEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed")
    }

    /// Drains every event emitted so far without waiting.
    pub async fn drain_events(&mut self) -> Vec<PublisherEvent> {
        let _ = self.publisher.snapshot().await;
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// A fix at Battery Park, New York.
pub fn sample_fix(time: i64) -> Fix {
    Fix::new(40.709_252_9, -74.011_255_1, time)
}
