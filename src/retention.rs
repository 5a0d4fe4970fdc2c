//! Scheduled forgetting of expired locations.
//!
//! Stored locations older than the configured time-to-live are deleted on a
//! recurring schedule. Each run announces its cutoff on the event bus so the
//! UI can tell the user what was dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::events::{EventBus, PublisherEvent};
use crate::location::now_millis;
use crate::store::LocationStore;

/// Capability to schedule the recurring forget action.
pub trait RetentionScheduler: Send + Sync {
    /// Schedules a check every `check_interval` that forgets locations older
    /// than `ttl`. Re-issuing replaces the previous schedule.
    fn forget(&self, check_interval: Duration, ttl: Duration);

    /// Cancels the schedule, if any.
    fn cancel(&self);
}

/// Forgets everything older than `ttl` right now and announces the cutoff.
///
/// Returns the cutoff used (epoch milliseconds). A store failure is logged
/// and the cutoff is still announced.
pub fn forget_expired(store: &dyn LocationStore, events: &EventBus, ttl: Duration) -> i64 {
    let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let cutoff = now_millis().saturating_sub(ttl_millis);

    match store.forget_before(cutoff) {
        Ok(0) => log::debug!("No locations older than {cutoff}"),
        Ok(rows) => log::info!("Forgot {rows} location(s) older than {cutoff}"),
        Err(e) => log::error!("Failed to forget expired locations: {e}"),
    }

    events.emit(PublisherEvent::LocationsForgotten(cutoff));
    cutoff
}

/// [`RetentionScheduler`] backed by a tokio interval task.
///
/// The first check runs as soon as the schedule is set. Dropping the
/// scheduler cancels the task.
pub struct StoreRetentionScheduler {
    store: Arc<dyn LocationStore>,
    events: EventBus,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StoreRetentionScheduler {
    /// Creates a scheduler that forgets from `store` and reports on `events`.
    #[must_use]
    pub fn new(store: Arc<dyn LocationStore>, events: EventBus) -> Self {
        Self {
            store,
            events,
            task: Mutex::new(None),
        }
    }

    /// Returns whether a schedule is currently active.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.task
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }
}

impl RetentionScheduler for StoreRetentionScheduler {
    fn forget(&self, check_interval: Duration, ttl: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::error!("Cannot schedule retention outside a tokio runtime");
            return;
        };
        if check_interval.is_zero() {
            log::error!("Retention check interval must be positive, schedule unchanged");
            return;
        }

        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                forget_expired(store.as_ref(), &events, ttl);
            }
        });

        match self.task.lock() {
            Ok(mut guard) => {
                if let Some(previous) = guard.replace(task) {
                    previous.abort();
                }
            }
            Err(e) => {
                log::error!("Retention lock poisoned: {e}");
                task.abort();
                return;
            }
        }

        log::info!(
            "Retention scheduled: every {}s, ttl {}s",
            check_interval.as_secs(),
            ttl.as_secs()
        );
    }

    fn cancel(&self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
                log::info!("Retention cancelled");
            }
        }
    }
}

impl Drop for StoreRetentionScheduler {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::UserLocation;
    use crate::store::SqliteLocationStore;

    const HOUR: Duration = Duration::from_secs(3_600);

    fn seeded_store() -> Arc<SqliteLocationStore> {
        let store = SqliteLocationStore::in_memory().unwrap();
        let now = now_millis();
        store
            .save(&UserLocation::create("old", 1.0, 1.0, now - 2 * 3_600_000))
            .unwrap();
        store
            .save(&UserLocation::create("fresh", 2.0, 2.0, now))
            .unwrap();
        Arc::new(store)
    }

    #[test]
    fn forget_expired_drops_rows_older_than_ttl() {
        let store = seeded_store();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();

        let cutoff = forget_expired(&*store, &events, HOUR);

        let remaining = store.get_all().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "fresh");
        assert_eq!(
            rx.try_recv().unwrap(),
            PublisherEvent::LocationsForgotten(cutoff)
        );
    }

    #[test]
    fn forget_expired_announces_even_when_store_fails() {
        let store = seeded_store();
        store.disconnect();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();

        let cutoff = forget_expired(&*store, &events, HOUR);

        assert_eq!(
            rx.try_recv().unwrap(),
            PublisherEvent::LocationsForgotten(cutoff)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_forget_runs_immediately_then_every_interval() {
        let store = seeded_store();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let scheduler = StoreRetentionScheduler::new(store.clone(), events);

        scheduler.forget(Duration::from_secs(60), HOUR);

        assert!(matches!(
            rx.recv().await.unwrap(),
            PublisherEvent::LocationsForgotten(_)
        ));
        assert_eq!(store.get_all().unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(matches!(
            rx.recv().await.unwrap(),
            PublisherEvent::LocationsForgotten(_)
        ));
        assert!(scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_schedule() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let scheduler = StoreRetentionScheduler::new(seeded_store(), events);

        scheduler.forget(Duration::from_secs(60), HOUR);
        rx.recv().await.unwrap();
        scheduler.cancel();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn reissuing_replaces_previous_schedule() {
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let scheduler = StoreRetentionScheduler::new(seeded_store(), events);

        scheduler.forget(Duration::from_secs(10), HOUR);
        rx.recv().await.unwrap();
        scheduler.forget(Duration::from_secs(100), HOUR);
        rx.recv().await.unwrap();

        // Only the 100 s schedule remains: nothing fires within 50 s.
        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_check_interval_is_rejected() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let scheduler = StoreRetentionScheduler::new(seeded_store(), events);

        scheduler.forget(Duration::ZERO, HOUR);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!scheduler.is_scheduled());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_check_interval_keeps_previous_schedule() {
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let scheduler = StoreRetentionScheduler::new(seeded_store(), events);

        scheduler.forget(Duration::from_secs(60), HOUR);
        rx.recv().await.unwrap();
        scheduler.forget(Duration::ZERO, HOUR);

        assert!(scheduler.is_scheduled());
    }

    #[test]
    fn forget_outside_runtime_is_a_no_op() {
        let scheduler = StoreRetentionScheduler::new(seeded_store(), EventBus::new(8));
        scheduler.forget(Duration::from_secs(60), HOUR);
        assert!(!scheduler.is_scheduled());
    }
}
