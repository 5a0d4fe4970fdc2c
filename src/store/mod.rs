//! Local persistence of location records.
//!
//! Every location the device publishes and every peer location it receives
//! is stored locally. Rows accumulate until they are wiped by a clear or
//! forgotten by the retention scheduler.
//!
//! # Architecture
//!
//! ```text
//! LocationPublisher ──┐
//!                     ├──> dyn LocationStore ──> SqliteLocationStore
//! RetentionScheduler ─┘
//! ```

mod error;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteLocationStore;

use crate::location::UserLocation;

/// Storage for [`UserLocation`] records.
///
/// Implementations must be `Send + Sync` so the publisher and the retention
/// task can share one instance.
pub trait LocationStore: Send + Sync {
    /// Opens the underlying storage. Connecting an open store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be opened.
    fn connect(&self) -> StoreResult<()>;

    /// Closes the underlying storage. Further operations fail with
    /// [`StoreError::NotConnected`] until [`connect`](Self::connect).
    fn disconnect(&self);

    /// Appends a location and returns its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is disconnected or the write fails.
    fn save(&self, location: &UserLocation) -> StoreResult<i64>;

    /// Returns the most recent location stored for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is disconnected or the read fails.
    fn get(&self, user_id: &str) -> StoreResult<Option<UserLocation>>;

    /// Returns every stored location in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is disconnected or the read fails.
    fn get_all(&self) -> StoreResult<Vec<UserLocation>>;

    /// Deletes every stored location and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is disconnected or the delete fails.
    fn clear(&self) -> StoreResult<usize>;

    /// Deletes locations recorded before `cutoff_millis` and returns how
    /// many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is disconnected or the delete fails.
    fn forget_before(&self, cutoff_millis: i64) -> StoreResult<usize>;
}
