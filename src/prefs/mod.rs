//! User-configurable settings.
//!
//! The publisher reads two settings, the poll interval and the retention
//! time-to-live, and reacts when either changes. The durable user id is
//! stored alongside them.
//!
//! # Keys
//!
//! | Key | Values |
//! |-----|--------|
//! | [`POLL_INTERVAL_KEY`] | [`PollInterval`] preset index `"0"`..`"4"` |
//! | [`TTL_KEY`] | [`Ttl`] preset index `"0"`..`"2"` |
//! | [`USER_ID_KEY`] | durable user id (UUID string) |

mod error;
mod presets;
mod store;

use tokio::sync::broadcast;

pub use error::PreferenceError;
pub use presets::{PollInterval, Ttl};
pub use store::{FilePreferences, MemoryPreferences};

/// Preference key for the poll interval preset.
pub const POLL_INTERVAL_KEY: &str = "pref_loc_share_interval_key";

/// Preference key for the retention time-to-live preset.
pub const TTL_KEY: &str = "pref_loc_ttl_key";

/// Preference key for the durable user identifier.
pub const USER_ID_KEY: &str = "pref_user_id_key";

/// Readable, writable and observable settings.
///
/// Implementations must be `Send + Sync`; change notifications are
/// delivered as the changed key on a broadcast channel.
pub trait PreferenceSource: Send + Sync {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, notifying subscribers if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be stored.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<String>;

    /// Returns the configured poll interval preset.
    fn poll_interval(&self) -> PollInterval {
        PollInterval::from_pref(self.get(POLL_INTERVAL_KEY).as_deref())
    }

    /// Returns the configured retention preset.
    fn ttl(&self) -> Ttl {
        Ttl::from_pref(self.get(TTL_KEY).as_deref())
    }
}
