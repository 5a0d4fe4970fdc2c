//! Remote location API.
//!
//! The API receives the device's location and answers with the current
//! locations of the other users, and can erase a user's stored locations.
//!
//! # Endpoints
//!
//! | Call | Request | Response |
//! |------|---------|----------|
//! | `POST {base}/locations/update` | [`UserLocationTimestamped`] | `[UserLocation]` |
//! | `POST {base}/locations/remove` | [`UserLocation`] | [`ApiMessage`] |

mod error;
mod http;

use futures::future::BoxFuture;

pub use error::{RemoteError, RemoteResult};
pub use http::HttpLocationService;

use crate::location::{ApiMessage, UserLocation, UserLocationTimestamped};

/// One-shot asynchronous calls against the remote location API.
///
/// The returned futures are `'static` so callers can spawn them; callers
/// own timeouts and cancellation.
pub trait RemoteLocationService: Send + Sync {
    /// Publishes a location and returns the other users' current locations
    /// in server order.
    fn update(
        &self,
        location: UserLocationTimestamped,
    ) -> BoxFuture<'static, RemoteResult<Vec<UserLocation>>>;

    /// Deletes every location stored remotely for the location's user.
    fn remove(&self, location: UserLocation) -> BoxFuture<'static, RemoteResult<ApiMessage>>;
}
