//! Location records exchanged between the device, the local store and the
//! remote API.
//!
//! - [`Fix`]: a raw sample from the device's location capability
//! - [`UserLocation`]: a fix attributed to a user, the unit of storage and
//!   publication
//! - [`UserLocationTimestamped`]: the outbound update payload
//! - [`ApiMessage`]: status text returned by remote deletes
//!
//! # Wire format
//!
//! ```text
//! {"id": "<uuid>", "lat": <double>, "lon": <double>, "time": <int64 ms>}
//! ```
//!
//! Lists serialize as JSON arrays of such records, order-preserving.
//!
//! # Example Usage
//!
//! ```
//! use whereat_core::location::{Fix, UserLocation};
//!
//! let fix = Fix::new(40.7092529, -74.0112551, 1_505_606_400_000);
//! let mine = UserLocation::with_id("my-id", &fix);
//!
//! let json = UserLocation::to_json_list(&[mine.clone()]).unwrap();
//! assert_eq!(UserLocation::from_json_list(&json).unwrap(), vec![mine]);
//! ```

pub mod types;

pub use types::{now_millis, ApiMessage, Fix, UserLocation, UserLocationTimestamped};
