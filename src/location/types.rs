//! Location data types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::generate_user_id;

/// Returns the current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A single raw location sample from the device's location capability.
///
/// Carries only what the publisher needs: coordinates and the time the
/// sample was taken (epoch milliseconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the fix was taken (epoch milliseconds).
    pub time: i64,
}

impl Fix {
    /// Creates a new fix.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, time: i64) -> Self {
        Self {
            latitude,
            longitude,
            time,
        }
    }
}

/// A location attributed to a user.
///
/// This is the record exchanged with the remote API and stored locally.
/// It serializes to the compact form `{"id", "lat", "lon", "time"}`.
///
/// Two locations are equal iff all four fields match.
///
/// # Example
///
/// ```
/// use whereat_core::location::UserLocation;
///
/// let loc = UserLocation::create("abc", 40.7, -73.9, 1_000);
/// let json = loc.to_json().unwrap();
/// assert_eq!(json, r#"{"id":"abc","lat":40.7,"lon":-73.9,"time":1000}"#);
/// assert_eq!(UserLocation::from_json(&json).unwrap(), loc);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    /// Durable identifier of the user this location belongs to.
    pub id: String,

    /// Latitude in degrees.
    #[serde(rename = "lat")]
    pub latitude: f64,

    /// Longitude in degrees.
    #[serde(rename = "lon")]
    pub longitude: f64,

    /// When the location was recorded (epoch milliseconds).
    pub time: i64,
}

impl UserLocation {
    /// Creates a location from its four fields.
    #[must_use]
    pub fn create(id: impl Into<String>, latitude: f64, longitude: f64, time: i64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            time,
        }
    }

    /// Converts a raw fix into a location owned by `id`.
    #[must_use]
    pub fn with_id(id: impl Into<String>, fix: &Fix) -> Self {
        Self::create(id, fix.latitude, fix.longitude, fix.time)
    }

    /// Converts a raw fix into a location with a freshly generated id.
    ///
    /// Every call produces a different id, so two conversions of the same
    /// fix never compare equal.
    #[must_use]
    pub fn value_of(fix: &Fix) -> Self {
        Self::with_id(generate_user_id(&mut rand::thread_rng()), fix)
    }

    /// Parses a location from its JSON record.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or missing required fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes this location to its JSON record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (non-finite coordinates
    /// serialize as `null` and do not fail).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a JSON array of location records, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of valid records.
    pub fn from_json_list(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes locations as a JSON array, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_list(locations: &[Self]) -> Result<String, serde_json::Error> {
        serde_json::to_string(locations)
    }
}

/// Outbound payload for the remote update call.
///
/// Flattens the [`UserLocation`] fields and adds `sentAt`, so the server can
/// judge how stale the location was when it left the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocationTimestamped {
    /// The location being published.
    #[serde(flatten)]
    pub location: UserLocation,

    /// When the payload was sent (epoch milliseconds).
    #[serde(rename = "sentAt")]
    pub sent_at: i64,
}

impl UserLocationTimestamped {
    /// Wraps a location with an explicit send time.
    #[must_use]
    pub const fn new(location: UserLocation, sent_at: i64) -> Self {
        Self { location, sent_at }
    }

    /// Wraps a location stamped with the current time.
    #[must_use]
    pub fn now(location: UserLocation) -> Self {
        Self::new(location, now_millis())
    }
}

/// Free-text status returned by remote delete operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Human-readable status, e.g. `"Database erased. 4 record(s) deleted."`.
    pub msg: String,
}

impl ApiMessage {
    /// Creates a message from text.
    #[must_use]
    pub fn of(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}
