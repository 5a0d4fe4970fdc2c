//! Publisher configuration.
//!
//! Settings the user does not control: timeouts, the retention check
//! cadence, and where things live. Loaded from a JSON file whose fields are
//! all optional:
//!
//! ```json
//! {
//!   "forget_interval_ms": 60000,
//!   "request_timeout_ms": 30000,
//!   "event_capacity": 256,
//!   "api_base_url": "https://whereat.example.org/api",
//!   "database_file": "locations.db",
//!   "preferences_file": "preferences.json"
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Static configuration for the location publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// How often the retention scheduler checks for expired locations (ms).
    pub forget_interval_ms: u64,

    /// Upper bound on a single remote API call (ms).
    pub request_timeout_ms: u64,

    /// Events buffered per event-bus subscriber.
    pub event_capacity: usize,

    /// Root URL of the remote location API.
    pub api_base_url: String,

    /// Location database file name, relative to the data directory.
    pub database_file: String,

    /// Preference file name, relative to the data directory.
    pub preferences_file: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            forget_interval_ms: 60_000,
            request_timeout_ms: 30_000,
            event_capacity: 256,
            api_base_url: "https://whereat.example.org/api".to_string(),
            database_file: "locations.db".to_string(),
            preferences_file: "preferences.json".to_string(),
        }
    }
}

impl PublisherConfig {
    /// Parses configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file, using defaults if the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forget_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "forget_interval_ms must be positive".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_capacity must be positive".to_string(),
            ));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url is empty".to_string()));
        }
        Ok(())
    }

    /// Retention check interval.
    #[must_use]
    pub const fn forget_interval(&self) -> Duration {
        Duration::from_millis(self.forget_interval_ms)
    }

    /// Remote call timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PublisherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forget_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = PublisherConfig::from_json(r#"{"request_timeout_ms": 500}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = PublisherConfig::from_json(r#"{"request_timeout_ms": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = PublisherConfig::from_json(r#"{"api_base_url": " "}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = PublisherConfig::from_json("{");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PublisherConfig::from_file(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, PublisherConfig::default());
    }

    #[test]
    fn file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"forget_interval_ms": 1000}"#).unwrap();

        let config = PublisherConfig::from_file(&path).unwrap();
        assert_eq!(config.forget_interval(), Duration::from_secs(1));
    }
}
