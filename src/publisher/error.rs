//! Error types for the publisher handle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::prefs::PreferenceError;

/// Errors returned by [`LocationPublisher`](super::LocationPublisher).
///
/// Operational failures (no fix, remote errors, storage errors) are not
/// returned here; they are reported as events or logged.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The publisher task has shut down.
    #[error("Location publisher is not running")]
    Closed,

    /// No tokio runtime was available to spawn the publisher task.
    #[error("Location publisher requires a tokio runtime")]
    NoRuntime,

    /// The configuration has an unusable value.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The durable user id could not be loaded or persisted.
    #[error("Preference error: {0}")]
    Preferences(#[from] PreferenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_error_display() {
        assert_eq!(
            PublisherError::Closed.to_string(),
            "Location publisher is not running"
        );
    }

    #[test]
    fn config_error_converts() {
        let err: PublisherError =
            ConfigError::Invalid("event_capacity must be positive".into()).into();
        assert_eq!(err.to_string(), "Invalid config: event_capacity must be positive");
    }

    #[test]
    fn preference_error_converts() {
        let err: PublisherError = PreferenceError::Lock("poisoned".into()).into();
        assert_eq!(
            err.to_string(),
            "Preference error: Preference lock poisoned: poisoned"
        );
    }
}
