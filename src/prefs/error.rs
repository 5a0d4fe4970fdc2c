//! Error types for preference storage.

use thiserror::Error;

/// Errors that can occur while reading or writing preferences.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Reading or writing the preference file failed.
    #[error("Preference I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The preference file is not valid JSON.
    #[error("Preference serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The preference lock was poisoned.
    #[error("Preference lock poisoned: {0}")]
    Lock(String),
}
