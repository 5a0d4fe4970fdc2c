//! Error types for local location storage.
//!
//! Storage failures never stop the publisher: they are logged where they
//! happen and the operation carries on without the stored record.

use thiserror::Error;

/// Error type for local storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The store has not been connected, or was disconnected.
    #[error("Location store is not connected")]
    NotConnected,

    /// A stored row could not be turned back into a location.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let err = StoreError::Storage("test error".to_string());
        assert_eq!(err.to_string(), "Storage error: test error");
    }

    #[test]
    fn not_connected_error_display() {
        assert_eq!(
            StoreError::NotConnected.to_string(),
            "Location store is not connected"
        );
    }

    #[test]
    fn invalid_data_error_display() {
        let err = StoreError::InvalidData("empty user id".to_string());
        assert_eq!(err.to_string(), "Invalid data: empty user id");
    }

    #[test]
    fn database_error_converts() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }
}
