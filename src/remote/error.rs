//! Error types for remote location API calls.

use thiserror::Error;

/// Errors that can occur while talking to the remote location API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The HTTP request could not be completed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, if any.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid API base URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Timeout waiting for the call to resolve.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
