//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while publishing to the hosting service.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    /// The service answered with a non-success status.
    #[error("Upload rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The service answered 2xx but the body was not usable.
    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),

    /// The request never completed (connect, TLS, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
