//! Relay error types.

use thiserror::Error;

use mux_media::MediaError;
use mux_models::ErrorKind;
use mux_storage::StorageError;

/// Result type for relay pipeline stages.
pub type RelayResult<T> = Result<T, RelayError>;

/// Terminal pipeline failures. Each maps to exactly one response error kind.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Preflight found no media at source")]
    PreflightUnavailable,

    #[error("Fetch failed after {attempts} attempts: {message}")]
    FetchFailed { attempts: u32, message: String },

    #[error("Trim failed: {0}")]
    TrimFailed(#[source] MediaError),

    #[error("File size {size_bytes} bytes exceeds limit of {max_bytes} bytes")]
    TooLarge { size_bytes: u64, max_bytes: u64 },

    #[error("{0}")]
    PublishRejected(#[source] StorageError),

    #[error("{0}")]
    PublishTransport(#[source] StorageError),

    #[error("{0}")]
    Unexpected(String),
}

impl RelayError {
    /// Error kind reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::PreflightUnavailable => ErrorKind::PreflightUnavailable,
            RelayError::FetchFailed { .. } => ErrorKind::FetchFailed,
            RelayError::TrimFailed(_) => ErrorKind::TrimFailed,
            RelayError::TooLarge { .. } => ErrorKind::SkippedTooLarge,
            RelayError::PublishRejected(_) => ErrorKind::PublishFailed,
            RelayError::PublishTransport(_) => ErrorKind::PublishTransportError,
            RelayError::Unexpected(_) => ErrorKind::UnexpectedError,
        }
    }
}

impl From<StorageError> for RelayError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Transport(_) => Self::PublishTransport(e),
            StorageError::Rejected { .. } | StorageError::InvalidResponse(_) => {
                Self::PublishRejected(e)
            }
            // Local failures before anything went over the wire
            StorageError::ConfigError(_) | StorageError::Io(_) => Self::Unexpected(e.to_string()),
        }
    }
}
