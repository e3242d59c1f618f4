//! Fixed-shape relay response.
//!
//! Every outcome past input validation is rendered through this type so the
//! caller always sees the same field names, keyed by its own correlation id.

use serde::{Deserialize, Serialize};

use crate::publish::PublishResult;
use crate::request::RelayRequest;

/// Upper bound on error message length in a response.
pub const MAX_ERROR_MESSAGE_LEN: usize = 300;

/// Coarse outcome of a relay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayStatus {
    Ok,
    Skipped,
    Error,
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PreflightUnavailable,
    FetchFailed,
    TrimFailed,
    SkippedTooLarge,
    PublishFailed,
    PublishTransportError,
    UnexpectedError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PreflightUnavailable => "preflight_unavailable",
            ErrorKind::FetchFailed => "fetch_failed",
            ErrorKind::TrimFailed => "trim_failed",
            ErrorKind::SkippedTooLarge => "skipped_too_large",
            ErrorKind::PublishFailed => "publish_failed",
            ErrorKind::PublishTransportError => "publish_transport_error",
            ErrorKind::UnexpectedError => "unexpected_error",
        }
    }

    /// Status reported for this kind. Oversized files are a deliberate skip.
    pub fn status(&self) -> RelayStatus {
        match self {
            ErrorKind::SkippedTooLarge => RelayStatus::Skipped,
            _ => RelayStatus::Error,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details carried by a non-success response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Response returned to the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Success {
        status: RelayStatus,
        correlation_id: String,
        source_url: String,
        remote_id: String,
        secure_url: String,
        thumbnail_url: String,
    },
    Error {
        status: RelayStatus,
        correlation_id: String,
        source_url: String,
        error: ErrorBody,
    },
}

impl RelayResponse {
    pub fn success(request: &RelayRequest, publish: PublishResult) -> Self {
        Self::Success {
            status: RelayStatus::Ok,
            correlation_id: request.correlation_id.clone(),
            source_url: request.source_url.clone(),
            remote_id: publish.remote_id,
            secure_url: publish.secure_url,
            thumbnail_url: publish.thumbnail_url,
        }
    }

    /// Build a failure response. The message is truncated to
    /// [`MAX_ERROR_MESSAGE_LEN`] characters.
    pub fn failure(request: &RelayRequest, kind: ErrorKind, message: impl AsRef<str>) -> Self {
        Self::Error {
            status: kind.status(),
            correlation_id: request.correlation_id.clone(),
            source_url: request.source_url.clone(),
            error: ErrorBody {
                kind,
                message: truncate_chars(message.as_ref(), MAX_ERROR_MESSAGE_LEN),
            },
        }
    }

    pub fn status(&self) -> RelayStatus {
        match self {
            Self::Success { status, .. } | Self::Error { status, .. } => *status,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::Success { correlation_id, .. } | Self::Error { correlation_id, .. } => {
                correlation_id
            }
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            Self::Success { source_url, .. } | Self::Error { source_url, .. } => source_url,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error, .. } => Some(error.kind),
        }
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Self::Success { remote_id, .. } => Some(remote_id),
            Self::Error { .. } => None,
        }
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
