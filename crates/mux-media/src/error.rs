//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the external media tools.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{tool} not found")]
    ToolNotFound { tool: &'static str },

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: &'static str,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: &'static str, secs: u64 },

    #[error("{tool} produced invalid output: {message}")]
    InvalidOutput { tool: &'static str, message: String },

    #[error("Output file missing or empty: {0}")]
    EmptyOutput(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a tool failure error from captured stderr.
    ///
    /// Only the last non-empty stderr line is kept; tools like yt-dlp put the
    /// actual reason there and the rest is noise.
    pub fn tool_failed(tool: &'static str, stderr: &str, exit_code: Option<i32>) -> Self {
        let message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("Unknown error")
            .to_string();

        Self::ToolFailed {
            tool,
            message,
            exit_code,
        }
    }

    /// Create an invalid output error.
    pub fn invalid_output(tool: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            tool,
            message: message.into(),
        }
    }

    /// Whether the failure came from a deadline rather than the tool itself.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failed_keeps_last_line() {
        let stderr = "[generic] Extracting URL\nERROR: [Reddit] abc: Requested format is not available\n\n";
        let err = MediaError::tool_failed("yt-dlp", stderr, Some(1));
        assert_eq!(
            err.to_string(),
            "yt-dlp failed: ERROR: [Reddit] abc: Requested format is not available"
        );
    }

    #[test]
    fn test_tool_failed_empty_stderr() {
        let err = MediaError::tool_failed("ffmpeg", "", None);
        assert_eq!(err.to_string(), "ffmpeg failed: Unknown error");
    }
}
