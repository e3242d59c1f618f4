//! Structured request logging utilities.

use tracing::{error, info, warn, Span};

/// Request logger with consistent contextual fields.
///
/// Every line carries the request token (which also names the temp files)
/// and the caller's correlation id.
#[derive(Debug, Clone)]
pub struct RelayLogger {
    token: String,
    correlation_id: String,
}

impl RelayLogger {
    pub fn new(token: &str, correlation_id: &str) -> Self {
        Self {
            token: token.to_string(),
            correlation_id: correlation_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            token = %self.token,
            correlation_id = %self.correlation_id,
            "Relay started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            token = %self.token,
            correlation_id = %self.correlation_id,
            "Relay progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            token = %self.token,
            correlation_id = %self.correlation_id,
            "Relay warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            token = %self.token,
            correlation_id = %self.correlation_id,
            "Relay error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            token = %self.token,
            correlation_id = %self.correlation_id,
            "Relay completed: {}", message
        );
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Span attached to the whole pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "relay",
            token = %self.token,
            correlation_id = %self.correlation_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_logger_fields() {
        let logger = RelayLogger::new("a1b2c3", "t3_abc");
        assert_eq!(logger.token(), "a1b2c3");
        assert_eq!(logger.correlation_id(), "t3_abc");

        // Logging without a subscriber must not panic
        logger.log_start("test");
        logger.log_progress("test");
        logger.log_warning("test");
        logger.log_error("test");
        logger.log_completion("test");
    }
}
