//! Retry utilities with linear or scheduled backoff.
//!
//! The probe spaces its attempts linearly; the fetch follows an explicit
//! delay schedule.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::metrics;

/// Delay policy between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backoff {
    /// `step * n` before retry `n` (1-based).
    Linear(Duration),
    /// Explicit delay before each retry; the last entry repeats if the
    /// schedule is shorter than the retry count.
    Schedule(Vec<Duration>),
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Delay policy.
    pub backoff: Backoff,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::Linear(Duration::from_secs(2)),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// `attempts` total tries spaced `step`, `2*step`, ...
    pub fn linear(operation_name: impl Into<String>, attempts: u32, step: Duration) -> Self {
        Self::new(operation_name)
            .with_max_retries(attempts.saturating_sub(1))
            .with_backoff(Backoff::Linear(step))
    }

    /// One retry per schedule entry.
    pub fn scheduled(operation_name: impl Into<String>, delays: Vec<Duration>) -> Self {
        Self::new(operation_name)
            .with_max_retries(delays.len() as u32)
            .with_backoff(Backoff::Schedule(delays))
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before retry `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Linear(step) => step.saturating_mul(attempt),
            Backoff::Schedule(delays) => {
                let index = (attempt.saturating_sub(1) as usize).min(delays.len().saturating_sub(1));
                delays.get(index).copied().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Doubling schedule: `base`, `2*base`, `4*base`, ...
pub fn exponential_schedule(base: Duration, retries: u32) -> Vec<Duration> {
    (0..retries)
        .map(|n| base.saturating_mul(2u32.saturating_pow(n)))
        .collect()
}

/// Result of a retry operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded.
    Success(T),
    /// Operation failed after all retries exhausted.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Execute an async operation with retry logic.
///
/// `operation` is called once per attempt and must build a fresh future each
/// time.
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, operation: F) -> RetryResult<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, delay, e
                );
                metrics::record_retry(&config.operation_name);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!(
                    "{} gave up after {} attempts",
                    config.operation_name,
                    attempt + 1
                );
                return RetryResult::Failed {
                    error: e,
                    attempts: attempt + 1,
                };
            }
        }
    }
}
