//! Relay metrics.
//!
//! Recorded through the `metrics` facade; whether anything is exported is
//! decided by the binary installing a recorder.

use metrics::{counter, gauge, histogram};

/// Metric names.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "mux_relay_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "mux_relay_request_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "mux_relay_stage_duration_seconds";
    pub const RETRIES_TOTAL: &str = "mux_relay_retries_total";
    pub const WAITING_REQUESTS: &str = "mux_relay_waiting_requests";
}

/// Record a finished relay request.
pub fn record_outcome(outcome: &'static str, duration_secs: f64) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

/// Record time spent in one pipeline stage.
pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

/// Record a retry of an external operation.
pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Track requests waiting on the concurrency gate.
pub fn waiting_changed(delta: f64) {
    gauge!(names::WAITING_REQUESTS).increment(delta);
}
