//! Media relay pipeline.
//!
//! This crate provides:
//! - The request orchestrator with a global concurrency gate
//! - Capability traits over yt-dlp, ffprobe, ffmpeg and Cloudinary
//! - Probe and fetch retry policies
//! - Per-request temp file namespacing and guaranteed cleanup

pub mod capabilities;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod workspace;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capabilities::{
    Collaborators, DurationReader, Fetcher, Prober, Publisher, Trimmer, YtDlpFetcher, YtDlpProber,
};
pub use config::{PreflightPolicy, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use logging::RelayLogger;
pub use orchestrator::{Relay, RelayStage};
pub use retry::{retry_async, Backoff, RetryConfig, RetryResult};
pub use workspace::{prepare_work_dir, RequestFiles};
