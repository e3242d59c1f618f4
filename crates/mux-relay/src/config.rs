//! Relay configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mux_models::DEFAULT_SOURCE_URL_PREFIX;

use crate::retry::exponential_schedule;

/// What to do when the preflight probe cannot confirm media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreflightPolicy {
    /// Treat the probe as a hint; the fetch decides.
    #[default]
    Lenient,
    /// End the request when the probe finds no media.
    Strict,
}

impl PreflightPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreflightPolicy::Lenient => "lenient",
            PreflightPolicy::Strict => "strict",
        }
    }
}

impl FromStr for PreflightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown preflight mode: {other}")),
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Required prefix of every source URL
    pub source_url_prefix: String,
    /// Duration ceiling in seconds (0 = unlimited)
    pub max_duration_seconds: u64,
    /// Upload size ceiling in bytes (0 = unlimited)
    pub max_bytes: u64,
    /// Preflight gating policy
    pub preflight: PreflightPolicy,
    /// Pipelines allowed to run at once (1 = fully serialized)
    pub max_concurrent: usize,
    /// Directory for request temp files
    pub work_dir: PathBuf,
    /// Probe attempts (including the first)
    pub probe_attempts: u32,
    /// Linear probe backoff step
    pub probe_backoff: Duration,
    /// Per-attempt probe timeout
    pub probe_timeout: Duration,
    /// Delays between fetch attempts; its length is the retry count
    pub fetch_retry_delays: Vec<Duration>,
    /// Per-attempt fetch timeout
    pub fetch_timeout: Duration,
    /// Trim timeout
    pub trim_timeout: Duration,
    /// Local duration read timeout
    pub duration_timeout: Duration,
    /// FFmpeg binary
    pub ffmpeg_bin: PathBuf,
    /// FFprobe binary
    pub ffprobe_bin: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source_url_prefix: DEFAULT_SOURCE_URL_PREFIX.to_string(),
            max_duration_seconds: 240,
            max_bytes: 0,
            preflight: PreflightPolicy::Lenient,
            max_concurrent: 1,
            work_dir: std::env::temp_dir().join("mux-relay"),
            probe_attempts: 3,
            probe_backoff: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(45),
            fetch_retry_delays: exponential_schedule(Duration::from_secs(10), 3),
            fetch_timeout: Duration::from_secs(900),
            trim_timeout: Duration::from_secs(600),
            duration_timeout: Duration::from_secs(30),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
        }
    }
}

impl RelayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            source_url_prefix: std::env::var("SOURCE_URL_PREFIX")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.source_url_prefix),
            max_duration_seconds: env_parse("MAX_DURATION_S").unwrap_or(defaults.max_duration_seconds),
            max_bytes: env_parse("MAX_BYTES").unwrap_or(defaults.max_bytes),
            preflight: env_parse("PREFLIGHT_MODE").unwrap_or(defaults.preflight),
            max_concurrent: env_parse::<usize>("RELAY_MAX_CONCURRENT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent),
            work_dir: std::env::var("RELAY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            probe_attempts: env_parse::<u32>("PROBE_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.probe_attempts),
            probe_backoff: env_secs("PROBE_BACKOFF_S").unwrap_or(defaults.probe_backoff),
            probe_timeout: env_secs("PROBE_TIMEOUT_S").unwrap_or(defaults.probe_timeout),
            fetch_retry_delays: std::env::var("FETCH_RETRY_DELAYS_S")
                .ok()
                .and_then(|s| parse_delays(&s))
                .unwrap_or(defaults.fetch_retry_delays),
            fetch_timeout: env_secs("FETCH_TIMEOUT_S").unwrap_or(defaults.fetch_timeout),
            trim_timeout: env_secs("TRIM_TIMEOUT_S").unwrap_or(defaults.trim_timeout),
            duration_timeout: env_secs("DURATION_TIMEOUT_S").unwrap_or(defaults.duration_timeout),
            ffmpeg_bin: std::env::var("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("FFPROBE_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_bin),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_secs)
}

/// Parse a comma separated list of seconds, e.g. "10,20,40".
/// An empty string disables retries.
fn parse_delays(s: &str) -> Option<Vec<Duration>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().ok().map(Duration::from_secs))
        .collect()
}
