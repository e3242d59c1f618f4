//! Source metadata and video download using yt-dlp.
//!
//! Both operations share the same politeness flags (request sleeps, socket
//! timeout, tool-internal retries, single fragment stream) so that a burst of
//! relay requests does not trip upstream rate limiting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use mux_models::ProbeResult;

use crate::error::{MediaError, MediaResult};
use crate::process::run_tool;

/// Format selection: best video+audio, single merged mp4, at most 720p.
const FORMAT_SELECTOR: &str = "bv*+ba/b";
const FORMAT_SORT: &str = "res:720,ext:mp4";
const MERGE_FORMAT: &str = "mp4";

/// Default desktop browser user agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// yt-dlp invocation settings.
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    /// yt-dlp binary
    pub program: PathBuf,
    /// Tool-internal HTTP retries
    pub retries: u32,
    /// Tool-internal fragment retries
    pub fragment_retries: u32,
    /// Socket timeout in seconds
    pub socket_timeout_secs: u64,
    /// Sleep between metadata requests in seconds
    pub sleep_requests_secs: f64,
    /// Concurrent fragment downloads
    pub concurrent_fragments: u32,
    /// User agent header
    pub user_agent: String,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            retries: 5,
            fragment_retries: 5,
            socket_timeout_secs: 20,
            sleep_requests_secs: 1.0,
            concurrent_fragments: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl YtDlpOptions {
    /// Create options from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            program: std::env::var("YTDLP_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.program),
            retries: std::env::var("YTDLP_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retries),
            fragment_retries: std::env::var("YTDLP_FRAGMENT_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fragment_retries),
            socket_timeout_secs: std::env::var("YTDLP_SOCKET_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.socket_timeout_secs),
            sleep_requests_secs: std::env::var("YTDLP_SLEEP_REQUESTS_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sleep_requests_secs),
            concurrent_fragments: defaults.concurrent_fragments,
            user_agent: std::env::var("YTDLP_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Flags shared by metadata and download invocations.
    fn common_args(&self) -> Vec<OsString> {
        [
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.fragment_retries.to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout_secs.to_string(),
            "--sleep-requests".to_string(),
            self.sleep_requests_secs.to_string(),
            "--concurrent-fragments".to_string(),
            self.concurrent_fragments.to_string(),
            "--user-agent".to_string(),
            self.user_agent.clone(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }
}

/// Subset of `--dump-single-json` output the relay cares about.
#[derive(Debug, Default, Deserialize)]
struct SourceInfo {
    duration: Option<f64>,
    #[serde(default)]
    formats: Option<Vec<serde_json::Value>>,
    url: Option<String>,
}

impl SourceInfo {
    fn into_probe_result(self) -> ProbeResult {
        let duration_seconds = self.duration.filter(|d| *d > 0.0);
        let has_formats = self.formats.as_ref().is_some_and(|f| !f.is_empty());
        let has_url = self.url.as_ref().is_some_and(|u| !u.is_empty());

        ProbeResult {
            duration_seconds,
            has_media: duration_seconds.is_some() || has_formats || has_url,
        }
    }
}

/// Parse probe output. yt-dlp may print warnings before the JSON document, so
/// the last non-empty line is taken.
fn parse_probe_output(stdout: &[u8]) -> MediaResult<ProbeResult> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MediaError::invalid_output("yt-dlp", "empty metadata output"))?;

    let info: SourceInfo = serde_json::from_str(line)?;
    Ok(info.into_probe_result())
}

/// Driver for the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlp {
    options: YtDlpOptions,
}

impl YtDlp {
    pub fn new(options: YtDlpOptions) -> Self {
        Self { options }
    }

    /// Query source metadata without downloading the payload.
    pub async fn probe(&self, url: &str, timeout: Duration) -> MediaResult<ProbeResult> {
        let mut args = self.options.common_args();
        args.extend(
            ["--dump-single-json", "--skip-download", "--no-warnings", url]
                .into_iter()
                .map(OsString::from),
        );

        let output = run_tool("yt-dlp", &self.options.program, args.as_slice(), timeout).await?;
        let result = parse_probe_output(&output.stdout)?;

        debug!(
            url = %url,
            duration = ?result.duration_seconds,
            has_media = result.has_media,
            "Probed source"
        );
        Ok(result)
    }

    /// Download `url` into `output_path` as a single merged mp4.
    ///
    /// Returns the size of the downloaded file. A run that exits zero but
    /// leaves no (or a zero-byte) file is treated as a failure.
    pub async fn download(
        &self,
        url: &str,
        output_path: impl AsRef<Path>,
        timeout: Duration,
    ) -> MediaResult<u64> {
        let output_path = output_path.as_ref();

        info!(
            "Downloading video from {} to {}",
            url,
            output_path.display()
        );

        let mut args = self.options.common_args();
        args.extend(
            [
                "-f",
                FORMAT_SELECTOR,
                "--merge-output-format",
                MERGE_FORMAT,
                "-S",
                FORMAT_SORT,
                "-o",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output_path.as_os_str().to_os_string());
        args.push(url.into());

        let result = run_tool("yt-dlp", &self.options.program, args.as_slice(), timeout).await;

        if let Err(MediaError::ToolFailed { message, .. }) = &result {
            let rate_limited = message.contains("429")
                || message.contains("Too Many Requests")
                || message.contains("rate limit");
            if rate_limited {
                warn!(url = %url, "Upstream rate limit detected");
            }
        }
        result?;

        let file_size = match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(MediaError::EmptyOutput(output_path.to_path_buf())),
        };

        info!(
            output = %output_path.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(file_size)
    }
}
