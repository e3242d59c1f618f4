//! External collaborators of the relay pipeline.
//!
//! Each trait covers one attempt of one external operation. Retry policy,
//! gating and cleanup live in the orchestrator, so tests can swap any of
//! these for an in-memory fake.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mux_media::{trim_to_duration, FfmpegRunner, FfprobeRunner, MediaResult, YtDlp, YtDlpOptions};
use mux_models::{LocalArtifact, ProbeResult, PublishResult};
use mux_storage::{CloudinaryClient, StorageResult};

use crate::config::RelayConfig;

/// Metadata-only lookup of a source URL.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> MediaResult<ProbeResult>;
}

/// Download of a source URL into a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fill `dest`. A missing or empty file afterwards is an error.
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<LocalArtifact>;
}

/// Container duration of a local file.
#[async_trait]
pub trait DurationReader: Send + Sync {
    async fn duration(&self, path: &Path) -> MediaResult<f64>;
}

/// Stream-copy truncation of a local file.
#[async_trait]
pub trait Trimmer: Send + Sync {
    async fn trim(&self, input: &Path, output: &Path, max_seconds: u64)
        -> MediaResult<LocalArtifact>;
}

/// Upload of a local file to the hosting service.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, artifact: &LocalArtifact) -> StorageResult<PublishResult>;
}

/// yt-dlp metadata probe bounded by a per-attempt deadline.
#[derive(Debug, Clone)]
pub struct YtDlpProber {
    ytdlp: YtDlp,
    timeout: Duration,
}

impl YtDlpProber {
    pub fn new(ytdlp: YtDlp, timeout: Duration) -> Self {
        Self { ytdlp, timeout }
    }
}

#[async_trait]
impl Prober for YtDlpProber {
    async fn probe(&self, url: &str) -> MediaResult<ProbeResult> {
        self.ytdlp.probe(url, self.timeout).await
    }
}

/// yt-dlp download bounded by a per-attempt deadline.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    ytdlp: YtDlp,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(ytdlp: YtDlp, timeout: Duration) -> Self {
        Self { ytdlp, timeout }
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<LocalArtifact> {
        let size = self.ytdlp.download(url, dest, self.timeout).await?;
        Ok(LocalArtifact::new(dest, size))
    }
}

#[async_trait]
impl DurationReader for FfprobeRunner {
    async fn duration(&self, path: &Path) -> MediaResult<f64> {
        FfprobeRunner::duration(self, path).await
    }
}

#[async_trait]
impl Trimmer for FfmpegRunner {
    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        max_seconds: u64,
    ) -> MediaResult<LocalArtifact> {
        let size = trim_to_duration(self, input, output, max_seconds).await?;
        Ok(LocalArtifact::new(output, size))
    }
}

#[async_trait]
impl Publisher for CloudinaryClient {
    async fn publish(&self, artifact: &LocalArtifact) -> StorageResult<PublishResult> {
        self.upload_video(&artifact.path).await
    }
}

/// The full set of collaborators one relay uses.
#[derive(Clone)]
pub struct Collaborators {
    pub prober: Arc<dyn Prober>,
    pub fetcher: Arc<dyn Fetcher>,
    pub duration_reader: Arc<dyn DurationReader>,
    pub trimmer: Arc<dyn Trimmer>,
    pub publisher: Arc<dyn Publisher>,
}

impl Collaborators {
    /// Real tool-backed collaborators.
    pub fn from_config(
        config: &RelayConfig,
        ytdlp: YtDlpOptions,
        publisher: CloudinaryClient,
    ) -> Self {
        let ytdlp = YtDlp::new(ytdlp);
        Self {
            prober: Arc::new(YtDlpProber::new(ytdlp.clone(), config.probe_timeout)),
            fetcher: Arc::new(YtDlpFetcher::new(ytdlp, config.fetch_timeout)),
            duration_reader: Arc::new(FfprobeRunner::new(
                config.ffprobe_bin.clone(),
                config.duration_timeout,
            )),
            trimmer: Arc::new(FfmpegRunner::new(
                config.ffmpeg_bin.clone(),
                config.trim_timeout,
            )),
            publisher: Arc::new(publisher),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ytdlp_fetcher_without_output_fails() {
        let dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new(
            YtDlp::new(YtDlpOptions {
                program: PathBuf::from("true"),
                ..YtDlpOptions::default()
            }),
            Duration::from_secs(5),
        );

        let err = fetcher
            .fetch("https://v.redd.it/abc123", &dir.path().join("x.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, mux_media::MediaError::EmptyOutput(_)));
    }

    #[tokio::test]
    async fn test_ffmpeg_trimmer_missing_binary() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("raw.mp4");
        std::fs::write(&input, b"data").unwrap();

        let trimmer = FfmpegRunner::new("/nonexistent/ffmpeg", Duration::from_secs(5));
        let err = Trimmer::trim(&trimmer, &input, &dir.path().join("raw.cut.mp4"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, mux_media::MediaError::ToolNotFound { .. }));
    }
}
