//! In-memory collaborators for exercising the relay without external tools.
//!
//! Every fake counts its calls; the fetcher and trimmer write sparse files of
//! a chosen size so size and cleanup checks see real files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mux_media::{MediaError, MediaResult};
use mux_models::{LocalArtifact, ProbeResult, PublishResult};
use mux_storage::{generate_public_id, StorageError, StorageResult};

use crate::capabilities::{Collaborators, DurationReader, Fetcher, Prober, Publisher, Trimmer};

async fn write_sparse(path: &Path, size: u64) -> MediaResult<()> {
    let file = tokio::fs::File::create(path).await?;
    file.set_len(size).await?;
    Ok(())
}

fn tool_error(tool: &'static str, message: &str) -> MediaError {
    MediaError::ToolFailed {
        tool,
        message: message.to_string(),
        exit_code: Some(1),
    }
}

/// Probe returning a fixed answer, or failing every attempt.
#[derive(Debug, Default)]
pub struct FakeProber {
    result: Option<ProbeResult>,
    calls: AtomicUsize,
}

impl FakeProber {
    pub fn returning(result: ProbeResult) -> Self {
        Self {
            result: Some(result),
            calls: AtomicUsize::new(0),
        }
    }

    /// Media of the given duration.
    pub fn with_duration(seconds: f64) -> Self {
        Self::returning(ProbeResult {
            duration_seconds: Some(seconds),
            has_media: true,
        })
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, _url: &str) -> MediaResult<ProbeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .ok_or_else(|| tool_error("yt-dlp", "ERROR: Unable to extract metadata"))
    }
}

/// Fetch writing a file of `size` bytes after `failures` failed attempts.
#[derive(Debug)]
pub struct FakeFetcher {
    size: u64,
    failures: usize,
    delay: Duration,
    stall: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn writing(size: u64) -> Self {
        Self::flaky(0, size)
    }

    /// Fail the first `failures` attempts, then succeed.
    pub fn flaky(failures: usize, size: u64) -> Self {
        Self {
            size,
            failures,
            delay: Duration::ZERO,
            stall: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::flaky(usize::MAX, 0)
    }

    /// Hold each attempt open for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Write a partial download, then hang for `stall` before finishing.
    pub fn stalling(size: u64, stall: Duration) -> Self {
        Self {
            stall,
            ..Self::writing(size)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of attempts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn attempt(&self, call: usize, dest: &Path) -> MediaResult<LocalArtifact> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.stall.is_zero() {
            write_sparse(&dest.with_extension("mp4.part"), self.size / 2).await?;
            write_sparse(dest, self.size / 2).await?;
            tokio::time::sleep(self.stall).await;
        }
        if call < self.failures {
            // Leave a partial file behind like an interrupted download
            write_sparse(&dest.with_extension("mp4.part"), 16).await?;
            return Err(tool_error("yt-dlp", "ERROR: HTTP Error 403: Forbidden"));
        }
        write_sparse(dest, self.size).await?;
        Ok(LocalArtifact::new(dest, self.size))
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> MediaResult<LocalArtifact> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = self.attempt(call, dest).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Duration read returning a fixed value, or failing.
#[derive(Debug, Default)]
pub struct FakeDurationReader {
    seconds: Option<f64>,
    calls: AtomicUsize,
}

impl FakeDurationReader {
    pub fn returning(seconds: f64) -> Self {
        Self {
            seconds: Some(seconds),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurationReader for FakeDurationReader {
    async fn duration(&self, _path: &Path) -> MediaResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seconds
            .ok_or_else(|| MediaError::invalid_output("ffprobe", "N/A"))
    }
}

/// One recorded trim invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimCall {
    pub input: PathBuf,
    pub output: PathBuf,
    pub max_seconds: u64,
}

/// Trim writing an output of `size` bytes, or failing.
#[derive(Debug, Default)]
pub struct FakeTrimmer {
    size: Option<u64>,
    calls: Mutex<Vec<TrimCall>>,
}

impl FakeTrimmer {
    pub fn writing(size: u64) -> Self {
        Self {
            size: Some(size),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TrimCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Trimmer for FakeTrimmer {
    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        max_seconds: u64,
    ) -> MediaResult<LocalArtifact> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(TrimCall {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                max_seconds,
            });
        }
        let size = self
            .size
            .ok_or_else(|| tool_error("ffmpeg", "Invalid data found when processing input"))?;
        write_sparse(output, size).await?;
        Ok(LocalArtifact::new(output, size))
    }
}

/// How the fake publisher answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishBehavior {
    Succeed,
    Reject,
    Transport,
    Panic,
}

/// What the publisher saw for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: PathBuf,
    /// Size on disk at publish time; `None` if the file was missing
    pub size_bytes: Option<u64>,
}

/// Publisher recording uploads and answering per `PublishBehavior`.
#[derive(Debug)]
pub struct FakePublisher {
    behavior: PublishBehavior,
    uploads: Mutex<Vec<Upload>>,
}

impl FakePublisher {
    pub fn new(behavior: PublishBehavior) -> Self {
        Self {
            behavior,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(PublishBehavior::Succeed)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.uploads().len()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, artifact: &LocalArtifact) -> StorageResult<PublishResult> {
        let size_bytes = tokio::fs::metadata(&artifact.path).await.ok().map(|m| m.len());
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(Upload {
                path: artifact.path.clone(),
                size_bytes,
            });
        }

        match self.behavior {
            PublishBehavior::Succeed => {
                let remote_id = generate_public_id();
                Ok(PublishResult {
                    secure_url: format!(
                        "https://res.cloudinary.com/test/video/upload/{remote_id}.mp4"
                    ),
                    thumbnail_url: format!(
                        "https://res.cloudinary.com/test/video/upload/{remote_id}.jpg"
                    ),
                    remote_id,
                })
            }
            PublishBehavior::Reject => Err(StorageError::Rejected {
                status: 400,
                body: "{\"error\":{\"message\":\"Upload preset not found\"}}".to_string(),
            }),
            PublishBehavior::Transport => {
                Err(StorageError::Transport("connection reset by peer".to_string()))
            }
            PublishBehavior::Panic => panic!("publisher exploded"),
        }
    }
}

/// A full set of fakes, keeping typed handles for assertions.
#[derive(Debug, Clone)]
pub struct FakeTools {
    pub prober: Arc<FakeProber>,
    pub fetcher: Arc<FakeFetcher>,
    pub duration_reader: Arc<FakeDurationReader>,
    pub trimmer: Arc<FakeTrimmer>,
    pub publisher: Arc<FakePublisher>,
}

impl Default for FakeTools {
    /// A 30 second, 1 KiB source that publishes successfully.
    fn default() -> Self {
        Self {
            prober: Arc::new(FakeProber::with_duration(30.0)),
            fetcher: Arc::new(FakeFetcher::writing(1024)),
            duration_reader: Arc::new(FakeDurationReader::returning(30.0)),
            trimmer: Arc::new(FakeTrimmer::writing(512)),
            publisher: Arc::new(FakePublisher::succeeding()),
        }
    }
}

impl FakeTools {
    pub fn with_prober(mut self, prober: FakeProber) -> Self {
        self.prober = Arc::new(prober);
        self
    }

    pub fn with_fetcher(mut self, fetcher: FakeFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_duration_reader(mut self, reader: FakeDurationReader) -> Self {
        self.duration_reader = Arc::new(reader);
        self
    }

    pub fn with_trimmer(mut self, trimmer: FakeTrimmer) -> Self {
        self.trimmer = Arc::new(trimmer);
        self
    }

    pub fn with_publisher(mut self, publisher: FakePublisher) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }

    /// Total calls into any external collaborator.
    pub fn total_calls(&self) -> usize {
        self.prober.calls()
            + self.fetcher.calls()
            + self.duration_reader.calls()
            + self.trimmer.calls().len()
            + self.publisher.calls()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            prober: self.prober.clone(),
            fetcher: self.fetcher.clone(),
            duration_reader: self.duration_reader.clone(),
            trimmer: self.trimmer.clone(),
            publisher: self.publisher.clone(),
        }
    }
}
