//! Relay orchestrator.
//!
//! Runs one request through probe, fetch, duration enforcement, size guard
//! and publish. Every request ends in exactly one [`RelayResponse`]; temp
//! files are removed before the response is handed back, on every path
//! including panics.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, warn, Instrument};

use mux_media::{file_size, MediaError};
use mux_models::{ErrorKind, LocalArtifact, ProbeResult, PublishResult, RelayRequest, RelayResponse};

use crate::capabilities::Collaborators;
use crate::config::{PreflightPolicy, RelayConfig};
use crate::error::{RelayError, RelayResult};
use crate::logging::RelayLogger;
use crate::metrics;
use crate::retry::{retry_async, RetryConfig, RetryResult};
use crate::workspace::{prepare_work_dir, RequestFiles};

/// Pipeline stage, for logs and stage timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Validating,
    Probing,
    Fetching,
    /// Duration measurement and, when needed, the trim itself
    Trimming,
    SizeChecking,
    Publishing,
    Done,
}

impl RelayStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStage::Validating => "validating",
            RelayStage::Probing => "probing",
            RelayStage::Fetching => "fetching",
            RelayStage::Trimming => "trimming",
            RelayStage::SizeChecking => "size_checking",
            RelayStage::Publishing => "publishing",
            RelayStage::Done => "done",
        }
    }
}

impl std::fmt::Display for RelayStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage plus when it started.
struct StageClock {
    stage: RelayStage,
    since: Instant,
}

impl StageClock {
    fn new() -> Self {
        Self {
            stage: RelayStage::Validating,
            since: Instant::now(),
        }
    }

    fn enter(&mut self, next: RelayStage) {
        metrics::record_stage_duration(self.stage.as_str(), self.since.elapsed().as_secs_f64());
        self.stage = next;
        self.since = Instant::now();
    }

    fn finish(mut self) -> RelayStage {
        let last = self.stage;
        if last != RelayStage::Done {
            self.enter(RelayStage::Done);
        }
        last
    }
}

/// The relay pipeline with its concurrency gate.
pub struct Relay {
    config: RelayConfig,
    tools: Collaborators,
    permits: Arc<Semaphore>,
    waiting: AtomicUsize,
}

impl Relay {
    pub fn new(config: RelayConfig, tools: Collaborators) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            tools,
            permits,
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Pipelines that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Requests currently queued on the concurrency gate.
    pub fn waiting_requests(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Create the work directory and sweep leftovers of a previous run.
    pub async fn prepare(&self) -> std::io::Result<usize> {
        let removed = prepare_work_dir(&self.config.work_dir).await?;
        if removed > 0 {
            warn!(
                dir = %self.config.work_dir.display(),
                removed,
                "Removed stale files from previous run"
            );
        }
        Ok(removed)
    }

    /// Run one validated request to completion.
    ///
    /// Waits for a free slot first; requests are admitted in arrival order.
    pub async fn handle(&self, request: &RelayRequest) -> RelayResponse {
        let started = Instant::now();

        self.waiting.fetch_add(1, Ordering::SeqCst);
        metrics::waiting_changed(1.0);
        // Released on admission and also when the caller drops us mid-wait
        let queued = scopeguard::guard((), |_| {
            self.waiting.fetch_sub(1, Ordering::SeqCst);
            metrics::waiting_changed(-1.0);
        });
        let permit = self.permits.acquire().await;
        drop(queued);
        let _permit = match permit {
            Ok(permit) => permit,
            Err(e) => {
                return RelayResponse::failure(
                    request,
                    ErrorKind::UnexpectedError,
                    format!("Concurrency gate closed: {e}"),
                )
            }
        };

        let files = RequestFiles::new(&self.config.work_dir);
        let logger = RelayLogger::new(files.token(), &request.correlation_id);
        let cleanup = scopeguard::guard(files.clone(), |files| {
            let removed = files.cleanup();
            debug!(token = %files.token(), removed, "Request files cleaned up");
        });

        logger.log_start(&request.source_url);

        let mut clock = StageClock::new();
        let outcome = AssertUnwindSafe(self.run_pipeline(request, &files, &logger, &mut clock))
            .catch_unwind()
            .instrument(logger.create_span())
            .await;
        let stage = clock.finish();

        let response = match outcome {
            Ok(Ok(published)) => {
                logger.log_completion(&format!(
                    "reached {stage}, remote_id={}",
                    published.remote_id
                ));
                RelayResponse::success(request, published)
            }
            Ok(Err(e)) => {
                let kind = e.kind();
                let message = format!("{kind} during {stage}: {e}");
                if kind == ErrorKind::SkippedTooLarge {
                    logger.log_warning(&message);
                } else {
                    logger.log_error(&message);
                }
                RelayResponse::failure(request, kind, e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                logger.log_error(&format!("{message} during {stage}"));
                RelayResponse::failure(request, ErrorKind::UnexpectedError, message)
            }
        };

        // Files go before the slot is released and before the caller sees
        // the response.
        drop(cleanup);

        let outcome = response.error_kind().map(|k| k.as_str()).unwrap_or("ok");
        metrics::record_outcome(outcome, started.elapsed().as_secs_f64());

        response
    }

    async fn run_pipeline(
        &self,
        request: &RelayRequest,
        files: &RequestFiles,
        logger: &RelayLogger,
        clock: &mut StageClock,
    ) -> RelayResult<PublishResult> {
        clock.enter(RelayStage::Probing);
        let probe = self.probe(&request.source_url).await;
        if !probe.has_media {
            match self.config.preflight {
                PreflightPolicy::Strict => return Err(RelayError::PreflightUnavailable),
                PreflightPolicy::Lenient => {
                    logger.log_warning("preflight could not confirm media, fetching anyway")
                }
            }
        }

        clock.enter(RelayStage::Fetching);
        let raw = self.fetch(&request.source_url, files).await?;
        logger.log_progress(&format!("fetched {:.2} MB", raw.size_mb()));

        clock.enter(RelayStage::Trimming);
        let candidate = self.enforce_duration(raw, &probe, files, logger).await?;

        clock.enter(RelayStage::SizeChecking);
        self.check_size(&candidate, logger).await?;

        clock.enter(RelayStage::Publishing);
        let published = self.tools.publisher.publish(&candidate).await?;

        clock.enter(RelayStage::Done);
        Ok(published)
    }

    /// Probe with linear backoff. Exhaustion yields an unknown result.
    async fn probe(&self, url: &str) -> ProbeResult {
        let retry = RetryConfig::linear("probe", self.config.probe_attempts, self.config.probe_backoff);

        match retry_async(&retry, || self.tools.prober.probe(url)).await {
            RetryResult::Success(result) => result,
            RetryResult::Failed { error, attempts } => {
                warn!(attempts, error = %error, "Probe exhausted, source state unknown");
                ProbeResult::unknown()
            }
        }
    }

    /// Fetch on the configured schedule. Each attempt starts from an empty
    /// namespace so partial downloads never leak into the next one.
    async fn fetch(&self, url: &str, files: &RequestFiles) -> RelayResult<LocalArtifact> {
        let retry = RetryConfig::scheduled("fetch", self.config.fetch_retry_delays.clone());
        let dest = files.raw_path();
        let dest = dest.as_path();

        let result = retry_async(&retry, || async move {
            files.cleanup();
            self.tools.fetcher.fetch(url, dest).await
        })
        .await;

        match result {
            RetryResult::Success(artifact) => Ok(artifact),
            RetryResult::Failed { error, attempts } => Err(RelayError::FetchFailed {
                attempts,
                message: error.to_string(),
            }),
        }
    }

    /// Trim when the file, or failing that the probe, says it runs long.
    ///
    /// A failed trim ends the request; the raw file is never published in
    /// its place.
    async fn enforce_duration(
        &self,
        raw: LocalArtifact,
        probe: &ProbeResult,
        files: &RequestFiles,
        logger: &RelayLogger,
    ) -> RelayResult<LocalArtifact> {
        let max = self.config.max_duration_seconds;
        if max == 0 {
            return Ok(raw);
        }

        let measured = match self.tools.duration_reader.duration(&raw.path).await {
            Ok(seconds) => Some(seconds),
            Err(e) => {
                logger.log_warning(&format!("duration read failed, relying on probe: {e}"));
                None
            }
        };

        let too_long = measured.is_some_and(|s| s > max as f64) || probe.exceeds(max);
        if !too_long {
            return Ok(raw);
        }

        logger.log_progress(&format!(
            "trimming to {max}s (measured {:?}, probed {:?})",
            measured, probe.duration_seconds
        ));

        let cut = self
            .tools
            .trimmer
            .trim(&raw.path, &files.cut_path(), max)
            .await
            .map_err(RelayError::TrimFailed)?;

        if cut.size_bytes == 0 {
            return Err(RelayError::TrimFailed(MediaError::EmptyOutput(cut.path)));
        }
        Ok(cut)
    }

    /// Reject the upload candidate when it exceeds the byte ceiling.
    async fn check_size(&self, candidate: &LocalArtifact, logger: &RelayLogger) -> RelayResult<()> {
        let max_bytes = self.config.max_bytes;
        if max_bytes == 0 {
            return Ok(());
        }

        match file_size(&candidate.path).await {
            Ok(size_bytes) if size_bytes > max_bytes => Err(RelayError::TooLarge {
                size_bytes,
                max_bytes,
            }),
            Ok(_) => Ok(()),
            Err(e) => {
                logger.log_warning(&format!("size check skipped: {e}"));
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("Panic: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use mux_models::RelayStatus;
    use tempfile::TempDir;

    use crate::testing::{
        FakeDurationReader, FakeFetcher, FakeProber, FakePublisher, FakeTools, FakeTrimmer,
        PublishBehavior,
    };

    fn test_config(dir: &Path) -> RelayConfig {
        RelayConfig {
            work_dir: dir.to_path_buf(),
            probe_backoff: Duration::from_millis(1),
            fetch_retry_delays: vec![Duration::from_millis(1); 3],
            ..RelayConfig::default()
        }
    }

    fn request() -> RelayRequest {
        RelayRequest {
            correlation_id: "t3_abc".to_string(),
            source_url: "https://v.redd.it/abc123".to_string(),
        }
    }

    fn assert_clean(dir: &Path) {
        let left: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(left.is_empty(), "files left behind: {left:?}");
    }

    async fn run(config: RelayConfig, tools: &FakeTools) -> RelayResponse {
        Relay::new(config, tools.collaborators()).handle(&request()).await
    }

    #[tokio::test]
    async fn test_happy_path_publishes_raw_file() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default();

        let response = run(test_config(dir.path()), &tools).await;

        assert_eq!(response.status(), RelayStatus::Ok);
        assert_eq!(response.correlation_id(), "t3_abc");
        assert_eq!(response.source_url(), "https://v.redd.it/abc123");
        assert!(response.remote_id().is_some());

        assert!(tools.trimmer.calls().is_empty());
        let uploads = tools.publisher.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].size_bytes, Some(1024));
        assert!(!uploads[0].path.to_string_lossy().contains(".cut."));
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_long_file_is_trimmed_and_cut_is_published() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_prober(FakeProber::with_duration(400.0))
            .with_fetcher(FakeFetcher::writing(10_000))
            .with_duration_reader(FakeDurationReader::returning(400.0))
            .with_trimmer(FakeTrimmer::writing(2_000));

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.status(), RelayStatus::Ok);

        let trims = tools.trimmer.calls();
        assert_eq!(trims.len(), 1);
        assert_eq!(trims[0].max_seconds, 240);
        assert!(trims[0].output.to_string_lossy().ends_with(".cut.mp4"));

        let uploads = tools.publisher.uploads();
        assert_eq!(uploads[0].path, trims[0].output);
        assert_eq!(uploads[0].size_bytes, Some(2_000));
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_probe_excess_triggers_trim_even_if_measured_short() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_prober(FakeProber::with_duration(400.0))
            .with_duration_reader(FakeDurationReader::returning(200.0));

        run(test_config(dir.path()), &tools).await;
        assert_eq!(tools.trimmer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_measured_excess_triggers_trim_with_unknown_probe() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_prober(FakeProber::returning(ProbeResult::unknown()))
            .with_duration_reader(FakeDurationReader::returning(241.5));

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.status(), RelayStatus::Ok);
        assert_eq!(tools.trimmer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_duration_read_falls_back_to_probe() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_duration_reader(FakeDurationReader::failing());

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.status(), RelayStatus::Ok);
        assert!(tools.trimmer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unlimited_duration_skips_measurement() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_prober(FakeProber::with_duration(4000.0));
        let config = RelayConfig {
            max_duration_seconds: 0,
            ..test_config(dir.path())
        };

        run(config, &tools).await;
        assert_eq!(tools.duration_reader.calls(), 0);
        assert!(tools.trimmer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_trim_failure_never_publishes_raw() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_duration_reader(FakeDurationReader::returning(400.0))
            .with_trimmer(FakeTrimmer::failing());

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::TrimFailed));
        assert_eq!(response.status(), RelayStatus::Error);
        assert_eq!(tools.publisher.calls(), 0);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_empty_trim_output_is_trim_failure() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_duration_reader(FakeDurationReader::returning(400.0))
            .with_trimmer(FakeTrimmer::writing(0));

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::TrimFailed));
        assert_eq!(tools.publisher.calls(), 0);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_oversized_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_fetcher(FakeFetcher::writing(10_000));
        let config = RelayConfig {
            max_bytes: 5_000,
            ..test_config(dir.path())
        };

        let response = run(config, &tools).await;
        assert_eq!(response.status(), RelayStatus::Skipped);
        assert_eq!(response.error_kind(), Some(ErrorKind::SkippedTooLarge));
        assert_eq!(tools.publisher.calls(), 0);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_size_guard_applies_to_trimmed_file() {
        let dir = TempDir::new().unwrap();
        let config = RelayConfig {
            max_bytes: 5_000,
            ..test_config(dir.path())
        };

        // Raw is over the ceiling, the cut is under
        let fits = FakeTools::default()
            .with_fetcher(FakeFetcher::writing(10_000))
            .with_duration_reader(FakeDurationReader::returning(400.0))
            .with_trimmer(FakeTrimmer::writing(2_000));
        let response = run(config.clone(), &fits).await;
        assert_eq!(response.status(), RelayStatus::Ok);
        assert_eq!(fits.publisher.uploads()[0].size_bytes, Some(2_000));

        // Cut still over the ceiling
        let too_big = FakeTools::default()
            .with_fetcher(FakeFetcher::writing(10_000))
            .with_duration_reader(FakeDurationReader::returning(400.0))
            .with_trimmer(FakeTrimmer::writing(8_000));
        let response = run(config, &too_big).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::SkippedTooLarge));
        assert_eq!(too_big.publisher.calls(), 0);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_exhaustion() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_fetcher(FakeFetcher::failing());

        let response = run(test_config(dir.path()), &tools).await;

        assert_eq!(response.error_kind(), Some(ErrorKind::FetchFailed));
        assert_eq!(tools.fetcher.calls(), 4);
        assert_eq!(tools.duration_reader.calls(), 0);
        assert_eq!(tools.publisher.calls(), 0);
        match &response {
            RelayResponse::Error { error, .. } => assert!(error.message.contains("403")),
            other => panic!("unexpected response: {other:?}"),
        }
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_retries() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_fetcher(FakeFetcher::flaky(2, 1024));

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.status(), RelayStatus::Ok);
        assert_eq!(tools.fetcher.calls(), 3);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_strict_preflight_stops_before_fetch() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_prober(FakeProber::failing());
        let config = RelayConfig {
            preflight: PreflightPolicy::Strict,
            ..test_config(dir.path())
        };

        let response = run(config, &tools).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::PreflightUnavailable));
        assert_eq!(tools.prober.calls(), 3);
        assert_eq!(tools.fetcher.calls(), 0);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_strict_preflight_no_media_without_retry() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_prober(FakeProber::returning(ProbeResult::unknown()));
        let config = RelayConfig {
            preflight: PreflightPolicy::Strict,
            ..test_config(dir.path())
        };

        let response = run(config, &tools).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::PreflightUnavailable));
        assert_eq!(tools.prober.calls(), 1);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_lenient_preflight_fetches_anyway() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_prober(FakeProber::failing());

        let response = run(test_config(dir.path()), &tools).await;
        assert_eq!(response.status(), RelayStatus::Ok);
        assert_eq!(tools.prober.calls(), 3);
        assert_eq!(tools.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_publish_failures_are_classified() {
        let dir = TempDir::new().unwrap();

        let rejected = FakeTools::default().with_publisher(FakePublisher::new(PublishBehavior::Reject));
        let response = run(test_config(dir.path()), &rejected).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::PublishFailed));

        let transport =
            FakeTools::default().with_publisher(FakePublisher::new(PublishBehavior::Transport));
        let response = run(test_config(dir.path()), &transport).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::PublishTransportError));

        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_panic_becomes_unexpected_error_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default().with_publisher(FakePublisher::new(PublishBehavior::Panic));

        let response = run(test_config(dir.path()), &tools).await;

        assert_eq!(response.error_kind(), Some(ErrorKind::UnexpectedError));
        assert_eq!(response.correlation_id(), "t3_abc");
        match &response {
            RelayResponse::Error { error, .. } => {
                assert!(error.message.contains("publisher exploded"))
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_repeated_requests_get_distinct_remote_ids() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default();
        let relay = Relay::new(test_config(dir.path()), tools.collaborators());

        let first = relay.handle(&request()).await;
        let second = relay.handle(&request()).await;

        assert!(first.remote_id().is_some());
        assert_ne!(first.remote_id(), second.remote_id());
    }

    #[tokio::test]
    async fn test_single_slot_serializes_pipelines() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_fetcher(FakeFetcher::writing(1024).with_delay(Duration::from_millis(50)));
        let relay = Relay::new(test_config(dir.path()), tools.collaborators());

        let req = request();
        let (a, b) = tokio::join!(relay.handle(&req), relay.handle(&req));

        assert_eq!(a.status(), RelayStatus::Ok);
        assert_eq!(b.status(), RelayStatus::Ok);
        assert_eq!(tools.fetcher.max_in_flight(), 1);
        assert_eq!(relay.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_wider_gate_allows_overlap() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_fetcher(FakeFetcher::writing(1024).with_delay(Duration::from_millis(50)));
        let config = RelayConfig {
            max_concurrent: 2,
            ..test_config(dir.path())
        };
        let relay = Relay::new(config, tools.collaborators());

        let req = request();
        tokio::join!(relay.handle(&req), relay.handle(&req));
        assert_eq!(tools.fetcher.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_queue() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_fetcher(FakeFetcher::writing(1024).with_delay(Duration::from_millis(200)));
        let relay = Relay::new(test_config(dir.path()), tools.collaborators());

        let req = request();
        let (first, second) = tokio::join!(relay.handle(&req), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(relay.waiting_requests(), 0);
            tokio::time::timeout(Duration::from_millis(20), relay.handle(&req)).await
        });

        assert_eq!(first.status(), RelayStatus::Ok);
        assert!(second.is_err(), "queued request should have timed out");
        assert_eq!(relay.waiting_requests(), 0);
        assert_eq!(relay.available_permits(), 1);
        assert_eq!(tools.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_dropped_request_mid_fetch_cleans_up() {
        let dir = TempDir::new().unwrap();
        let tools = FakeTools::default()
            .with_fetcher(FakeFetcher::stalling(4096, Duration::from_secs(30)));
        let relay = Relay::new(test_config(dir.path()), tools.collaborators());

        let outcome = tokio::time::timeout(Duration::from_millis(100), relay.handle(&request())).await;

        assert!(outcome.is_err());
        assert_eq!(tools.fetcher.calls(), 1);
        assert_eq!(tools.publisher.calls(), 0);
        assert_eq!(relay.available_permits(), 1);
        assert_clean(dir.path());
    }

    #[tokio::test]
    async fn test_prepare_sweeps_work_dir() {
        let dir = TempDir::new().unwrap();
        let orphan = RequestFiles::new(dir.path());
        std::fs::write(orphan.raw_path().with_extension("mp4.part"), b"x").unwrap();
        let relay = Relay::new(test_config(dir.path()), FakeTools::default().collaborators());

        assert_eq!(relay.prepare().await.unwrap(), 1);
        assert_clean(dir.path());
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"boom"), "Panic: boom");
        assert_eq!(panic_message(&"boom".to_string()), "Panic: boom");
        assert_eq!(panic_message(&42u8), "Panic: unknown panic payload");
    }
}
