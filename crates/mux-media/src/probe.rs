//! FFprobe duration measurement on local files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MediaError, MediaResult};
use crate::process::run_tool;

/// Reads container duration with ffprobe.
#[derive(Debug, Clone)]
pub struct FfprobeRunner {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Get container duration in seconds.
    pub async fn duration(&self, path: impl AsRef<Path>) -> MediaResult<f64> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(path.as_os_str().to_os_string());

        let output = run_tool("ffprobe", &self.program, args.as_slice(), self.timeout).await?;
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the single-value ffprobe output (e.g. "31.465000").
fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let value = stdout.trim();
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::invalid_output("ffprobe", format!("unparseable duration {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert!((parse_duration("31.465000\n").unwrap() - 31.465).abs() < 1e-9);
        assert!((parse_duration("400").unwrap() - 400.0).abs() < 1e-9);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1").is_err());
    }

    #[tokio::test]
    async fn test_duration_missing_file() {
        let runner = FfprobeRunner::new("ffprobe", Duration::from_secs(5));
        let err = runner.duration("/nonexistent/file.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
