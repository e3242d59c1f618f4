//! FFmpeg command builder and runner.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::process::run_tool;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Limit output duration.
    pub fn max_duration(self, seconds: u64) -> Self {
        self.output_arg("-t").output_arg(seconds.to_string())
    }

    /// Copy all streams without re-encoding.
    ///
    /// Cuts can then only land on sync points, so a duration cap may overshoot
    /// by up to one GOP.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if self.overwrite {
            args.push("-y".into());
        }

        args.push("-v".into());
        args.push(self.log_level.clone().into());

        args.push("-i".into());
        args.push(self.input.clone().into_os_string());

        args.extend(self.output_args.iter().map(OsString::from));

        args.push(self.output.clone().into_os_string());

        args
    }
}

/// Runner for FFmpeg commands with a hard deadline.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// FFmpeg binary
    program: PathBuf,
    /// Timeout
    timeout: Duration,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {:?}", self.program.display(), args);

        run_tool("ffmpeg", &self.program, args.as_slice(), self.timeout).await?;
        Ok(())
    }
}

/// Copy `input` to `output`, truncated to `max_seconds`, without re-encoding.
///
/// Returns the size of the trimmed file. An exit status of zero with no
/// usable output is treated as a failure.
pub async fn trim_to_duration(
    runner: &FfmpegRunner,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    max_seconds: u64,
) -> MediaResult<u64> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(input, output)
        .max_duration(max_seconds)
        .stream_copy();

    runner.run(&cmd).await?;

    match tokio::fs::metadata(output).await {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        _ => Err(MediaError::EmptyOutput(output.to_path_buf())),
    }
}

/// Check if a tool binary is available.
pub fn check_tool(tool: &'static str, program: impl AsRef<std::ffi::OsStr>) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::ToolNotFound { tool })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_command_args() {
        let cmd = FfmpegCommand::new("in.mp4", "in.cut.mp4")
            .max_duration(240)
            .stream_copy();

        let args: Vec<String> = cmd
            .build_args()
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            vec!["-y", "-v", "error", "-i", "in.mp4", "-t", "240", "-c", "copy", "in.cut.mp4"]
        );
    }

    #[tokio::test]
    async fn test_trim_missing_input() {
        let runner = FfmpegRunner::new("ffmpeg", Duration::from_secs(5));
        let err = trim_to_duration(&runner, "/nonexistent/in.mp4", "/nonexistent/out.mp4", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_trim_with_silent_tool_is_empty_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("raw.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        // `true` accepts any arguments and writes nothing
        let runner = FfmpegRunner::new("true", Duration::from_secs(5));
        let err = trim_to_duration(&runner, &input, dir.path().join("raw.cut.mp4"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::EmptyOutput(_)));
    }
}
