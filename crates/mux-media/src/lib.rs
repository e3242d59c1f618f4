//! CLI wrappers for the relay's external media tools.
//!
//! This crate provides:
//! - Deadline-bounded process execution with process-group teardown
//! - yt-dlp metadata probing and merged mp4 download
//! - FFprobe duration measurement
//! - FFmpeg stream-copy trimming
//! - Work directory cleanup helpers

pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod process;

pub use command::{check_tool, trim_to_duration, FfmpegCommand, FfmpegRunner};
pub use download::{YtDlp, YtDlpOptions, DEFAULT_USER_AGENT};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{
    file_size, is_request_file, remove_prefixed, sweep_stale, STALE_EXTENSIONS,
};
pub use probe::FfprobeRunner;
pub use process::{run_tool, ToolOutput};
