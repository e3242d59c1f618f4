//! Deadline-bounded external process execution.
//!
//! Every tool runs in its own process group so that a deadline (or the
//! caller dropping the future) takes down helper processes too, e.g. the
//! ffmpeg that yt-dlp spawns for merging.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Captured output of a successful tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Kills the child's process group on drop unless disarmed.
struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    fn disarm(&mut self) {
        self.pid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // ESRCH: the group already exited
        if e != nix::errno::Errno::ESRCH {
            warn!(pid, error = %e, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Run `program` with `args`, failing if it exits non-zero or runs past
/// `timeout`.
pub async fn run_tool<S: AsRef<OsStr>>(
    tool: &'static str,
    program: impl AsRef<OsStr>,
    args: &[S],
    timeout: Duration,
) -> MediaResult<ToolOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MediaError::ToolNotFound { tool },
        _ => MediaError::Io(e),
    })?;

    let mut guard = ProcessGroupGuard { pid: child.id() };
    debug!(tool, pid = ?child.id(), "Spawned tool process");

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(tool, timeout_secs = timeout.as_secs(), "Tool timed out, killing process group");
            return Err(MediaError::Timeout {
                tool,
                secs: timeout.as_secs(),
            });
        }
    };
    guard.disarm();

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        debug!(tool, stderr = %stderr, "Tool exited with failure");
        return Err(MediaError::tool_failed(tool, &stderr, output.status.code()));
    }

    Ok(ToolOutput {
        stdout: output.stdout,
        stderr,
    })
}
