//! Filesystem utilities for the relay's temporary file namespace.
//!
//! All request files live flat inside one work directory and share a
//! request-unique name prefix, so cleanup is a prefix match rather than a
//! list of known paths. That also catches tool intermediates such as
//! `<token>.f137.mp4` or `<token>.mp4.part`.

use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// Extensions removed by the startup sweep.
pub const STALE_EXTENSIONS: &[&str] = &["mp4", "m4a", "webm", "mkv", "part", "ytdl", "tmp"];

/// Length of a request token (a simple-format UUID).
const REQUEST_TOKEN_LEN: usize = 32;

/// Whether `name` starts with a request token followed by a dot.
pub fn is_request_file(name: &str) -> bool {
    name.split_once('.').is_some_and(|(stem, _)| {
        stem.len() == REQUEST_TOKEN_LEN
            && stem.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

/// Remove every regular file in `dir` whose name starts with `prefix`.
///
/// Synchronous so it can run from a `Drop` impl. Returns the number of files
/// removed; individual failures are logged and skipped.
pub fn remove_prefixed(dir: &Path, prefix: &str) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list work directory");
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(prefix) {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp file"),
        }
    }

    if removed > 0 {
        debug!(dir = %dir.display(), prefix, removed, "Removed request files");
    }
    removed
}

/// Best-effort removal of leftovers from a previous (crashed) process.
///
/// Only request files (see [`is_request_file`]) with one of `extensions`
/// are touched, so a work dir shared with other programs keeps their files.
/// Never fails.
pub async fn sweep_stale(dir: &Path, extensions: &[&str]) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(dir = %dir.display(), error = %e, "Stale file sweep skipped");
            }
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Stale file sweep interrupted");
                break;
            }
        };

        if !is_request_file(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        let matches_ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if !matches_ext || !path.is_file() {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale file"),
        }
    }

    removed
}

/// Size of a file in bytes.
pub async fn file_size(path: &Path) -> io::Result<u64> {
    Ok(tokio::fs::metadata(path).await?.len())
}
