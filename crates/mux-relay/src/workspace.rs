//! Per-request temp file namespace.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use mux_media::{remove_prefixed, sweep_stale, STALE_EXTENSIONS};

/// Temp file paths owned by one request.
///
/// Names derive from a random token, never from caller input, so two requests
/// with the same correlation id cannot collide.
#[derive(Debug, Clone)]
pub struct RequestFiles {
    dir: PathBuf,
    token: String,
}

impl RequestFiles {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            token: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Fetched file.
    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(format!("{}.mp4", self.token))
    }

    /// Trimmed file.
    pub fn cut_path(&self) -> PathBuf {
        self.dir.join(format!("{}.cut.mp4", self.token))
    }

    /// Remove every file of this request, including tool intermediates.
    pub fn cleanup(&self) -> usize {
        remove_prefixed(&self.dir, &format!("{}.", self.token))
    }
}

/// Create the work directory and clear leftovers from a previous process.
pub async fn prepare_work_dir(dir: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(sweep_stale(dir, STALE_EXTENSIONS).await)
}
