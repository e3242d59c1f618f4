//! Local files owned by a single relay request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A media file on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl LocalArtifact {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Size in MiB, for log lines.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
