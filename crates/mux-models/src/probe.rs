//! Preflight probe results.

use serde::{Deserialize, Serialize};

/// Metadata gathered about a source without downloading it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Reported duration in seconds, if the source exposed one.
    pub duration_seconds: Option<f64>,
    /// Whether the source looks like it carries playable media.
    pub has_media: bool,
}

impl ProbeResult {
    /// Result reported when the probe could not reach a verdict.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether the reported duration is above `max_seconds`.
    ///
    /// A `max_seconds` of zero means unlimited and never flags excess.
    pub fn exceeds(&self, max_seconds: u64) -> bool {
        match self.duration_seconds {
            Some(duration) if max_seconds > 0 => duration > max_seconds as f64,
            _ => false,
        }
    }
}
