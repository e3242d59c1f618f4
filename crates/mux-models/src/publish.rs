//! Hosted artifact metadata.

use serde::{Deserialize, Serialize};

/// Result of a successful upload to the hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Canonical identifier assigned by the hosting service.
    pub remote_id: String,
    /// HTTPS URL of the hosted video.
    pub secure_url: String,
    /// Poster frame URL derived from `remote_id`.
    pub thumbnail_url: String,
}
