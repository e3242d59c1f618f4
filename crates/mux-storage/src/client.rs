//! Cloudinary unsigned upload client.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use mux_models::{truncate_chars, PublishResult};

use crate::error::{StorageError, StorageResult};
use crate::naming::{generate_public_id, thumbnail_url};

/// Default upload API base.
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Max characters of a rejected response body kept in the error.
const ERROR_SNIPPET_LEN: usize = 200;

/// Content type declared for the uploaded file part.
const UPLOAD_MIME: &str = "video/mp4";

/// Configuration for the Cloudinary client.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    /// Account (cloud) name
    pub cloud_name: String,
    /// Unsigned upload preset
    pub upload_preset: String,
    /// Upload API base URL
    pub api_base: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Read timeout (per read, uploads can be slow)
    pub read_timeout: Duration,
}

impl CloudinaryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            cloud_name: required_env("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: required_env("CLOUDINARY_UPLOAD_PRESET")?,
            api_base: std::env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("UPLOAD_CONNECT_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            read_timeout: Duration::from_secs(
                std::env::var("UPLOAD_READ_TIMEOUT_S")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        })
    }

    /// Upload endpoint for video resources.
    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/video/upload",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

fn required_env(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{name} not set")))
}

/// Fields read from a successful upload response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: Option<String>,
    secure_url: Option<String>,
}

/// Cloudinary upload client.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    /// Create a new client from configuration.
    pub fn new(config: CloudinaryConfig) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(CloudinaryConfig::from_env()?)
    }

    /// Upload a local video under a freshly generated public id.
    ///
    /// The file is streamed from disk rather than buffered.
    pub async fn upload_video(&self, path: impl AsRef<Path>) -> StorageResult<PublishResult> {
        let path = path.as_ref();
        let public_id = generate_public_id();

        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.mp4".to_string());

        let part = file_part(reqwest::Body::from(file), len, file_name, UPLOAD_MIME)?;

        let form = Form::new()
            .text("upload_preset", self.config.upload_preset.clone())
            .text("public_id", public_id.clone())
            .part("file", part);

        debug!(
            path = %path.display(),
            size_bytes = len,
            public_id = %public_id,
            "Uploading to Cloudinary"
        );

        let response = self
            .http
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body: truncate_chars(&body, ERROR_SNIPPET_LEN),
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| StorageError::invalid_response(e.to_string()))?;

        let remote_id = parsed
            .public_id
            .filter(|id| !id.is_empty())
            .unwrap_or(public_id);
        let secure_url = parsed
            .secure_url
            .ok_or_else(|| StorageError::invalid_response("missing secure_url"))?;

        info!(remote_id = %remote_id, size_bytes = len, "Uploaded video");

        Ok(PublishResult {
            thumbnail_url: thumbnail_url(&self.config.cloud_name, &remote_id),
            remote_id,
            secure_url,
        })
    }
}

/// Multipart file part. A bad content type is a local setup problem, not a
/// transport failure.
fn file_part(body: reqwest::Body, len: u64, file_name: String, mime: &str) -> StorageResult<Part> {
    Part::stream_with_length(body, len)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| StorageError::config_error(format!("invalid content type {mime:?}: {e}")))
}
