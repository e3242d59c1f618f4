//! Inbound relay request and alias normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Only source accepted by the relay when no override is configured.
pub const DEFAULT_SOURCE_URL_PREFIX: &str = "https://v.redd.it/";

/// Accepted field names for the source URL, highest priority first.
pub const SOURCE_URL_ALIASES: &[&str] = &["video_url_clean", "video_url", "vredd_url"];

/// Accepted field names for the correlation id, highest priority first.
/// `reddit_id` is kept for legacy callers.
pub const CORRELATION_ID_ALIASES: &[&str] = &["thread_id", "reddit_id"];

pub type RequestResult<T> = Result<T, RequestError>;

/// Reasons an inbound body is rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid_body: {0}")]
    InvalidBody(String),

    #[error("missing_source_url")]
    MissingSourceUrl,

    #[error("invalid_source_url")]
    InvalidSourceUrl,
}

/// A validated relay request.
///
/// Both fields are fixed at normalization time and echoed back verbatim in
/// every response for this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub correlation_id: String,
    pub source_url: String,
}

impl RelayRequest {
    /// Normalize a loosely shaped JSON body.
    ///
    /// A missing correlation id is replaced by a random UUID; a missing or
    /// foreign source URL is a hard failure.
    pub fn from_value(body: &Value, source_prefix: &str) -> RequestResult<Self> {
        let fields = body
            .as_object()
            .ok_or_else(|| RequestError::InvalidBody("expected a JSON object".to_string()))?;

        let source_url = resolve_alias(fields, SOURCE_URL_ALIASES)
            .ok_or(RequestError::MissingSourceUrl)?;

        if !source_url.starts_with(source_prefix) {
            return Err(RequestError::InvalidSourceUrl);
        }

        let correlation_id = resolve_alias(fields, CORRELATION_ID_ALIASES)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(Self {
            correlation_id,
            source_url,
        })
    }
}

/// First alias holding a non-empty value after trimming.
///
/// A blank or whitespace-only value falls through to the next alias rather
/// than winning and leaving the field empty.
fn resolve_alias(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|name| match fields.get(*name)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_alias_falls_through() {
        let body = json!({
            "video_url_clean": "   ",
            "video_url": "https://v.redd.it/legacy",
            "thread_id": "",
            "reddit_id": "t3_legacy",
        });
        let req = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        assert_eq!(req.source_url, "https://v.redd.it/legacy");
        assert_eq!(req.correlation_id, "t3_legacy");
    }

    #[test]
    fn test_primary_alias_wins() {
        let body = json!({
            "video_url_clean": "https://v.redd.it/primary",
            "video_url": "https://v.redd.it/legacy",
            "thread_id": "t3_abc",
        });
        let req = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        assert_eq!(req.source_url, "https://v.redd.it/primary");
        assert_eq!(req.correlation_id, "t3_abc");
    }

    #[test]
    fn test_legacy_aliases_and_trimming() {
        let body = json!({
            "video_url_clean": "   ",
            "vredd_url": "  https://v.redd.it/xyz  ",
            "reddit_id": " r1 ",
        });
        let req = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        assert_eq!(req.source_url, "https://v.redd.it/xyz");
        assert_eq!(req.correlation_id, "r1");
    }

    #[test]
    fn test_missing_correlation_id_is_synthesized() {
        let body = json!({ "video_url": "https://v.redd.it/abc123" });
        let a = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        let b = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        assert!(uuid::Uuid::parse_str(&a.correlation_id).is_ok());
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn test_numeric_correlation_id() {
        let body = json!({ "video_url": "https://v.redd.it/abc", "thread_id": 42 });
        let req = RelayRequest::from_value(&body, DEFAULT_SOURCE_URL_PREFIX).unwrap();
        assert_eq!(req.correlation_id, "42");
    }

    #[test]
    fn test_rejects_foreign_and_missing_urls() {
        let foreign = json!({ "video_url": "https://example.com/v.redd.it/abc" });
        assert_eq!(
            RelayRequest::from_value(&foreign, DEFAULT_SOURCE_URL_PREFIX),
            Err(RequestError::InvalidSourceUrl)
        );

        let plain_http = json!({ "video_url": "http://v.redd.it/abc" });
        assert_eq!(
            RelayRequest::from_value(&plain_http, DEFAULT_SOURCE_URL_PREFIX),
            Err(RequestError::InvalidSourceUrl)
        );

        let missing = json!({ "thread_id": "t1" });
        assert_eq!(
            RelayRequest::from_value(&missing, DEFAULT_SOURCE_URL_PREFIX),
            Err(RequestError::MissingSourceUrl)
        );

        let not_object = json!(["https://v.redd.it/abc"]);
        assert!(matches!(
            RelayRequest::from_value(&not_object, DEFAULT_SOURCE_URL_PREFIX),
            Err(RequestError::InvalidBody(_))
        ));
    }
}
