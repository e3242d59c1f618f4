//! Shared-secret header check.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "X-Token";

/// Byte-for-byte comparison of the token header against `expected`.
pub fn token_matches(expected: &str, headers: &HeaderMap) -> bool {
    headers
        .get(TOKEN_HEADER)
        .is_some_and(|value| value.as_bytes() == expected.as_bytes())
}

/// Reject requests without the configured token before the body is read.
pub async fn require_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(secret) = state.config.shared_secret.as_deref() {
        if !token_matches(secret, request.headers()) {
            warn!(uri = %request.uri(), "Rejected request with missing or invalid token");
            return Err(ApiError::unauthorized("invalid or missing token"));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_matches_exact_bytes() {
        let mut headers = HeaderMap::new();
        assert!(!token_matches("s3cret", &headers));

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("s3cret"));
        assert!(token_matches("s3cret", &headers));
        assert!(!token_matches("S3CRET", &headers));
        assert!(!token_matches("s3cret ", &headers));
    }
}
