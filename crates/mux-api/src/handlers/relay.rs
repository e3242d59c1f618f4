//! Relay upload handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::info;

use mux_models::{RelayRequest, RelayResponse, RequestError};

use crate::error::ApiResult;
use crate::state::AppState;

/// Fetch a source video, trim it if needed and publish it.
///
/// Every outcome past validation is a 200 carrying a one-element array, so
/// the caller can key its next step on `correlation_id` alone.
pub async fn mux_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Vec<RelayResponse>>> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| RequestError::InvalidBody(e.to_string()))?;
    let request = RelayRequest::from_value(&value, &state.relay.config().source_url_prefix)?;

    info!(
        correlation_id = %request.correlation_id,
        source_url = %request.source_url,
        "Relay request accepted"
    );

    let response = state.relay.handle(&request).await;
    Ok(Json(vec![response]))
}
