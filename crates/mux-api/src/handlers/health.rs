//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub limits: RelayLimits,
}

/// Effective relay limits.
#[derive(Serialize)]
pub struct RelayLimits {
    pub max_duration_seconds: u64,
    pub max_bytes: u64,
    pub preflight_mode: String,
    pub auth_enabled: bool,
    pub max_concurrent: usize,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let relay = state.relay.config();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        limits: RelayLimits {
            max_duration_seconds: relay.max_duration_seconds,
            max_bytes: relay.max_bytes,
            preflight_mode: relay.preflight.as_str().to_string(),
            auth_enabled: state.config.auth_enabled(),
            max_concurrent: relay.max_concurrent,
        },
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true }))
}
