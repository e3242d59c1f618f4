//! Axum HTTP server for the media relay.
//!
//! This crate provides:
//! - `POST /mux-upload` with optional shared-secret auth
//! - Liveness and limits at `/health`
//! - Request IDs, request logging and optional Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
