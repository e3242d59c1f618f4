//! Shared data models for the mux relay.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound relay requests and their alias normalization
//! - Probe results and local artifacts
//! - Publish results and the fixed-shape relay response

pub mod artifact;
pub mod probe;
pub mod publish;
pub mod request;
pub mod response;

// Re-export common types
pub use artifact::LocalArtifact;
pub use probe::ProbeResult;
pub use publish::PublishResult;
pub use request::{
    RelayRequest, RequestError, RequestResult, CORRELATION_ID_ALIASES, DEFAULT_SOURCE_URL_PREFIX,
    SOURCE_URL_ALIASES,
};
pub use response::{
    truncate_chars, ErrorBody, ErrorKind, RelayResponse, RelayStatus, MAX_ERROR_MESSAGE_LEN,
};
