//! Application state.

use std::sync::Arc;

use mux_media::YtDlpOptions;
use mux_relay::{Collaborators, Relay, RelayConfig};
use mux_storage::{CloudinaryClient, StorageResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(config: ApiConfig, relay: Relay) -> Self {
        Self {
            config,
            relay: Arc::new(relay),
        }
    }

    /// Build state with the real tool-backed pipeline.
    ///
    /// Fails only when the hosting account is not configured.
    pub fn from_env(config: ApiConfig) -> StorageResult<Self> {
        let relay_config = RelayConfig::from_env();
        let publisher = CloudinaryClient::from_env()?;
        let tools = Collaborators::from_config(&relay_config, YtDlpOptions::from_env(), publisher);

        Ok(Self::new(config, Relay::new(relay_config, tools)))
    }
}
