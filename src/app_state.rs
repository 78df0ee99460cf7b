//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::MemoryChannelStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Channel store backing publishes and WebSocket waits.
    pub store: Arc<MemoryChannelStore>,
    /// Cap on distinct channels per multiplexed connection.
    pub max_multiplex_channels: usize,
}

impl AppState {
    /// Builds the state from loaded configuration.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            store: Arc::new(MemoryChannelStore::new(config.channel_backlog_capacity)),
            max_multiplex_channels: config.max_multiplex_channels,
        }
    }
}
