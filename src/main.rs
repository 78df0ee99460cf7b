//! seqbus-gateway server entry point.
//!
//! Starts the Axum HTTP server with the publish API and WebSocket
//! endpoints.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use seqbus_gateway::app_state::AppState;
use seqbus_gateway::config::{GatewayConfig, LogFormat};
use seqbus_gateway::server::build_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("invalid LISTEN_ADDR")?;

    // Initialize tracing
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        backlog = config.channel_backlog_capacity,
        max_multiplex_channels = config.max_multiplex_channels,
        "starting seqbus-gateway"
    );

    // Build application
    let app = build_app(AppState::from_config(&config));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}
