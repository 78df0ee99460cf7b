//! Axum WebSocket upgrade handler.
//!
//! Mounted as the router fallback: every path the HTTP API does not claim is
//! a WebSocket endpoint whose path names the channel in single mode.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Response};

use super::connection::{ConnectionParams, run_connection};
use super::mode::{ModeParams, SessionMode};
use crate::app_state::AppState;
use crate::domain::ChannelStore;
use crate::error::GatewayError;

/// `GET /{*route}` — Upgrade HTTP connection to WebSocket.
///
/// `?multiplexing=enabled` selects multiplexed mode; anything else, or a
/// query that does not parse, selects single-channel mode.
///
/// # Errors
///
/// Returns [`GatewayError::MethodNotAllowed`] for methods other than `GET`
/// and [`GatewayError::UpgradeRequired`] if the request is otherwise not a
/// valid WebSocket upgrade.
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    query: Result<Query<ModeParams>, QueryRejection>,
    uri: Uri,
    State(state): State<AppState>,
) -> Result<Response, GatewayError> {
    let ws = upgrade.map_err(|rejection| match rejection {
        not_get @ WebSocketUpgradeRejection::MethodNotGet(_) => {
            GatewayError::MethodNotAllowed(not_get.body_text())
        }
        other => GatewayError::UpgradeRequired(other.body_text()),
    })?;
    let mode = query
        .map(|Query(params)| SessionMode::from_params(&params))
        .unwrap_or_default();

    let params = ConnectionParams {
        route: uri.path().to_string(),
        mode,
        store: Arc::clone(&state.store) as Arc<dyn ChannelStore>,
        max_multiplex_channels: state.max_multiplex_channels,
    };
    tracing::debug!(route = %params.route, ?mode, "ws upgrade accepted");

    Ok(ws
        .on_upgrade(move |socket| run_connection(socket, params))
        .into_response())
}
