//! Publish endpoint handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{PublishRequest, PublishResponse};
use crate::app_state::AppState;
use crate::domain::ChannelName;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /publish` — Publish a message on a channel.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if the channel name is blank.
#[utoipa::path(
    post,
    path = "/publish",
    tag = "Channels",
    summary = "Publish a message",
    description = "Appends a message to a channel, assigns it the next sequence number, and wakes every connection waiting on the channel.",
    request_body = PublishRequest,
    responses(
        (status = 201, description = "Message published", body = PublishResponse),
        (status = 400, description = "Invalid channel", body = ErrorResponse),
    )
)]
pub async fn publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let channel = ChannelName::new(req.channel);
    if channel.is_blank() {
        return Err(GatewayError::InvalidRequest(
            "channel must not be empty".to_string(),
        ));
    }

    let sequence = state.store.publish(&channel, req.message);
    tracing::info!(%channel, sequence, "message published");

    let response = PublishResponse {
        channel: channel.into(),
        sequence,
        published_at: Utc::now(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Channel routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/publish", post(publish))
}
