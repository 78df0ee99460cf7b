//! Publish DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /publish`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRequest {
    /// Channel to publish on. In single-channel mode this is the WebSocket
    /// path clients connect to (e.g. `/foo`).
    pub channel: String,
    /// Arbitrary JSON payload delivered verbatim to subscribers.
    #[schema(value_type = Object)]
    pub message: serde_json::Value,
}

/// Response body for `POST /publish`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    /// Channel the message was published on.
    pub channel: String,
    /// Sequence assigned to the message.
    pub sequence: u64,
    /// Server time of the publish.
    pub published_at: DateTime<Utc>,
}
