//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! [`StoreError`] is what a channel store resolves a wait with when it does
//! not produce a message.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChannelName, Sequence};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: channel must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure outcome of a wait issued against a channel store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The wait was cancelled because its connection is going away.
    ///
    /// This is the expected terminal signal of every cancelled wait and is
    /// never surfaced to clients.
    #[error("wait cancelled: connection disconnected")]
    Disconnected,

    /// The store delivered a message that does not advance the cursor.
    #[error("channel {channel} delivered sequence {received}, not past cursor {cursor}")]
    SequenceRegressed {
        /// Channel the delivery arrived on.
        channel: ChannelName,
        /// Cursor the wait was issued with.
        cursor: Sequence,
        /// Sequence carried by the delivery.
        received: Sequence,
    },

    /// Any other store failure. Indicates a defect in the store contract.
    #[error("unexpected store failure: {0}")]
    Unexpected(String),
}

impl StoreError {
    /// Returns `true` for the disconnect sentinel.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 / 405 / 426           |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A channel path was requested with a method other than `GET`.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The request does not qualify for a WebSocket upgrade.
    #[error("websocket upgrade required: {0}")]
    UpgradeRequired(String),

    /// A wait resolved with a failure other than the disconnect sentinel.
    #[error("channel store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::UpgradeRequired(_) => 1002,
            Self::MethodNotAllowed(_) => 1003,
            Self::Store(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UpgradeRequired(_) => StatusCode::UPGRADE_REQUIRED,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let allow_get = matches!(self, Self::MethodNotAllowed(_));
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if allow_get {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("GET"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_is_recognised() {
        assert!(StoreError::Disconnected.is_disconnect());
        assert!(!StoreError::Unexpected("boom".to_string()).is_disconnect());
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            GatewayError::InvalidRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::UpgradeRequired(String::new()).status_code(),
            StatusCode::UPGRADE_REQUIRED
        );
        assert_eq!(
            GatewayError::MethodNotAllowed(String::new()).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            GatewayError::from(StoreError::Unexpected("x".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_code_and_status() {
        let response = GatewayError::InvalidRequest("empty channel".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn method_not_allowed_advertises_get() {
        let response = GatewayError::MethodNotAllowed("POST".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).map(|v| v.as_bytes()),
            Some(&b"GET"[..])
        );
    }
}
