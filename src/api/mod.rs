//! REST API layer: route handlers, DTOs, router composition, and the
//! OpenAPI document.
//!
//! HTTP routes are mounted at the root; every other path is left to the
//! WebSocket fallback.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document for the HTTP surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(handlers::system::health_handler, handlers::publish::publish),
    components(schemas(
        dto::PublishRequest,
        dto::PublishResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Service status"),
        (name = "Channels", description = "Publishing to channels"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
