//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the chat API, health checks, and OpenAPI documentation.

use crate::{
    handlers,
    models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::chat,
        handlers::health,
        handlers::upstream_health,
    ),
    components(
        schemas(ChatRequest, ChatResponse, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Goal Coach API", description = "Staged goal-setting, planning and scheduling conversation")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .route("/health/upstream", get(handlers::upstream_health))
        .with_state(app_state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(cors)
}
