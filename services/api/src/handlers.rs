//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests. It uses
//! `utoipa` doc comments to generate OpenAPI documentation.

use anyhow::anyhow;
use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use goal_coach_core::{ConversationError, GenerationError};
use std::{any::Any, sync::Arc};
use tracing::{error, instrument, warn};

use crate::{
    models::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse},
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    UpstreamFailure(GenerationError),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::UpstreamFailure(err) => {
                error!("Upstream generation failed: {:?}", err);
                let message =
                    "The assistant could not generate a response. Please try again.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

impl ApiError {
    /// Maps a failed turn: caller mistakes are 400s, LLM failures are upstream errors.
    fn from_turn(err: ConversationError) -> Self {
        match err {
            ConversationError::Generation(err) => Self::UpstreamFailure(err),
            err @ ConversationError::MissingGoal { .. } => Self::BadRequest(err.to_string()),
        }
    }

    fn from_rejection(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Converts a panic inside a handler into the uniform internal-error response.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError::InternalServerError(anyhow!("Request handler panicked: {}", detail)).into_response()
}

/// Advance the goal-setting conversation by one turn.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The assistant's reply and the updated conversation context", body = ChatResponse),
        (status = 400, description = "Malformed request or unknown stage", body = ErrorResponse),
        (status = 500, description = "The LLM call failed", body = ErrorResponse)
    )
)]
#[instrument(name = "chat", skip_all, fields(stage))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_rejection)?;
    tracing::Span::current().record("stage", request.stage.as_str());

    let (message, context) = request.into_parts();
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let outcome = state
        .engine
        .advance(context, &message)
        .await
        .map_err(ApiError::from_turn)?;
    Ok(Json(outcome.into()))
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The service is running", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        llm: None,
    })
}

/// Liveness check that also round-trips a call to the LLM provider.
#[utoipa::path(
    get,
    path = "/health/upstream",
    responses(
        (status = 200, description = "The service and the LLM provider are reachable", body = HealthResponse),
        (status = 503, description = "The LLM provider could not be reached", body = HealthResponse)
    )
)]
pub async fn upstream_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.llm_client.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                llm: Some("ok".to_string()),
            }),
        ),
        Err(err) => {
            warn!(error = %err, "Upstream health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded".to_string(),
                    llm: Some(err.to_string()),
                }),
            )
        }
    }
}
