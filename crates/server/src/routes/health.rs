use crate::error::{ServerError, ServerResult};
use crate::state::{EngineState, ServerMetadata, ServerState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
/// Returns 200 whenever the process is serving, halted or not.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "shl-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_secs(),
    }))
}

/// Readiness check endpoint
/// Returns 200 with the document count when the engine is ready, 503 with the
/// startup diagnostic when it is halted.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let engine = state.engine();
    match engine.as_ref() {
        EngineState::Ready { recommender, .. } => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "service": "shl-server",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "documents": recommender.index().len(),
                "embedding_model": recommender.index().model_name(),
                "generator": recommender.generator_name(),
            })),
        ),
        EngineState::Halted { kind, diagnostic } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "halted",
                "service": "shl-server",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "documents": 0,
                "reason": kind,
                "diagnostic": diagnostic,
            })),
        ),
    }
}

/// Server metadata endpoint
pub async fn server_metadata(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let metadata = ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
    };

    serde_json::to_value(metadata)
        .map(Json)
        .map_err(|e| ServerError::Internal(e.to_string()))
}
