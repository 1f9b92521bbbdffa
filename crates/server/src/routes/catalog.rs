use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use matcher::SAMPLE_QUESTIONS;
use serde_json::json;
use std::sync::Arc;

/// Selector options and sample questions for clients building their own form.
pub async fn filter_options(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let (_, options) = state.recommender()?;
    Ok(Json(json!({
        "job_levels": options.job_levels,
        "durations": options.durations,
        "sample_questions": SAMPLE_QUESTIONS,
    })))
}

/// Rebuild the engine from the configured catalog path.
///
/// Unchanged catalog content is served from the index cache. A failed reload
/// leaves the running engine untouched.
pub async fn reload_catalog(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let engine = state.reload().await?;
    tracing::info!(documents = engine.document_count(), "catalog_reloaded");
    Ok(Json(json!({
        "status": "reloaded",
        "documents": engine.document_count(),
        "catalog": state.pipeline.catalog.path.display().to_string(),
    })))
}
