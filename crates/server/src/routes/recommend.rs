use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use matcher::{QueryOutcome, EMPTY_QUERY_NOTICE, FALLBACK_NOTICE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Recommend request
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    /// Free-text question
    pub query: String,

    /// Job level selector; `"All"` or absent means unconstrained
    #[serde(default)]
    pub job_level: Option<String>,

    /// Duration selector; `"All"` or absent means unconstrained
    #[serde(default)]
    pub duration: Option<String>,
}

/// Recommend response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// `meta`, `answered` or `failed`
    pub kind: String,
    /// Model answer, canned meta answer, or failure diagnostic
    pub message: String,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    pub hits: Vec<RecommendHit>,
}

/// One document placed in the prompt context
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendHit {
    pub rank: usize,
    pub row_index: usize,
    pub product_name: String,
    pub job_levels: Vec<String>,
    pub duration: String,
    pub distance: f32,
}

impl RecommendResponse {
    pub fn from_outcome(outcome: &QueryOutcome<'_>) -> Self {
        let hits = outcome
            .hits()
            .iter()
            .enumerate()
            .map(|(rank, hit)| {
                let meta = hit.document.metadata();
                RecommendHit {
                    rank: rank + 1,
                    row_index: meta.row_index,
                    product_name: meta.product_name.clone(),
                    job_levels: meta.job_levels.clone(),
                    duration: meta.duration.clone(),
                    distance: hit.distance,
                }
            })
            .collect();

        let failed_stage = match outcome {
            QueryOutcome::Failed(failure) => Some(failure.stage.as_str().to_string()),
            _ => None,
        };

        Self {
            kind: outcome.kind().to_string(),
            message: outcome.message(),
            fallback: outcome.is_fallback(),
            notice: outcome.is_fallback().then(|| FALLBACK_NOTICE.to_string()),
            failed_stage,
            hits,
        }
    }
}

/// Run one recommendation query.
///
/// A halted engine answers 503 for every request. Otherwise a blank query is
/// rejected without touching the engine. Per-query failures
/// (embedding or generation) are reported in the body with `kind = "failed"`.
pub async fn recommend(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RecommendRequest>,
) -> ServerResult<impl IntoResponse> {
    let (engine, _) = state.recommender()?;
    if request.query.trim().is_empty() {
        return Err(ServerError::BadRequest(EMPTY_QUERY_NOTICE.to_string()));
    }

    let criteria = state.session().submit(
        &request.query,
        request.job_level.as_deref(),
        request.duration.as_deref(),
    );

    let outcome = engine.recommend(&request.query, &criteria).await;
    Ok(Json(RecommendResponse::from_outcome(&outcome)))
}
