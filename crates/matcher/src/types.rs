use index::{IndexError, SearchHit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generate::GenerationError;

/// Tuning knobs for the query orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecommendConfig {
    /// Number of nearest documents retrieved before filtering.
    #[serde(default = "RecommendConfig::default_retrieval_k")]
    pub retrieval_k: usize,
    /// Upper bound on ranked entries the model is asked for.
    #[serde(default = "RecommendConfig::default_max_recommendations")]
    pub max_recommendations: usize,
}

impl RecommendConfig {
    pub(crate) fn default_retrieval_k() -> usize {
        8
    }

    pub(crate) fn default_max_recommendations() -> usize {
        3
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.retrieval_k == 0 {
            return Err(QueryError::InvalidConfig(
                "retrieval_k must be greater than zero".into(),
            ));
        }
        if self.max_recommendations == 0 {
            return Err(QueryError::InvalidConfig(
                "max_recommendations must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            retrieval_k: Self::default_retrieval_k(),
            max_recommendations: Self::default_max_recommendations(),
        }
    }
}

/// Position of a query in the orchestrator state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    Idle,
    Classifying,
    Retrieving,
    Filtering,
    PromptBuilding,
    Generating,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStage::Idle => "idle",
            QueryStage::Classifying => "classifying",
            QueryStage::Retrieving => "retrieving",
            QueryStage::Filtering => "filtering",
            QueryStage::PromptBuilding => "prompt_building",
            QueryStage::Generating => "generating",
        }
    }
}

/// Per-query failures. None of these affect the index.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid recommend config: {0}")]
    InvalidConfig(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// A successfully answered query.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation<'a> {
    /// Model output, verbatim.
    pub answer: String,
    /// The documents placed in the prompt context, in rank order.
    pub hits: Vec<SearchHit<'a>>,
    /// True when the filters matched nothing and unfiltered hits were used.
    pub fallback: bool,
    pub prompt: String,
}

/// A query that ended in the failed state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFailure {
    pub stage: QueryStage,
    pub error: QueryError,
    /// Whether the fallback notice had already been raised before failing.
    pub fallback: bool,
}

impl QueryFailure {
    /// User-facing message with the underlying cause appended.
    pub fn diagnostic(&self) -> String {
        match &self.error {
            QueryError::Generation(err) => format!(
                "Generation service error: {err}. Please check your API key or try again later. \
                 If the issue persists, ensure your API key is valid and you have not exceeded \
                 your usage limits."
            ),
            QueryError::Retrieval(err) => format!(
                "Embedding service error: {err}. The catalog index is unaffected, please try again."
            ),
            QueryError::InvalidConfig(msg) => format!("Configuration error: {msg}"),
        }
    }
}

/// Terminal state of one `recommend` call.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<'a> {
    /// The question was about the tool itself. Nothing was retrieved.
    Meta { answer: &'static str },
    Answered(Recommendation<'a>),
    Failed(QueryFailure),
}

impl<'a> QueryOutcome<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryOutcome::Meta { .. } => "meta",
            QueryOutcome::Answered(_) => "answered",
            QueryOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_fallback(&self) -> bool {
        match self {
            QueryOutcome::Meta { .. } => false,
            QueryOutcome::Answered(rec) => rec.fallback,
            QueryOutcome::Failed(failure) => failure.fallback,
        }
    }

    /// Text shown to the user: the answer or the failure diagnostic.
    pub fn message(&self) -> String {
        match self {
            QueryOutcome::Meta { answer } => (*answer).to_string(),
            QueryOutcome::Answered(rec) => rec.answer.clone(),
            QueryOutcome::Failed(failure) => failure.diagnostic(),
        }
    }

    pub fn hits(&self) -> &[SearchHit<'a>] {
        match self {
            QueryOutcome::Answered(rec) => &rec.hits,
            _ => &[],
        }
    }
}
