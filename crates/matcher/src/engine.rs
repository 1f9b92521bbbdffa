use std::sync::Arc;
use std::time::Instant;

use index::EmbeddingIndex;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::filter::{apply_filter, FilterCriteria, FilterOptions};
use crate::generate::Generator;
use crate::metrics::metrics_recorder;
use crate::prompt::{build_context, build_prompt, is_meta_query, META_ANSWER};
use crate::types::{
    QueryError, QueryFailure, QueryOutcome, QueryStage, RecommendConfig, Recommendation,
};


/// Query orchestrator: classify, retrieve, filter, prompt, generate.
///
/// Holds no per-query state, so one instance can serve concurrent callers.
pub struct Recommender {
    index: Arc<EmbeddingIndex>,
    generator: Arc<dyn Generator>,
    config: RecommendConfig,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("index", &self.index)
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Recommender {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        generator: Arc<dyn Generator>,
        config: RecommendConfig,
    ) -> Self {
        Self {
            index,
            generator,
            config,
        }
    }

    /// Like [`Recommender::new`] but rejects an invalid config.
    pub fn try_new(
        index: Arc<EmbeddingIndex>,
        generator: Arc<dyn Generator>,
        config: RecommendConfig,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        Ok(Self::new(index, generator, config))
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Selector options derived from the indexed documents.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions::from_documents(self.index.documents())
    }

    /// Run one query to a terminal outcome.
    ///
    /// Meta questions short-circuit before retrieval. Embedding and generation
    /// failures become [`QueryOutcome::Failed`] and leave the index untouched.
    pub async fn recommend(&self, query: &str, criteria: &FilterCriteria) -> QueryOutcome<'_> {
        let start = Instant::now();
        let span = info_span!(
            "recommend",
            query_len = query.len(),
            job_level = criteria.job_level.as_deref().unwrap_or("All"),
            duration = criteria.duration.as_deref().unwrap_or("All"),
        );
        let outcome = self.run(query, criteria).instrument(span).await;
        let latency = start.elapsed();

        match &outcome {
            QueryOutcome::Failed(failure) => warn!(
                stage = failure.stage.as_str(),
                error = %failure.error,
                elapsed_micros = latency.as_micros() as u64,
                "query_failed"
            ),
            other => info!(
                kind = other.kind(),
                hits = other.hits().len(),
                fallback = other.is_fallback(),
                elapsed_micros = latency.as_micros() as u64,
                "query_answered"
            ),
        }

        if let Some(recorder) = metrics_recorder() {
            recorder.record_query(
                outcome.kind(),
                latency,
                outcome.hits().len(),
                outcome.is_fallback(),
            );
        }
        outcome
    }

    async fn run(&self, query: &str, criteria: &FilterCriteria) -> QueryOutcome<'_> {
        let outcome = self.run_stages(query, criteria).await;
        let (from, to) = terminal_transition(&outcome);
        debug!(from = from.as_str(), to, "query_stage");
        outcome
    }

    async fn run_stages(&self, query: &str, criteria: &FilterCriteria) -> QueryOutcome<'_> {
        debug!(from = QueryStage::Idle.as_str(), to = QueryStage::Classifying.as_str(), "query_stage");
        if is_meta_query(query) {
            return QueryOutcome::Meta {
                answer: META_ANSWER,
            };
        }

        debug!(to = QueryStage::Retrieving.as_str(), k = self.config.retrieval_k, "query_stage");
        let hits = match self.index.search(query, self.config.retrieval_k).await {
            Ok(hits) => hits,
            Err(err) => {
                return QueryOutcome::Failed(QueryFailure {
                    stage: QueryStage::Retrieving,
                    error: err.into(),
                    fallback: false,
                })
            }
        };

        debug!(to = QueryStage::Filtering.as_str(), retrieved = hits.len(), "query_stage");
        let filtered = apply_filter(hits, criteria);
        let fallback = filtered.is_fallback();
        if fallback {
            debug!("filter_fallback");
        }
        let hits = filtered.into_hits();

        debug!(to = QueryStage::PromptBuilding.as_str(), context_docs = hits.len(), "query_stage");
        let context = build_context(&hits);
        let prompt = build_prompt(&context, query, self.config.max_recommendations);

        debug!(
            to = QueryStage::Generating.as_str(),
            generator = self.generator.name(),
            prompt_chars = prompt.len(),
            "query_stage"
        );
        match self.generator.generate(&prompt).await {
            Ok(answer) => QueryOutcome::Answered(Recommendation {
                answer,
                hits,
                fallback,
                prompt,
            }),
            Err(err) => QueryOutcome::Failed(QueryFailure {
                stage: QueryStage::Generating,
                error: err.into(),
                fallback,
            }),
        }
    }
}

/// Last working stage and the terminal state a query ended in.
fn terminal_transition(outcome: &QueryOutcome<'_>) -> (QueryStage, &'static str) {
    match outcome {
        QueryOutcome::Meta { .. } => (QueryStage::Classifying, "meta_answer"),
        QueryOutcome::Answered(_) => (QueryStage::Generating, "answered"),
        QueryOutcome::Failed(failure) => (failure.stage, "failed"),
    }
}
