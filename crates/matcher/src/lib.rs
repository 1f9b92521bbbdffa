//! # Recommendation Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the embedding index (`index`). It turns a free-text
//! question plus optional job level and duration selectors into one answer:
//! it retrieves the nearest catalog documents, narrows them with the
//! structured filters, packs them into a prompt and hands that prompt to a
//! generation provider.
//!
//! ## Core Types
//!
//! - [`FilterCriteria`] / [`apply_filter`] / [`FilterOutcome`]: literal post-filtering
//!   of ranked hits with an observable fallback when nothing matches.
//! - [`Generator`]: prompt-to-text seam, implemented by [`GeminiGenerator`],
//!   [`OpenAiGenerator`] and the offline [`EchoGenerator`].
//! - [`Recommender`]: the query state machine. Every call ends in a
//!   [`QueryOutcome`]: a canned meta answer, an answered [`Recommendation`], or a
//!   [`QueryFailure`] naming the stage that failed.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use catalog::{parse_catalog, CatalogConfig};
//! use index::{AnnConfig, EmbeddingIndex};
//! use matcher::{EchoGenerator, FilterCriteria, QueryOutcome, RecommendConfig, Recommender};
//! use semantic::HashingEmbedder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let csv = "Product Name,Description,Job Level,Languages,Test Duration,Test Type,Remote Testing\n\
//!            Verify Numerical,Numerical reasoning test,Entry;Mid,English,30,Cognitive,Yes\n";
//! let docs = parse_catalog("inline", csv.as_bytes(), &CatalogConfig::default())
//!     .unwrap()
//!     .into_documents();
//! let index = EmbeddingIndex::build(docs, Arc::new(HashingEmbedder::new(384, true)), AnnConfig::default())
//!     .await
//!     .unwrap();
//!
//! let engine = Recommender::new(Arc::new(index), Arc::new(EchoGenerator), RecommendConfig::default());
//! let outcome = engine
//!     .recommend("numerical test for graduates", &FilterCriteria::new(Some("Senior"), None))
//!     .await;
//!
//! // No Senior rows, so the unfiltered hits are used.
//! assert!(outcome.is_fallback());
//! assert!(matches!(outcome, QueryOutcome::Answered(_)));
//! # }
//! ```

mod engine;
pub mod filter;
pub mod generate;
pub mod metrics;
pub mod prompt;
mod types;

pub use engine::Recommender;
pub use filter::{apply_filter, FilterCriteria, FilterOptions, FilterOutcome, ALL};
pub use generate::{
    build_generator, build_remote, EchoGenerator, GeminiGenerator, GenerationConfig,
    GenerationError, Generator, OpenAiGenerator,
};
pub use metrics::{set_query_metrics, QueryMetrics};
pub use prompt::{
    build_context, build_prompt, is_meta_query, EMPTY_QUERY_NOTICE, FALLBACK_NOTICE, META_ANSWER,
    SAMPLE_QUESTIONS,
};
pub use types::{
    QueryError, QueryFailure, QueryOutcome, QueryStage, RecommendConfig, Recommendation,
};
