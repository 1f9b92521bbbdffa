//! # Embedding index
//!
//! This crate owns the searchable form of the catalog. [`EmbeddingIndex::build`]
//! embeds every [`Document`] once, stores the vectors in an [`AnnIndex`], and
//! keeps the documents alongside in the same order so search results can be
//! hydrated without any lookup tables.
//!
//! ## Key properties
//!
//! - **Built once**: there is no insert or delete after build. A new catalog
//!   means a new index, swapped in wholesale by the caller.
//! - **Read-only search**: [`EmbeddingIndex::search`] takes `&self`, so an
//!   `Arc<EmbeddingIndex>` can be shared by any number of concurrent readers.
//! - **Nearest first**: hits come back sorted by non-decreasing cosine distance,
//!   at most `k` of them.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use catalog::{parse_catalog, CatalogConfig};
//! use index::{AnnConfig, EmbeddingIndex};
//! use semantic::HashingEmbedder;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let csv = "Product Name,Description,Job Level,Languages,Test Duration,Test Type,Remote Testing\n\
//!            Verify Numerical,Numerical reasoning test,Entry;Mid,English,30,Cognitive,Yes\n\
//!            OPQ32,Personality questionnaire,Manager,English,25,Personality,Yes\n";
//! let catalog = parse_catalog("inline", csv.as_bytes(), &CatalogConfig::default()).unwrap();
//!
//! let embedder = Arc::new(HashingEmbedder::new(384, true));
//! let index = EmbeddingIndex::build(catalog.into_documents(), embedder, AnnConfig::default())
//!     .await
//!     .unwrap();
//!
//! let hits = index.search("numerical reasoning", 8).await.unwrap();
//! assert_eq!(hits[0].document.metadata().product_name, "Verify Numerical");
//! # }
//! ```

pub mod ann;
mod error;

use std::sync::Arc;
use std::time::Instant;

use catalog::Document;
use semantic::{Embedder, SemanticError};
use tracing::{debug, info, warn};

pub use crate::ann::{AnnConfig, AnnError, AnnIndex, AnnResult};
pub use crate::error::IndexError;

/// A document paired with its distance to the query. Lower is closer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub document: &'a Document,
    pub distance: f32,
}

/// Immutable vector index over a catalog snapshot.
pub struct EmbeddingIndex {
    documents: Vec<Document>,
    ann: AnnIndex,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("documents", &self.documents.len())
            .field("dimension", &self.ann.dimension())
            .field("model", &self.embedder.model_name())
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embed every document and build the nearest-neighbour store.
    ///
    /// Fails with [`IndexError::NoDocuments`] before touching the embedder when
    /// `documents` is empty.
    pub async fn build(
        documents: Vec<Document>,
        embedder: Arc<dyn Embedder>,
        config: AnnConfig,
    ) -> Result<Self, IndexError> {
        if documents.is_empty() {
            warn!("index_build_skipped_no_documents");
            return Err(IndexError::NoDocuments);
        }
        config.validate()?;

        let start = Instant::now();
        let mut vectors = Vec::with_capacity(documents.len());
        for chunk in documents.chunks(config.embed_batch_size) {
            let texts: Vec<String> = chunk.iter().map(|d| d.text().to_string()).collect();
            let batch = match embedder.embed_batch(&texts).await {
                Ok(batch) => batch,
                Err(err) => {
                    warn!(error = %err, embedded = vectors.len(), "index_build_failed");
                    return Err(err.into());
                }
            };
            if batch.len() != texts.len() {
                return Err(IndexError::VectorCount {
                    expected: texts.len(),
                    got: batch.len(),
                });
            }
            vectors.extend(batch);
            debug!(embedded = vectors.len(), total = documents.len(), "index_build_progress");
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(IndexError::Embedding(SemanticError::Inference(
                "embedding service returned empty vectors".into(),
            )));
        }

        let mut ann = AnnIndex::new(dimension, config);
        for vector in vectors {
            ann.insert(vector)?;
        }
        ann.build();

        info!(
            documents = documents.len(),
            dimension,
            model = embedder.model_name(),
            hnsw = ann.uses_graph(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "index_built"
        );

        Ok(Self {
            documents,
            ann,
            embedder,
        })
    }

    /// Return up to `k` documents nearest to `query`, nearest first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit<'_>>, IndexError> {
        let vector = self.embedder.embed(query).await?;
        let results = self.ann.search(&vector, k)?;
        Ok(results
            .into_iter()
            .filter_map(|result| {
                self.documents.get(result.index).map(|document| SearchHit {
                    document,
                    distance: result.distance,
                })
            })
            .collect())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.ann.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use catalog::CatalogRecord;
    use semantic::HashingEmbedder;

    use super::*;

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::new(128, true),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }
    }

    /// Embeds documents fine but fails every call after the first `ok_calls`.
    struct FlakyEmbedder {
        ok_calls: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn model_name(&self) -> &str {
            "flaky"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
                return Err(SemanticError::Request("HTTP error 503".into()));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
            Ok(vec![vec![1.0]])
        }
    }

    fn doc(row: usize, name: &str, description: &str) -> Document {
        CatalogRecord {
            product_name: name.into(),
            description: description.into(),
            job_level: "Entry".into(),
            languages: "English".into(),
            test_duration: "30".into(),
            test_type: "Cognitive".into(),
            remote_testing: "Yes".into(),
        }
        .to_document(row)
    }

    fn sample_docs() -> Vec<Document> {
        vec![
            doc(0, "Verify Numerical", "Numerical reasoning test"),
            doc(1, "Verify Verbal", "Verbal reasoning comprehension"),
            doc(2, "OPQ32", "Occupational personality questionnaire"),
            doc(3, "Sales Simulation", "Sales call role play for account executives"),
        ]
    }

    #[tokio::test]
    async fn empty_document_set_never_calls_embedder() {
        let embedder = Arc::new(CountingEmbedder::new());
        let err = EmbeddingIndex::build(Vec::new(), embedder.clone(), AnnConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, IndexError::NoDocuments);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn build_embeds_in_batches() {
        let embedder = Arc::new(CountingEmbedder::new());
        let config = AnnConfig::default().with_embed_batch_size(3);
        let index = EmbeddingIndex::build(sample_docs(), embedder.clone(), config)
            .await
            .unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.dimension(), 128);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn search_returns_at_most_k_sorted_hits() {
        let index = EmbeddingIndex::build(
            sample_docs(),
            Arc::new(HashingEmbedder::new(256, true)),
            AnnConfig::default(),
        )
        .await
        .unwrap();

        for k in [0, 1, 3, 8] {
            let hits = index.search("numerical reasoning", k).await.unwrap();
            assert_eq!(hits.len(), k.min(4));
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }

        let hits = index.search("numerical reasoning test", 8).await.unwrap();
        assert_eq!(hits[0].document.row_index(), 0);
    }

    #[tokio::test]
    async fn search_does_not_change_results() {
        let index = EmbeddingIndex::build(
            sample_docs(),
            Arc::new(HashingEmbedder::new(256, true)),
            AnnConfig::default(),
        )
        .await
        .unwrap();
        let first: Vec<_> = index
            .search("personality", 4)
            .await
            .unwrap()
            .iter()
            .map(|h| h.document.row_index())
            .collect();
        let second: Vec<_> = index
            .search("personality", 4)
            .await
            .unwrap()
            .iter()
            .map(|h| h.document.row_index())
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn build_failure_surfaces_embedding_error() {
        let embedder = Arc::new(FlakyEmbedder {
            ok_calls: 0,
            calls: AtomicUsize::new(0),
        });
        let err = EmbeddingIndex::build(sample_docs(), embedder, AnnConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Embedding(SemanticError::Request(_))));
    }

    #[tokio::test]
    async fn query_embedding_failure_is_reported() {
        let embedder = Arc::new(FlakyEmbedder {
            ok_calls: 1,
            calls: AtomicUsize::new(0),
        });
        let index = EmbeddingIndex::build(sample_docs(), embedder, AnnConfig::default())
            .await
            .unwrap();
        let err = index.search("anything", 8).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn mismatched_vector_count_is_rejected() {
        let err = EmbeddingIndex::build(sample_docs(), Arc::new(ShortEmbedder), AnnConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, IndexError::VectorCount { expected: 4, got: 1 });
    }
}
