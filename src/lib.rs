//! Workspace umbrella crate for the SHL assessment recommender.
//!
//! This crate stitches the catalog loader, the embedding index and the query
//! orchestrator together so callers can go from a config file to a ready
//! [`Recommender`] with one call to [`bootstrap`].
//!
//! Index construction is memoized by [`ResourceCache`]: loading the same
//! catalog bytes with the same embedding settings hands back the existing
//! `Arc<EmbeddingIndex>` instead of embedding everything again.

pub mod config;

pub use catalog::{
    load_catalog, parse_catalog, Catalog, CatalogConfig, CatalogError, CatalogField,
    CatalogRecord, Document, DocumentMetadata, SchemaError, SourceError,
};
pub use index::{AnnConfig, EmbeddingIndex, IndexError, SearchHit};
pub use matcher::{
    apply_filter, EchoGenerator, FilterCriteria, FilterOptions, FilterOutcome, GenerationConfig,
    GenerationError, Generator, QueryError, QueryFailure, QueryOutcome, QueryStage,
    RecommendConfig, Recommendation, Recommender, EMPTY_QUERY_NOTICE, FALLBACK_NOTICE,
    META_ANSWER, SAMPLE_QUESTIONS,
};
pub use semantic::{build_embedder, Embedder, HashingEmbedder, SemanticConfig, SemanticError};

pub use crate::config::{ConfigLoadError, RecommenderConfig};

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Errors that stop the recommender from starting. All of them are fatal for
/// the session: the shell shows the diagnostic and serves no queries.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigLoadError),
    Catalog(CatalogError),
    Embedding(SemanticError),
    Index(IndexError),
    Query(QueryError),
}

impl PipelineError {
    /// Stable short label for logs and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Config(ConfigLoadError::MissingCredential(_)) => "missing_credential",
            PipelineError::Config(_) => "config",
            PipelineError::Catalog(err) => err.kind(),
            PipelineError::Embedding(_) => "embedding",
            PipelineError::Index(IndexError::NoDocuments) => "no_documents",
            PipelineError::Index(_) => "index",
            PipelineError::Query(_) => "config",
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(err) => write!(f, "{err}"),
            PipelineError::Catalog(err) => write!(f, "{err}"),
            PipelineError::Embedding(err) => write!(f, "failed to initialize embedder: {err}"),
            PipelineError::Index(IndexError::NoDocuments) => write!(f, "{}", IndexError::NoDocuments),
            PipelineError::Index(err) => write!(f, "failed to build the index: {err}"),
            PipelineError::Query(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Config(err) => Some(err),
            PipelineError::Catalog(err) => Some(err),
            PipelineError::Embedding(err) => Some(err),
            PipelineError::Index(err) => Some(err),
            PipelineError::Query(err) => Some(err),
        }
    }
}

impl From<ConfigLoadError> for PipelineError {
    fn from(value: ConfigLoadError) -> Self {
        PipelineError::Config(value)
    }
}

impl From<CatalogError> for PipelineError {
    fn from(value: CatalogError) -> Self {
        PipelineError::Catalog(value)
    }
}

impl From<SourceError> for PipelineError {
    fn from(value: SourceError) -> Self {
        PipelineError::Catalog(value.into())
    }
}

impl From<SemanticError> for PipelineError {
    fn from(value: SemanticError) -> Self {
        PipelineError::Embedding(value)
    }
}

impl From<IndexError> for PipelineError {
    fn from(value: IndexError) -> Self {
        PipelineError::Index(value)
    }
}

impl From<QueryError> for PipelineError {
    fn from(value: QueryError) -> Self {
        PipelineError::Query(value)
    }
}

/// Metrics observer for startup stages.
pub trait PipelineMetrics: Send + Sync {
    fn record_catalog(&self, latency: Duration, result: Result<usize, &CatalogError>);
    fn record_index_build(&self, latency: Duration, result: Result<usize, &IndexError>);
    fn record_cache(&self, hit: bool);
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_catalog(self, result: Result<usize, &CatalogError>) {
        self.recorder.record_catalog(self.start.elapsed(), result);
    }

    fn record_index_build(self, result: Result<usize, &IndexError>) {
        self.recorder.record_index_build(self.start.elapsed(), result);
    }
}

/// Identity of a built index: catalog content plus everything that shapes
/// its documents and vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    content_sha256: String,
    settings: String,
}

impl CacheKey {
    pub fn new(bytes: &[u8], cfg: &RecommenderConfig) -> Self {
        let digest = Sha256::digest(bytes);
        Self {
            content_sha256: hex::encode(digest),
            settings: format!(
                "{}|{:?}|{:?}|{}|{}",
                cfg.catalog.missing_value,
                cfg.catalog.delimiter,
                cfg.catalog.escape,
                cfg.semantic.fingerprint(),
                cfg.index.min_vectors_for_ann,
            ),
        }
    }

    pub fn content_sha256(&self) -> &str {
        &self.content_sha256
    }
}

/// Memoized index construction.
///
/// Keeps the most recent `capacity` indexes. A hit returns the cached `Arc`;
/// a miss parses, embeds and builds, then stores the result. Failures are
/// never cached.
pub struct ResourceCache {
    entries: Mutex<Vec<(CacheKey, Arc<EmbeddingIndex>)>>,
    capacity: usize,
}

impl ResourceCache {
    pub const DEFAULT_CAPACITY: usize = 4;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Process-wide cache shared by [`bootstrap`] and catalog reloads.
    pub fn global() -> &'static ResourceCache {
        static CACHE: OnceLock<ResourceCache> = OnceLock::new();
        CACHE.get_or_init(|| ResourceCache::new(Self::DEFAULT_CAPACITY))
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<EmbeddingIndex>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, index)| Arc::clone(index))
    }

    fn insert(&self, key: CacheKey, index: Arc<EmbeddingIndex>) -> Arc<EmbeddingIndex> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // A concurrent build of the same key may have finished first.
        if let Some((_, existing)) = entries.iter().find(|(k, _)| *k == key) {
            return Arc::clone(existing);
        }
        if entries.len() >= self.capacity {
            entries.remove(0);
        }
        entries.push((key, Arc::clone(&index)));
        index
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Return the index for `bytes`, building it on a miss.
    pub async fn get_or_build(
        &self,
        source_name: &str,
        bytes: &[u8],
        cfg: &RecommenderConfig,
    ) -> Result<Arc<EmbeddingIndex>, PipelineError> {
        let key = CacheKey::new(bytes, cfg);
        if let Some(index) = self.get(&key) {
            info!(sha256 = key.content_sha256(), "index_cache_hit");
            if let Some(recorder) = metrics_recorder() {
                recorder.record_cache(true);
            }
            return Ok(index);
        }
        if let Some(recorder) = metrics_recorder() {
            recorder.record_cache(false);
        }

        let catalog_metrics = MetricsSpan::start();
        let catalog = match parse_catalog(source_name, bytes, &cfg.catalog) {
            Ok(catalog) => {
                if let Some(span) = catalog_metrics {
                    span.record_catalog(Ok(catalog.len()));
                }
                catalog
            }
            Err(err) => {
                if let Some(span) = catalog_metrics {
                    span.record_catalog(Err(&err));
                }
                return Err(err.into());
            }
        };

        let embedder = build_embedder(&cfg.semantic)?;
        let index_metrics = MetricsSpan::start();
        let index = match EmbeddingIndex::build(catalog.into_documents(), embedder, cfg.index).await
        {
            Ok(index) => {
                if let Some(span) = index_metrics {
                    span.record_index_build(Ok(index.len()));
                }
                index
            }
            Err(err) => {
                if let Some(span) = index_metrics {
                    span.record_index_build(Err(&err));
                }
                return Err(err.into());
            }
        };

        Ok(self.insert(key, Arc::new(index)))
    }
}

/// Build a ready recommender from configuration.
///
/// The generator (and so the credential check) comes first, so a missing API
/// key halts startup before any catalog work. The index is memoized in
/// [`ResourceCache::global`].
pub async fn bootstrap(cfg: &RecommenderConfig) -> Result<Arc<Recommender>, PipelineError> {
    let generator = cfg.build_generator()?;
    bootstrap_with(cfg, generator, ResourceCache::global()).await
}

/// [`bootstrap`] with an explicit generator and cache.
pub async fn bootstrap_with(
    cfg: &RecommenderConfig,
    generator: Arc<dyn Generator>,
    cache: &ResourceCache,
) -> Result<Arc<Recommender>, PipelineError> {
    let start = Instant::now();
    let path = &cfg.catalog.path;
    let result = async {
        let bytes = catalog::read_source(path)?;
        let source_name = path.display().to_string();
        let index = cache.get_or_build(&source_name, &bytes, cfg).await?;
        let recommender = Recommender::try_new(index, generator, cfg.retrieval)?;
        Ok::<_, PipelineError>(Arc::new(recommender))
    }
    .await;

    match &result {
        Ok(recommender) => info!(
            path = %path.display(),
            documents = recommender.index().len(),
            generator = recommender.generator_name(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "recommender_ready"
        ),
        Err(err) => warn!(
            path = %path.display(),
            kind = err.kind(),
            error = %err,
            "recommender_halted"
        ),
    }
    result
}
