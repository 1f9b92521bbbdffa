//! Nearest-neighbour store over document embeddings.
//!
//! Small catalogs are searched with an exact linear scan. Once the number of
//! vectors reaches [`AnnConfig::min_vectors_for_ann`] the store builds a
//! Hierarchical Navigable Small World graph (`hnsw_rs`) and answers queries
//! approximately in roughly logarithmic time.
//!
//! Both paths use cosine distance (`1 - cosine similarity`) and always return
//! results nearest-first.

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for index construction and search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Number of neighbors per node (higher = better recall, slower build).
    pub m: usize,
    /// Size of dynamic candidate list during construction.
    pub ef_construction: usize,
    /// Size of dynamic candidate list during search.
    pub ef_search: usize,
    /// Hard cap on results returned from a single search.
    pub max_results: usize,
    /// Whether to use HNSW at all or always scan linearly.
    pub enabled: bool,
    /// Below this many vectors the exact linear scan is used even if enabled.
    pub min_vectors_for_ann: usize,
    /// Number of documents sent to the embedder per request during build.
    pub embed_batch_size: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 50,
            max_results: 100,
            enabled: true,
            min_vectors_for_ann: 1000,
            embed_batch_size: 32,
        }
    }
}

impl AnnConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }

    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size;
        self
    }

    /// Check if ANN should be used given the current dataset size.
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        self.enabled && num_vectors >= self.min_vectors_for_ann
    }

    pub fn validate(&self) -> Result<(), AnnError> {
        if self.m == 0 || self.ef_construction == 0 || self.ef_search == 0 {
            return Err(AnnError::InvalidConfig(
                "m, ef_construction and ef_search must be greater than zero".into(),
            ));
        }
        if self.max_results == 0 || self.embed_batch_size == 0 {
            return Err(AnnError::InvalidConfig(
                "max_results and embed_batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Result from a nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnResult {
    /// Position of the vector in insertion order.
    pub index: usize,
    /// Distance to query vector (lower = closer).
    pub distance: f32,
}

/// Vector store with an optional HNSW graph.
pub struct AnnIndex {
    config: AnnConfig,
    dimension: usize,
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    vectors: Vec<Vec<f32>>,
    built: bool,
}

impl AnnIndex {
    /// Create a new empty index.
    pub fn new(dimension: usize, config: AnnConfig) -> Self {
        Self {
            config,
            dimension,
            hnsw: None,
            vectors: Vec::new(),
            built: false,
        }
    }

    /// Append a vector. Its position is its insertion order.
    pub fn insert(&mut self, vector: Vec<f32>) -> Result<usize, AnnError> {
        if vector.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        let index = self.vectors.len();
        self.vectors.push(vector);
        self.built = false;
        Ok(index)
    }

    /// Search for the `k` nearest vectors, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<AnnResult>, AnnError> {
        if !self.built {
            return Err(AnnError::NotBuilt);
        }
        if query.len() != self.dimension {
            return Err(AnnError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let k = k.min(self.config.max_results).min(self.vectors.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // a zero query has no direction; the graph's cosine metric is undefined for it
        let zero_query = query.iter().all(|x| *x == 0.0);
        match self.hnsw.as_ref() {
            Some(hnsw) if !zero_query && self.config.should_use_ann(self.vectors.len()) => {
                Ok(self.hnsw_search(hnsw, query, k))
            }
            _ => Ok(self.linear_search(query, k)),
        }
    }

    fn hnsw_search(
        &self,
        hnsw: &Hnsw<'static, f32, DistCosine>,
        query: &[f32],
        k: usize,
    ) -> Vec<AnnResult> {
        let ef = self.config.ef_search.max(k);
        let neighbours: Vec<Neighbour> = hnsw.search(query, k, ef);

        let mut results: Vec<AnnResult> = neighbours
            .into_iter()
            .map(|neighbour| AnnResult {
                index: neighbour.get_origin_id(),
                distance: neighbour.distance,
            })
            .collect();
        sort_nearest_first(&mut results);
        results.truncate(k);
        results
    }

    /// Exact scan over every stored vector.
    fn linear_search(&self, query: &[f32], k: usize) -> Vec<AnnResult> {
        let mut results: Vec<AnnResult> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vec)| AnnResult {
                index,
                distance: cosine_distance(query, vec),
            })
            .collect();
        sort_nearest_first(&mut results);
        results.truncate(k);
        results
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Whether searches will go through the HNSW graph.
    pub fn uses_graph(&self) -> bool {
        self.hnsw.is_some() && self.config.should_use_ann(self.vectors.len())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &AnnConfig {
        &self.config
    }

    /// Finalize the index for searching.
    ///
    /// The HNSW graph is only constructed when enough vectors are present; below
    /// that (and always below 10 vectors) the index is marked built and searches
    /// scan linearly.
    pub fn build(&mut self) {
        self.hnsw = None;
        let nb_elem = self.vectors.len();
        if nb_elem < 10 || !self.config.should_use_ann(nb_elem) {
            self.built = true;
            return;
        }

        let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
        let hnsw = Hnsw::<f32, DistCosine>::new(
            self.config.m,
            nb_elem,
            nb_layer,
            self.config.ef_construction,
            DistCosine {},
        );

        let data_for_insertion: Vec<(&Vec<f32>, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vec)| (vec, idx))
            .collect();
        hnsw.parallel_insert(&data_for_insertion);

        self.hnsw = Some(hnsw);
        self.built = true;
    }
}

/// Error type for ANN operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnnError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("index not built")]
    NotBuilt,
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
}

fn sort_nearest_first(results: &mut [AnnResult]) {
    results.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.index.cmp(&b.index))
    });
}

/// Cosine distance (1 - cosine similarity) in `[0, 2]`.
/// Zero vectors are at distance 1 from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    let similarity = dot / (norm_a * norm_b);
    1.0 - similarity.clamp(-1.0, 1.0)
}
