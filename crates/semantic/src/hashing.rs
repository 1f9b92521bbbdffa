use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{Embedder, SemanticConfig, SemanticError};

/// Deterministic offline embedder used in `"fast"` mode.
///
/// Each lowercase alphanumeric token, and each adjacent token pair at half
/// weight, is hashed into one of `dimension` buckets with a hash-derived sign.
/// Texts sharing vocabulary end up close under cosine distance, which is
/// enough for small catalogs and for tests that must not touch the network.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl HashingEmbedder {
    pub fn new(dimension: usize, normalize: bool) -> Self {
        Self {
            model_name: format!("hashing-{dimension}"),
            dimension,
            normalize,
        }
    }

    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        if cfg.dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimension must be greater than zero".into(),
            ));
        }
        Ok(Self::new(cfg.dimension, cfg.normalize))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut v, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut v, joined.as_bytes(), 0.5);
        }

        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }

    fn accumulate(&self, v: &mut [f32], bytes: &[u8], weight: f32) {
        let h = hash64(bytes);
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if h >> 63 == 1 { -1.0 } else { 1.0 };
        v[bucket] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn embedding_has_configured_dimension() {
        let embedder = HashingEmbedder::new(64, true);
        assert_eq!(embedder.embed_text("hello world").len(), 64);
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.model_name(), "hashing-64");
    }

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashingEmbedder::new(384, true);
        assert_eq!(
            embedder.embed_text("Numerical reasoning test"),
            embedder.embed_text("Numerical reasoning test")
        );
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let embedder = HashingEmbedder::new(384, true);
        assert_eq!(
            embedder.embed_text("Entry-level, CUSTOMER service!"),
            embedder.embed_text("entry level customer service")
        );
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let embedder = HashingEmbedder::new(384, true);
        let query = embedder.embed_text("entry level numerical test");
        let related = embedder.embed_text("Verify Numerical: numerical reasoning test for entry level");
        let unrelated = embedder.embed_text("Sales personality questionnaire for executives");
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn normalized_vectors_have_unit_length() {
        let embedder = HashingEmbedder::new(128, true);
        let v = embedder.embed_text("a b c d e f g");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16, true);
        assert!(embedder.embed_text("  ... ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let cfg = SemanticConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(HashingEmbedder::from_config(&cfg).is_err());
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let embedder = HashingEmbedder::new(32, false);
        let texts = vec!["first".to_string(), "second".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors[0], embedder.embed_text("first"));
        assert_eq!(vectors[1], embedder.embed_text("second"));
    }
}
