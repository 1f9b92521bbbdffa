//! Text embeddings for the assessment recommender
//!
//! This crate turns catalog documents and user queries into dense vectors
//! for similarity search. Everything downstream talks to the [`Embedder`]
//! trait, so the index never knows which provider it is using.
//!
//! We support two modes:
//!
//! - **Fast mode** - [`HashingEmbedder`], a deterministic feature-hashing
//!   embedder. No network, no model files, identical output every run.
//! - **API mode** - [`ApiEmbedder`], which calls out to Hugging Face
//!   feature-extraction (e.g. `sentence-transformers/all-MiniLM-L6-v2`), an
//!   OpenAI embeddings endpoint, or any service speaking `{"texts": [...]}`.
//!
//! Unlike generation, embedding calls are retried on transient transport
//! errors (see [`retry`]). A request that still fails surfaces as
//! [`SemanticError`] and the caller decides what that means for the query.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{build_embedder, SemanticConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let embedder = build_embedder(&SemanticConfig::default()).unwrap();
//! let vector = embedder.embed("entry level numerical test").await.unwrap();
//! assert_eq!(vector.len(), 384);
//! # }
//! ```
//!
//! ## API mode example
//!
//! ```no_run
//! use semantic::{build_embedder, SemanticConfig};
//!
//! # async fn run() {
//! let cfg = SemanticConfig {
//!     mode: "api".into(),
//!     api_url: Some("https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction".into()),
//!     api_provider: Some("hf".into()),
//!     api_token_env: Some("HF_TOKEN".into()),
//!     ..Default::default()
//! };
//! let embedder = build_embedder(&cfg).unwrap();
//! let vectors = embedder.embed_batch(&["Another test.".to_string()]).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

pub mod config;
pub mod error;
pub mod retry;
mod serde_millis;

mod api;
mod hashing;
mod normalize;

pub use crate::api::ApiEmbedder;
pub use crate::config::SemanticConfig;
pub use crate::error::SemanticError;
pub use crate::hashing::HashingEmbedder;
pub use crate::normalize::l2_normalize_in_place;

/// Opaque text-to-vector capability.
///
/// Implementations must be deterministic for identical input within a process
/// and must return one vector per input, in input order, all of equal length.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Label used in logs and cache keys.
    fn model_name(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| SemanticError::Inference("embedding service returned no vector".into()))
    }
}

/// Construct the embedder selected by `cfg.mode`.
pub fn build_embedder(cfg: &SemanticConfig) -> Result<Arc<dyn Embedder>, SemanticError> {
    cfg.validate()?;
    match cfg.mode.as_str() {
        "api" => Ok(Arc::new(ApiEmbedder::from_config(cfg)?)),
        _ => Ok(Arc::new(HashingEmbedder::from_config(cfg)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyEmbedder;

    #[async_trait]
    impl Embedder for EmptyEmbedder {
        fn model_name(&self) -> &str {
            "empty"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn build_embedder_fast_mode() {
        let embedder = build_embedder(&SemanticConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "hashing-384");
        let v = embedder.embed("hello").await.unwrap();
        assert_eq!(v.len(), 384);
    }

    #[test]
    fn build_embedder_rejects_invalid_mode() {
        let cfg = SemanticConfig {
            mode: "onnx".into(),
            ..Default::default()
        };
        assert!(matches!(
            build_embedder(&cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn build_embedder_api_mode() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_url: Some("http://localhost:1/embed".into()),
            ..Default::default()
        };
        let embedder = build_embedder(&cfg).unwrap();
        assert_eq!(embedder.model_name(), "all-MiniLM-L6-v2");
    }

    #[tokio::test]
    async fn embed_reports_missing_vector() {
        let err = EmptyEmbedder.embed("x").await.unwrap_err();
        assert!(matches!(err, SemanticError::Inference(_)));
    }
}
