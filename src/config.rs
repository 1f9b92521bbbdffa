//! YAML configuration for the recommender pipeline.
//!
//! Every stage reads its settings from one file. All sections are optional and
//! fall back to defaults, so an empty document (or just `version: "1.0"`) is a
//! valid configuration pointing at `shl_product_catalog.csv` with the offline
//! embedder and Gemini for generation.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "shl-demo"
//!
//! catalog:
//!   path: "data/shl_product_catalog.csv"
//!   missing_value: "Not Specified"
//!
//! semantic:
//!   mode: "fast"
//!   dimension: 384
//!
//! index:
//!   min_vectors_for_ann: 1000
//!   embed_batch_size: 32
//!
//! retrieval:
//!   retrieval_k: 8
//!   max_recommendations: 3
//!
//! generation:
//!   provider: "gemini"
//!   model: "gemini-2.0-flash"
//!   api_key_env: "GEMINI_API_KEY"
//! ```
//!
//! API keys never live in this file. They are read from the environment when
//! the generator is built; see [`RecommenderConfig::build_generator`].

use std::fs;
use std::path::Path;
use std::sync::Arc;

use catalog::CatalogConfig;
use index::AnnConfig;
use matcher::{GenerationConfig, GenerationError, Generator, RecommendConfig};
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or applying the configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    /// No usable API key for a remote generation provider.
    #[error("API key not found. Please set {0} in your environment or .env file.")]
    MissingCredential(String),
}

/// Top-level configuration for the whole recommender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecommenderConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Nearest-neighbour store settings
    #[serde(default)]
    pub index: AnnConfig,

    #[serde(default)]
    pub retrieval: RecommendConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

impl RecommenderConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RecommenderConfig = if yaml.trim().is_empty() {
            RecommenderConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.catalog
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("catalog: {e}")))?;
        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        self.index
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("index: {e}")))?;
        self.retrieval
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("retrieval: {e}")))?;
        self.generation
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("generation: {e}")))?;

        Ok(())
    }

    /// Build the configured generator, reading its key from the environment.
    ///
    /// Fails with [`ConfigLoadError::MissingCredential`] when a remote provider
    /// has no key or only a placeholder key.
    pub fn build_generator(&self) -> Result<Arc<dyn Generator>, ConfigLoadError> {
        matcher::build_generator(&self.generation).map_err(|err| match err {
            GenerationError::MissingCredential { env } => ConfigLoadError::MissingCredential(env),
            other => ConfigLoadError::Validation(format!("generation: {other}")),
        })
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            catalog: CatalogConfig::default(),
            semantic: SemanticConfig::default(),
            index: AnnConfig::default(),
            retrieval: RecommendConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
