use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::SemanticError;

/// Runtime configuration describing which embedding provider to use and how to
/// post-process vectors.
///
/// # Example
/// ```
/// use semantic::SemanticConfig;
///
/// let cfg = SemanticConfig {
///     mode: "api".into(),
///     api_url: Some("https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction".into()),
///     api_provider: Some("hf".into()),
///     api_token_env: Some("HF_TOKEN".into()),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// Provider selector: `"fast"` (offline hashing embedder) or `"api"` (remote HTTP).
    pub mode: String,
    /// Friendly label, also sent as `model` to OpenAI-style endpoints.
    pub model_name: String,
    /// Vector width for the offline embedder. Remote providers define their own.
    pub dimension: usize,
    /// API inference endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Literal authorization header (e.g., `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Environment variable holding a bearer token. Used when
    /// [`api_auth_header`](Self::api_auth_header) is unset.
    pub api_token_env: Option<String>,
    /// Remote provider hint: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Overall API timeout in seconds.
    pub api_timeout_secs: Option<u64>,
    /// Normalize the resulting vector to unit-length (recommended for cosine similarity).
    pub normalize: bool,
    /// Retry configuration for API calls. `None` uses [`RetryConfig::default`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_config: Option<RetryConfig>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: "fast".into(),
            model_name: "all-MiniLM-L6-v2".into(),
            dimension: 384,
            api_url: None,
            api_auth_header: None,
            api_token_env: None,
            api_provider: None,
            api_timeout_secs: Some(30),
            normalize: true,
            retry_config: None,
        }
    }
}

impl SemanticConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        match self.mode.as_str() {
            "fast" => {
                if self.dimension == 0 {
                    return Err(SemanticError::InvalidConfig(
                        "dimension must be greater than zero".into(),
                    ));
                }
            }
            "api" => {
                if self.api_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                    return Err(SemanticError::InvalidConfig(
                        "api_url is required for api mode".into(),
                    ));
                }
            }
            other => {
                return Err(SemanticError::InvalidConfig(format!(
                    "unknown embedding mode '{other}' (expected 'fast' or 'api')"
                )));
            }
        }
        if self.api_timeout_secs == Some(0) {
            return Err(SemanticError::InvalidConfig(
                "api_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Identity of everything that influences vector values. Two configs with
    /// the same fingerprint produce identical embeddings for identical text.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.mode,
            self.model_name,
            self.dimension,
            self.api_url.as_deref().unwrap_or(""),
            self.api_provider.as_deref().unwrap_or("custom"),
            self.normalize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = SemanticConfig::default();
        assert_eq!(cfg.mode, "fast");
        assert_eq!(cfg.model_name, "all-MiniLM-L6-v2");
        assert_eq!(cfg.dimension, 384);
        assert!(cfg.api_url.is_none());
        assert_eq!(cfg.api_timeout_secs, Some(30));
        assert!(cfg.normalize);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_mode_requires_url() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SemanticError::InvalidConfig(msg)) if msg.contains("api_url")
        ));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let cfg = SemanticConfig {
            mode: "onnx".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = SemanticConfig {
            mode: "api".into(),
            api_url: Some("https://api.example.com/embed".into()),
            api_provider: Some("openai".into()),
            retry_config: Some(RetryConfig::default().with_max_retries(1)),
            ..Default::default()
        };
        let serialized = serde_json::to_string(&cfg).unwrap();
        let deserialized: SemanticConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn fingerprint_ignores_transport_settings() {
        let base = SemanticConfig::default();
        let slower = SemanticConfig {
            api_timeout_secs: Some(120),
            ..Default::default()
        };
        let wider = SemanticConfig {
            dimension: 512,
            ..Default::default()
        };
        assert_eq!(base.fingerprint(), slower.fingerprint());
        assert_ne!(base.fingerprint(), wider.fingerprint());
    }
}
