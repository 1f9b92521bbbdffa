use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::normalize::l2_normalize_in_place;
use crate::retry::{execute_with_retry_async, RetryConfig};
use crate::{Embedder, SemanticConfig, SemanticError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

impl ApiProviderKind {
    pub(crate) fn from_config(cfg: &SemanticConfig) -> Self {
        let provider = cfg
            .api_provider
            .as_deref()
            .unwrap_or("custom")
            .to_ascii_lowercase();
        match provider.as_str() {
            "hf" | "huggingface" => ApiProviderKind::HuggingFace,
            "openai" | "gpt" => ApiProviderKind::OpenAI,
            _ => ApiProviderKind::Custom,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ApiProviderKind::HuggingFace => "huggingface",
            ApiProviderKind::OpenAI => "openai",
            ApiProviderKind::Custom => "custom",
        }
    }
}

/// Embedder backed by a remote HTTP inference endpoint.
///
/// Supports Hugging Face feature-extraction (`{"inputs": [...]}`), OpenAI
/// embeddings (`{"input": [...], "model": ...}`) and a custom
/// `{"texts": [...]}` shape. Transport failures are retried per
/// [`SemanticConfig::retry_config`].
#[derive(Debug, Clone)]
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    provider: ApiProviderKind,
    model_name: String,
    normalize: bool,
    retry: RetryConfig,
}

impl ApiEmbedder {
    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        let url = cfg
            .api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SemanticError::InvalidConfig("api_url is required for api mode".into()))?
            .to_string();

        let timeout = Duration::from_secs(cfg.api_timeout_secs.unwrap_or(30));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            auth_header: resolve_auth_header(cfg),
            provider: ApiProviderKind::from_config(cfg),
            model_name: cfg.model_name.clone(),
            normalize: cfg.normalize,
            retry: cfg.retry_config.unwrap_or_default(),
        })
    }

    async fn send(&self, payload: Value) -> Result<Value, SemanticError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .json(&payload)
            .send()
            .await
            .map_err(|e| SemanticError::Request(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SemanticError::Request(format!("HTTP error {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::Inference(format!("Invalid JSON response: {e}")))
    }
}

fn failure_detail(err: &SemanticError) -> String {
    match err {
        SemanticError::Request(msg) | SemanticError::Inference(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn resolve_auth_header(cfg: &SemanticConfig) -> Option<String> {
    if let Some(header) = cfg.api_auth_header.as_deref() {
        return Some(header.to_string());
    }
    let var = cfg.api_token_env.as_deref()?;
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => Some(format!("Bearer {}", token.trim())),
        _ => {
            warn!(env = var, "embedding_api_token_missing");
            None
        }
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let payload = build_api_payload(self.provider, texts, &self.model_name);
        let outcome = execute_with_retry_async(&self.retry, |_| {
            let payload = payload.clone();
            async move { self.send(payload).await.map_err(|e| failure_detail(&e)) }
        })
        .await;
        debug!(
            provider = self.provider.name(),
            attempts = outcome.attempts,
            elapsed_micros = outcome.total_duration.as_micros() as u64,
            inputs = texts.len(),
            "embedding_api_call"
        );

        let response = outcome.into_result().map_err(SemanticError::Request)?;
        let mut vectors = parse_embeddings_from_value(response)?;

        if vectors.len() != texts.len() {
            return Err(SemanticError::Inference(format!(
                "API returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(expected) = vectors.first().map(Vec::len) {
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
                return Err(SemanticError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }
        if self.normalize {
            vectors.iter_mut().for_each(|v| l2_normalize_in_place(v));
        }
        Ok(vectors)
    }
}

pub(crate) fn build_api_payload(provider: ApiProviderKind, texts: &[String], model: &str) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": model }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(SemanticError::Inference(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(SemanticError::Inference(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_config(provider: &str) -> SemanticConfig {
        SemanticConfig {
            mode: "api".into(),
            api_url: Some("http://127.0.0.1:9/embed".into()),
            api_provider: Some(provider.into()),
            retry_config: Some(RetryConfig::default().with_max_retries(0)),
            ..Default::default()
        }
    }

    #[test]
    fn provider_kind_from_hint() {
        assert_eq!(ApiProviderKind::from_config(&api_config("HF")), ApiProviderKind::HuggingFace);
        assert_eq!(ApiProviderKind::from_config(&api_config("openai")), ApiProviderKind::OpenAI);
        assert_eq!(ApiProviderKind::from_config(&api_config("other")), ApiProviderKind::Custom);
    }

    #[test]
    fn payload_shapes_per_provider() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_api_payload(ApiProviderKind::HuggingFace, &texts, "m"),
            json!({ "inputs": ["a", "b"] })
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::OpenAI, &texts, "text-embedding-3-small"),
            json!({ "input": ["a", "b"], "model": "text-embedding-3-small" })
        );
        assert_eq!(
            build_api_payload(ApiProviderKind::Custom, &texts, "m"),
            json!({ "texts": ["a", "b"] })
        );
    }

    #[test]
    fn parses_openai_data_shape() {
        let value = json!({ "data": [ { "embedding": [0.1, 0.2] }, { "embedding": [0.3, 0.4] } ] });
        let vectors = parse_embeddings_from_value(value).unwrap();
        assert_eq!(vectors.len(), 2);
        assert!((vectors[1][0] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn parses_bare_nested_arrays_and_single_vector() {
        let nested = parse_embeddings_from_value(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(nested.len(), 2);
        let single = parse_embeddings_from_value(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(single, vec![vec![1.0, 2.0, 3.0]]);
        let keyed = parse_embeddings_from_value(json!({ "embeddings": [[0.5]] })).unwrap();
        assert_eq!(keyed, vec![vec![0.5]]);
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(parse_embeddings_from_value(json!({ "vectors": [] })).is_err());
        assert!(parse_embeddings_from_value(json!(["x", "y"])).is_err());
        assert!(parse_embeddings_from_value(json!({ "data": [ { "vec": [1.0] } ] })).is_err());
    }

    #[test]
    fn explicit_auth_header_wins() {
        let cfg = SemanticConfig {
            api_auth_header: Some("Bearer literal".into()),
            api_token_env: Some("SHL_TEST_UNSET_TOKEN_VAR".into()),
            ..api_config("hf")
        };
        assert_eq!(resolve_auth_header(&cfg).as_deref(), Some("Bearer literal"));
    }

    #[test]
    fn missing_url_is_invalid_config() {
        let cfg = SemanticConfig {
            api_url: None,
            ..api_config("hf")
        };
        assert!(matches!(
            ApiEmbedder::from_config(&cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let embedder = ApiEmbedder::from_config(&api_config("hf")).unwrap();
        let err = embedder
            .embed_batch(&["hello".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, SemanticError::Request(_)));
    }

    #[tokio::test]
    async fn empty_batch_skips_network() {
        let embedder = ApiEmbedder::from_config(&api_config("hf")).unwrap();
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
