//! Text generation providers.
//!
//! The orchestrator only sees the [`Generator`] trait: one prompt in, one
//! answer out. Calls are never retried here; a failed generation ends the
//! query and the user may simply ask again.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Env var consulted first for the Gemini key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Values shipped in sample `.env` files that must not count as a key.
const PLACEHOLDER_KEYS: [&str; 2] = ["your-actual-api-key", "your-api-key"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),

    #[error("API key not configured: set {env}")]
    MissingCredential { env: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("prompt was blocked: {0}")]
    Blocked(String),
}

/// Opaque prompt-to-text capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short provider label for logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Generation provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// `gemini`, `openai`, or `echo`.
    pub provider: String,
    pub model: String,
    /// Override of the provider's base URL.
    pub api_base: Option<String>,
    /// Env var holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.0-flash".into(),
            api_base: None,
            api_key_env: GEMINI_KEY_ENV.into(),
            timeout_secs: 60,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        match self.provider.as_str() {
            "gemini" | "openai" | "echo" => {}
            other => {
                return Err(GenerationError::InvalidConfig(format!(
                    "unknown provider '{other}', expected gemini, openai or echo"
                )))
            }
        }
        if self.requires_credential() && self.model.trim().is_empty() {
            return Err(GenerationError::InvalidConfig("model must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(GenerationError::InvalidConfig(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(GenerationError::InvalidConfig(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn requires_credential(&self) -> bool {
        self.provider != "echo"
    }

    /// Env vars searched for a key, in precedence order.
    pub fn key_envs(&self) -> Vec<&str> {
        let mut envs = Vec::with_capacity(2);
        if self.provider == "gemini" {
            envs.push(GEMINI_KEY_ENV);
        }
        if !self.api_key_env.is_empty() && !envs.contains(&self.api_key_env.as_str()) {
            envs.push(self.api_key_env.as_str());
        }
        envs
    }

    /// Look up the API key from the process environment.
    pub fn resolve_api_key(&self) -> Result<String, GenerationError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Look up the API key through `lookup`, skipping blanks and placeholders.
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let envs = self.key_envs();
        envs.iter()
            .filter_map(|name| lookup(*name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && !PLACEHOLDER_KEYS.contains(&value.as_str()))
            .ok_or_else(|| GenerationError::MissingCredential {
                env: envs.first().copied().unwrap_or(GEMINI_KEY_ENV).to_string(),
            })
    }

    fn client(&self) -> Result<Client, GenerationError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| GenerationError::InvalidConfig(format!("failed to build HTTP client: {e}")))
    }
}

/// Construct the generator named by `cfg.provider`, resolving its key from the environment.
pub fn build_generator(cfg: &GenerationConfig) -> Result<Arc<dyn Generator>, GenerationError> {
    cfg.validate()?;
    if !cfg.requires_credential() {
        return Ok(Arc::new(EchoGenerator));
    }
    let api_key = cfg.resolve_api_key()?;
    build_remote(cfg, api_key)
}

/// Construct a remote generator with an explicit key.
pub fn build_remote(
    cfg: &GenerationConfig,
    api_key: String,
) -> Result<Arc<dyn Generator>, GenerationError> {
    cfg.validate()?;
    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(cfg, api_key)?)),
        "echo" => Ok(Arc::new(EchoGenerator)),
        _ => Ok(Arc::new(GeminiGenerator::new(cfg, api_key)?)),
    }
}

async fn failure_body(resp: reqwest::Response) -> GenerationError {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    GenerationError::Status { status, body }
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Google Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiGenerator {
    pub fn new(cfg: &GenerationConfig, api_key: String) -> Result<Self, GenerationError> {
        let base = cfg.api_base.as_deref().unwrap_or(GEMINI_API_BASE);
        Ok(Self {
            client: cfg.client()?,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base.trim_end_matches('/'),
                cfg.model
            ),
            api_key,
            temperature: cfg.temperature,
            max_output_tokens: cfg.max_output_tokens,
        })
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GeminiResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::Blocked(reason));
        }
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| GenerationError::InvalidResponse("response has no candidates".into()))?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(GenerationError::InvalidResponse("candidate has no text".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let generation_config = (self.temperature.is_some() || self.max_output_tokens.is_some())
            .then_some(GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            });
        let body = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: prompt }],
            }],
            generation_config,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(failure_body(resp).await);
        }
        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        let text = parsed.into_text()?;
        debug!(chars = text.len(), "gemini_generated");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

/// Chat completions client for OpenAI and compatible gateways.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiGenerator {
    pub fn new(cfg: &GenerationConfig, api_key: String) -> Result<Self, GenerationError> {
        let base = cfg.api_base.as_deref().unwrap_or(OPENAI_API_BASE);
        Ok(Self {
            client: cfg.client()?,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_output_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| GenerationError::InvalidConfig("invalid API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(failure_body(resp).await);
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse("response has no choices".into()))
    }
}

// ---------------------------------------------------------------------------
// Echo
// ---------------------------------------------------------------------------

/// Offline generator that lists the product names found in the prompt context.
///
/// Output depends only on the prompt, so it is stable across runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoGenerator;

impl EchoGenerator {
    const LIMIT: usize = 3;

    pub fn render(prompt: &str) -> String {
        let context = prompt
            .split_once("\n\nContext:\n")
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.rsplit_once("\n\nQuestion: ").map(|(ctx, _)| ctx))
            .unwrap_or("");
        let names: Vec<&str> = context
            .lines()
            .filter_map(|line| line.strip_prefix("Product Name: "))
            .take(Self::LIMIT)
            .collect();
        if names.is_empty() {
            return "No matching assessment was found.".to_string();
        }
        let mut out = String::from("Recommended assessments:");
        for (rank, name) in names.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", rank + 1, name));
        }
        out
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        Ok(Self::render(prompt))
    }
}
