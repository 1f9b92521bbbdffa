use thiserror::Error;

/// Errors surfaced by embedding providers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., api mode without an `api_url`).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// The embedding service could not be reached or answered with an HTTP error.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The service answered but the payload could not be turned into vectors.
    #[error("inference failure: {0}")]
    Inference(String),
    /// A provider returned vectors of differing lengths.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
