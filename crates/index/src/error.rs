use semantic::SemanticError;
use thiserror::Error;

use crate::ann::AnnError;

/// Errors raised while building or querying an [`EmbeddingIndex`](crate::EmbeddingIndex).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// Build was attempted with an empty document set.
    #[error("No documents loaded. Cannot create the index. Please check your catalog file.")]
    NoDocuments,

    /// Search was attempted before a successful build.
    #[error("index has not been built")]
    NotBuilt,

    /// The embedding service failed or returned an unusable response.
    #[error("embedding service error: {0}")]
    Embedding(#[from] SemanticError),

    /// The embedder returned a different number of vectors than inputs.
    #[error("embedding service returned {got} vectors for {expected} documents")]
    VectorCount { expected: usize, got: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid index config: {0}")]
    InvalidConfig(String),
}

impl From<AnnError> for IndexError {
    fn from(err: AnnError) -> Self {
        match err {
            AnnError::NotBuilt => IndexError::NotBuilt,
            AnnError::DimensionMismatch { expected, got } => {
                IndexError::DimensionMismatch { expected, got }
            }
            AnnError::InvalidConfig(msg) => IndexError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ann_errors_map_onto_index_errors() {
        assert_eq!(IndexError::from(AnnError::NotBuilt), IndexError::NotBuilt);
        assert_eq!(
            IndexError::from(AnnError::DimensionMismatch { expected: 3, got: 2 }),
            IndexError::DimensionMismatch { expected: 3, got: 2 }
        );
    }

    #[test]
    fn embedding_error_keeps_cause() {
        let err: IndexError = SemanticError::Request("HTTP error 503".into()).into();
        assert!(err.to_string().contains("HTTP error 503"));
    }

    #[test]
    fn no_documents_message() {
        assert!(IndexError::NoDocuments
            .to_string()
            .starts_with("No documents loaded. Cannot create the index."));
    }
}
