//! Error types produced by the catalog crate.
//!
//! Every failure is fatal for the load as a whole: the caller receives no
//! documents at all, only one of the errors below. Per-row problems never
//! surface here because empty cells are defaulted instead of rejected.
//!
//! # Error Categories
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`NotFound`](SourceError::NotFound) | Source | Catalog path does not exist |
//! | [`Unreadable`](SourceError::Unreadable) | Source | Path exists but could not be read |
//! | [`Empty`](SourceError::Empty) | Source | Zero bytes, whitespace only, or no header |
//! | [`Unparseable`](SourceError::Unparseable) | Source | Malformed CSV (ragged rows, bad quoting) |
//! | [`Encoding`](SourceError::Encoding) | Source | Bytes are not valid UTF-8 |
//! | [`MissingColumns`](SchemaError::MissingColumns) | Schema | Required header columns absent |
//!
//! # Example
//!
//! ```rust
//! use catalog::{parse_catalog, CatalogConfig, CatalogError, SourceError};
//!
//! let err = parse_catalog("catalog.csv", b"   \n", &CatalogConfig::default()).unwrap_err();
//! assert!(matches!(err, CatalogError::Source(SourceError::Empty { .. })));
//! assert_eq!(err.kind(), "empty");
//! ```
use thiserror::Error;

/// Failures reading or decoding the catalog source itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceError {
    #[error("'{source_name}' not found. Please ensure the file is in the project directory.")]
    NotFound { source_name: String },

    #[error("unable to read '{source_name}': {detail}")]
    Unreadable { source_name: String, detail: String },

    #[error("'{source_name}' is empty. Please provide a valid CSV file.")]
    Empty { source_name: String },

    /// The CSV reader rejected the content, for example a row with a
    /// different field count than the header.
    #[error(
        "Failed to parse '{source_name}': {detail}. Ensure the file is a valid CSV with the correct format."
    )]
    Unparseable { source_name: String, detail: String },

    /// `valid_up_to` is the byte offset of the first invalid sequence.
    #[error(
        "Unable to read '{source_name}' due to encoding issues (invalid UTF-8 after byte {valid_up_to}). Ensure the file is saved with UTF-8 encoding."
    )]
    Encoding {
        source_name: String,
        valid_up_to: usize,
    },
}

/// Structural problems with the header row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("CSV must contain all required columns: [{}] (missing: {})", .required.join(", "), .missing.join(", "))]
    MissingColumns {
        required: Vec<String>,
        missing: Vec<String>,
    },
}

/// Umbrella error returned by [`load_catalog`](crate::load_catalog) and
/// [`parse_catalog`](crate::parse_catalog).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl CatalogError {
    /// Stable machine-readable label for logs and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Source(SourceError::NotFound { .. }) => "not_found",
            CatalogError::Source(SourceError::Unreadable { .. }) => "unreadable",
            CatalogError::Source(SourceError::Empty { .. }) => "empty",
            CatalogError::Source(SourceError::Unparseable { .. }) => "unparseable",
            CatalogError::Source(SourceError::Encoding { .. }) => "encoding",
            CatalogError::Schema(SchemaError::MissingColumns { .. }) => "missing_columns",
        }
    }
}
