//! Assessment catalog loader
//!
//! This is where product data enters the recommender. We read a CSV export of
//! the assessment catalog, check that the required columns are all there, and
//! turn every row into an immutable [`Document`] ready for embedding.
//!
//! ## What we do here
//!
//! - **Validate the source** - missing file, empty file, bad UTF-8 and malformed
//!   CSV each produce their own [`SourceError`] variant.
//! - **Validate the schema** - every required column must be in the header, or
//!   the load fails with [`SchemaError::MissingColumns`].
//! - **Normalize cells** - blank and NA-style cells become `"Not Specified"`
//!   (configurable via [`CatalogConfig::missing_value`]).
//! - **Render documents** - one `Label: value` line per field in a fixed order,
//!   with job levels and duration kept as typed metadata for filtering.
//!
//! A load either returns every row or nothing. There is no partial success.
//!
//! ## Example
//!
//! ```
//! use catalog::{parse_catalog, CatalogConfig};
//!
//! let csv = "\"Product Name\",\"Description\",\"Job Level\",\"Languages\",\"Test Duration\",\"Test Type\",\"Remote Testing\"\n\
//!            \"Verify Numerical\",\"Numerical reasoning test\",\"Entry;Mid\",\"English\",\"30\",\"Cognitive\",\"Yes\"\n";
//!
//! let catalog = parse_catalog("inline", csv.as_bytes(), &CatalogConfig::default()).unwrap();
//! assert_eq!(catalog.len(), 1);
//! assert!(catalog.documents()[0].text().starts_with("Product Name: Verify Numerical\n"));
//! ```
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use tracing::{info, warn, Level};

mod config;
mod error;
mod record;
mod types;

use crate::record::ColumnMap;

pub use crate::config::{CatalogConfig, ConfigError};
pub use crate::error::{CatalogError, SchemaError, SourceError};
pub use crate::types::{
    split_job_levels, Catalog, CatalogField, CatalogRecord, Document, DocumentMetadata,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read the raw bytes of a catalog file.
pub fn read_source(path: &Path) -> Result<Vec<u8>, SourceError> {
    let source_name = path.display().to_string();
    std::fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => SourceError::NotFound { source_name },
        _ => SourceError::Unreadable {
            source_name,
            detail: err.to_string(),
        },
    })
}

/// Load and normalize the catalog at `cfg.path`.
pub fn load_catalog(cfg: &CatalogConfig) -> Result<Catalog, CatalogError> {
    let start = Instant::now();
    let bytes = match read_source(&cfg.path) {
        Ok(bytes) => bytes,
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(path = %cfg.path.display(), error = %err, elapsed_micros, "catalog_load_failed");
            return Err(err.into());
        }
    };
    parse_catalog(&cfg.path.display().to_string(), &bytes, cfg)
}

/// Parse catalog bytes that were already read from `source_name`.
pub fn parse_catalog(
    source_name: &str,
    bytes: &[u8],
    cfg: &CatalogConfig,
) -> Result<Catalog, CatalogError> {
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "catalog.parse", source = %source_name, bytes = bytes.len());
    let _guard = span.enter();

    match parse_inner(source_name, bytes, cfg) {
        Ok(catalog) => {
            let elapsed_micros = start.elapsed().as_micros();
            info!(rows = catalog.len(), elapsed_micros, "catalog_loaded");
            Ok(catalog)
        }
        Err(err) => {
            let elapsed_micros = start.elapsed().as_micros();
            warn!(kind = err.kind(), error = %err, elapsed_micros, "catalog_load_failed");
            Err(err)
        }
    }
}

fn parse_inner(source_name: &str, bytes: &[u8], cfg: &CatalogConfig) -> Result<Catalog, CatalogError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|err| SourceError::Encoding {
        source_name: source_name.to_string(),
        valid_up_to: err.valid_up_to(),
    })?;

    if text.trim().is_empty() {
        return Err(SourceError::Empty {
            source_name: source_name.to_string(),
        }
        .into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(cfg.delimiter_byte())
        .escape(cfg.escape_byte())
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| csv_error(source_name, &err))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::Empty {
            source_name: source_name.to_string(),
        }
        .into());
    }

    let columns = resolve_columns(&headers)?;

    // Short rows are padded with missing cells; longer rows cannot be aligned.
    let width = headers.len();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|err| csv_error(source_name, &err))?;
        if row.len() > width {
            let line = row.position().map_or(0, |pos| pos.line());
            return Err(SourceError::Unparseable {
                source_name: source_name.to_string(),
                detail: format!("line {line}: expected {width} fields, found {}", row.len()),
            }
            .into());
        }
        records.push(columns.build_record(&row, &cfg.missing_value));
    }

    Ok(Catalog::new(source_name.to_string(), records))
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnMap, SchemaError> {
    let mut positions = [0usize; 7];
    let mut missing = Vec::new();
    for (slot, field) in CatalogField::ALL.iter().enumerate() {
        match headers.iter().position(|h| h.trim() == field.label()) {
            Some(pos) => positions[slot] = pos,
            None => missing.push(field.label().to_string()),
        }
    }
    if missing.is_empty() {
        Ok(ColumnMap { positions })
    } else {
        Err(SchemaError::MissingColumns {
            required: CatalogField::required_labels(),
            missing,
        })
    }
}

fn csv_error(source_name: &str, err: &csv::Error) -> SourceError {
    match err.kind() {
        csv::ErrorKind::Utf8 { err: utf8, .. } => SourceError::Encoding {
            source_name: source_name.to_string(),
            valid_up_to: utf8.valid_up_to(),
        },
        _ => SourceError::Unparseable {
            source_name: source_name.to_string(),
            detail: err.to_string(),
        },
    }
}
