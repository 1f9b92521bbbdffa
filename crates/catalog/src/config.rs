//! Configuration types for catalog loading.
//!
//! [`CatalogConfig`] controls where the catalog lives and how its CSV dialect is
//! read. It is cheap to clone and deserializes from the `catalog:` section of
//! the recommender YAML file.
//!
//! ```rust
//! use catalog::CatalogConfig;
//!
//! let config = CatalogConfig::default();
//! config.validate().expect("default catalog config is valid");
//! assert_eq!(config.missing_value, "Not Specified");
//! ```
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for catalog loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the CSV catalog.
    pub path: PathBuf,
    /// Literal substituted for missing or empty cells.
    pub missing_value: String,
    /// Field delimiter, a single ASCII character.
    pub delimiter: char,
    /// Escape character inside quoted fields. `None` disables escapes and
    /// relies on doubled quotes only.
    pub escape: Option<char>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("shl_product_catalog.csv"),
            missing_value: "Not Specified".to_string(),
            delimiter: ',',
            escape: Some('\\'),
        }
    }
}

/// Invalid catalog configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid catalog configuration: {0}")]
    Invalid(String),
}

impl CatalogConfig {
    /// Check the dialect settings before any file is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.missing_value.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "missing_value must not be blank".into(),
            ));
        }
        if !self.delimiter.is_ascii() || self.delimiter == '"' {
            return Err(ConfigError::Invalid(format!(
                "delimiter {:?} must be an ASCII character other than '\"'",
                self.delimiter
            )));
        }
        if let Some(escape) = self.escape {
            if !escape.is_ascii() || escape == self.delimiter {
                return Err(ConfigError::Invalid(format!(
                    "escape {escape:?} must be ASCII and differ from the delimiter"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub(crate) fn escape_byte(&self) -> Option<u8> {
        self.escape.map(|c| c as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(CatalogConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_blank_missing_value() {
        let cfg = CatalogConfig {
            missing_value: "  ".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_escape_equal_to_delimiter() {
        let cfg = CatalogConfig {
            delimiter: ';',
            escape: Some(';'),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_ascii_delimiter() {
        let cfg = CatalogConfig {
            delimiter: '¦',
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
