//! Cell normalization for raw CSV rows.
use csv::StringRecord;

use crate::types::CatalogRecord;

/// Spellings conventionally used by spreadsheet exports for "no value".
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a raw cell counts as missing.
pub(crate) fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NA_MARKERS.contains(&trimmed)
}

/// Return the cell unchanged, or `placeholder` when it is missing.
pub(crate) fn normalize_cell(raw: Option<&str>, placeholder: &str) -> String {
    match raw {
        Some(value) if !is_missing(value) => value.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Column positions of the seven required fields within the header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnMap {
    pub(crate) positions: [usize; 7],
}

impl ColumnMap {
    pub(crate) fn build_record(&self, row: &StringRecord, placeholder: &str) -> CatalogRecord {
        let cell = |slot: usize| normalize_cell(row.get(self.positions[slot]), placeholder);
        CatalogRecord {
            product_name: cell(0),
            description: cell(1),
            job_level: cell(2),
            languages: cell(3),
            test_duration: cell(4),
            test_type: cell(5),
            remote_testing: cell(6),
        }
    }
}
