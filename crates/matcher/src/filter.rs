//! Structured post-filtering of search hits by job level and test duration.
//!
//! Matching is literal: a job level passes when it equals one of the document's
//! `;`-separated tokens, a duration passes when it equals the document's
//! duration string. `"30"` and `"30.0"` are different durations.
use std::collections::BTreeSet;

use catalog::Document;
use index::SearchHit;
use serde::{Deserialize, Serialize};

/// Selector value meaning "no constraint on this dimension".
pub const ALL: &str = "All";

/// User-selected structured constraints. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub job_level: Option<String>,
    pub duration: Option<String>,
}

impl FilterCriteria {
    /// Build criteria from raw selector values, mapping `"All"` and blanks to `None`.
    pub fn new(job_level: Option<&str>, duration: Option<&str>) -> Self {
        Self {
            job_level: constraint(job_level),
            duration: constraint(duration),
        }
    }

    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.job_level.is_none() && self.duration.is_none()
    }

    /// Whether `document` satisfies every active constraint.
    pub fn matches(&self, document: &Document) -> bool {
        let level_ok = self.job_level.as_deref().is_none_or(|wanted| {
            let wanted = wanted.trim();
            document.job_levels().iter().any(|level| level == wanted)
        });
        let duration_ok = self
            .duration
            .as_deref()
            .is_none_or(|wanted| document.duration() == wanted.trim());
        level_ok && duration_ok
    }
}

fn constraint(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty() && *value != ALL)
        .map(str::to_string)
}

/// Result of filtering a ranked hit list.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome<'a> {
    /// No constraint was active; hits are passed through unchanged.
    Unconstrained(Vec<SearchHit<'a>>),
    /// The hits that satisfied every constraint, in their original order.
    Matched(Vec<SearchHit<'a>>),
    /// Nothing matched, so the original unfiltered hits are returned instead.
    Fallback(Vec<SearchHit<'a>>),
}

impl<'a> FilterOutcome<'a> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FilterOutcome::Fallback(_))
    }

    pub fn hits(&self) -> &[SearchHit<'a>] {
        match self {
            FilterOutcome::Unconstrained(hits)
            | FilterOutcome::Matched(hits)
            | FilterOutcome::Fallback(hits) => hits,
        }
    }

    pub fn into_hits(self) -> Vec<SearchHit<'a>> {
        match self {
            FilterOutcome::Unconstrained(hits)
            | FilterOutcome::Matched(hits)
            | FilterOutcome::Fallback(hits) => hits,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterOutcome::Unconstrained(_) => "unconstrained",
            FilterOutcome::Matched(_) => "matched",
            FilterOutcome::Fallback(_) => "fallback",
        }
    }
}

/// Keep the hits matching `criteria`, preserving rank order.
///
/// When constraints are active and a non-empty hit list loses every entry, the
/// untouched list comes back as [`FilterOutcome::Fallback`].
pub fn apply_filter<'a>(hits: Vec<SearchHit<'a>>, criteria: &FilterCriteria) -> FilterOutcome<'a> {
    if criteria.is_unconstrained() {
        return FilterOutcome::Unconstrained(hits);
    }

    let matched: Vec<SearchHit<'a>> = hits
        .iter()
        .filter(|hit| criteria.matches(hit.document))
        .copied()
        .collect();

    if matched.is_empty() && !hits.is_empty() {
        FilterOutcome::Fallback(hits)
    } else {
        FilterOutcome::Matched(matched)
    }
}

/// Selector options derived from a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// `"All"` followed by distinct job level tokens in lexical order.
    pub job_levels: Vec<String>,
    /// `"All"` followed by distinct all-digit durations in numeric order.
    pub durations: Vec<String>,
}

impl FilterOptions {
    pub fn from_documents(documents: &[Document]) -> Self {
        let levels: BTreeSet<&str> = documents
            .iter()
            .flat_map(|doc| doc.job_levels().iter().map(String::as_str))
            .collect();

        let mut durations: Vec<&str> = documents
            .iter()
            .map(Document::duration)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        durations.sort_by(|a, b| numeric_cmp(a, b));

        Self {
            job_levels: std::iter::once(ALL)
                .chain(levels)
                .map(str::to_string)
                .collect(),
            durations: std::iter::once(ALL)
                .chain(durations)
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Compare two all-digit strings by numeric value without overflow.
fn numeric_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use catalog::CatalogRecord;

    use super::*;

    fn doc(row: usize, job_level: &str, duration: &str) -> Document {
        CatalogRecord {
            product_name: format!("Product {row}"),
            description: "desc".into(),
            job_level: job_level.into(),
            languages: "English".into(),
            test_duration: duration.into(),
            test_type: "Cognitive".into(),
            remote_testing: "Yes".into(),
        }
        .to_document(row)
    }

    fn hits(docs: &[Document]) -> Vec<SearchHit<'_>> {
        docs.iter()
            .enumerate()
            .map(|(i, document)| SearchHit {
                document,
                distance: i as f32 * 0.1,
            })
            .collect()
    }

    fn rows(outcome: &FilterOutcome<'_>) -> Vec<usize> {
        outcome.hits().iter().map(|h| h.document.row_index()).collect()
    }

    #[test]
    fn all_and_blank_mean_unconstrained() {
        assert!(FilterCriteria::new(Some("All"), Some(" ")).is_unconstrained());
        assert!(FilterCriteria::new(None, None).is_unconstrained());
        let criteria = FilterCriteria::new(Some(" Mid "), Some("All"));
        assert_eq!(criteria.job_level.as_deref(), Some("Mid"));
        assert!(criteria.duration.is_none());
    }

    #[test]
    fn unconstrained_passes_everything_through() {
        let docs = vec![doc(0, "Entry", "10"), doc(1, "Mid", "20")];
        let outcome = apply_filter(hits(&docs), &FilterCriteria::unconstrained());
        assert!(matches!(outcome, FilterOutcome::Unconstrained(_)));
        assert_eq!(rows(&outcome), [0, 1]);
    }

    #[test]
    fn job_level_matches_exact_token_only() {
        let docs = vec![
            doc(0, "Entry;Mid", "30"),
            doc(1, "Mid-Professional", "30"),
            doc(2, " Graduate ; Mid ", "30"),
            doc(3, "Senior", "30"),
        ];
        let outcome = apply_filter(hits(&docs), &FilterCriteria::new(Some("Mid"), None));
        assert_eq!(rows(&outcome), [0, 2]);
        assert!(!outcome.is_fallback());
    }

    #[test]
    fn duration_is_literal_string_equality() {
        let docs = vec![doc(0, "Entry", "30"), doc(1, "Entry", "30.0"), doc(2, "Entry", " 30 ")];
        let outcome = apply_filter(hits(&docs), &FilterCriteria::new(None, Some("30")));
        assert_eq!(rows(&outcome), [0, 2]);
    }

    #[test]
    fn both_constraints_must_hold() {
        let docs = vec![
            doc(0, "Entry", "30"),
            doc(1, "Mid", "30"),
            doc(2, "Entry", "45"),
            doc(3, "Entry;Mid", "30"),
        ];
        let outcome = apply_filter(hits(&docs), &FilterCriteria::new(Some("Entry"), Some("30")));
        assert_eq!(rows(&outcome), [0, 3]);
    }

    #[test]
    fn filtering_preserves_rank_order() {
        let docs: Vec<_> = (0..8)
            .map(|i| doc(i, if i % 2 == 0 { "Entry" } else { "Mid" }, "20"))
            .collect();
        let outcome = apply_filter(hits(&docs), &FilterCriteria::new(Some("Entry"), None));
        assert_eq!(rows(&outcome), [0, 2, 4, 6]);
        assert!(outcome
            .hits()
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn empty_match_falls_back_to_original_hits() {
        let docs = vec![doc(0, "Entry;Mid", "30"), doc(1, "Mid", "20")];
        let original = hits(&docs);
        let outcome = apply_filter(original.clone(), &FilterCriteria::new(Some("Senior"), None));
        assert!(outcome.is_fallback());
        assert_eq!(outcome.label(), "fallback");
        assert_eq!(outcome.into_hits(), original);
    }

    #[test]
    fn empty_input_is_not_a_fallback() {
        let outcome = apply_filter(Vec::new(), &FilterCriteria::new(Some("Senior"), None));
        assert_eq!(outcome, FilterOutcome::Matched(Vec::new()));
    }

    #[test]
    fn options_sorted_with_all_first() {
        let docs = vec![
            doc(0, "Mid;Entry", "30"),
            doc(1, "Senior; Entry", "120"),
            doc(2, "Graduate", "Not Specified"),
            doc(3, "Mid", "9"),
            doc(4, "Mid", "30.0"),
            doc(5, "Mid", "30"),
        ];
        let options = FilterOptions::from_documents(&docs);
        assert_eq!(options.job_levels, ["All", "Entry", "Graduate", "Mid", "Senior"]);
        assert_eq!(options.durations, ["All", "9", "30", "120"]);
    }

    #[test]
    fn numeric_cmp_handles_leading_zeros_and_length() {
        use std::cmp::Ordering;
        assert_eq!(numeric_cmp("9", "10"), Ordering::Less);
        assert_eq!(numeric_cmp("010", "9"), Ordering::Greater);
        assert_eq!(numeric_cmp("99999999999999999999999", "1"), Ordering::Greater);
    }
}
