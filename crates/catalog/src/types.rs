use serde::{Deserialize, Serialize};

/// The seven required catalog columns, in document rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogField {
    ProductName,
    Description,
    JobLevel,
    Languages,
    TestDuration,
    TestType,
    RemoteTesting,
}

impl CatalogField {
    /// All fields in the fixed order used for headers and document text.
    pub const ALL: [CatalogField; 7] = [
        CatalogField::ProductName,
        CatalogField::Description,
        CatalogField::JobLevel,
        CatalogField::Languages,
        CatalogField::TestDuration,
        CatalogField::TestType,
        CatalogField::RemoteTesting,
    ];

    /// Column header, which doubles as the line label in document text.
    pub fn label(self) -> &'static str {
        match self {
            CatalogField::ProductName => "Product Name",
            CatalogField::Description => "Description",
            CatalogField::JobLevel => "Job Level",
            CatalogField::Languages => "Languages",
            CatalogField::TestDuration => "Test Duration",
            CatalogField::TestType => "Test Type",
            CatalogField::RemoteTesting => "Remote Testing",
        }
    }

    pub fn required_labels() -> Vec<String> {
        Self::ALL.iter().map(|f| f.label().to_string()).collect()
    }
}

/// One normalized catalog row. Missing cells already hold the configured
/// placeholder, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub product_name: String,
    pub description: String,
    pub job_level: String,
    pub languages: String,
    pub test_duration: String,
    pub test_type: String,
    pub remote_testing: String,
}

impl CatalogRecord {
    pub fn get(&self, field: CatalogField) -> &str {
        match field {
            CatalogField::ProductName => &self.product_name,
            CatalogField::Description => &self.description,
            CatalogField::JobLevel => &self.job_level,
            CatalogField::Languages => &self.languages,
            CatalogField::TestDuration => &self.test_duration,
            CatalogField::TestType => &self.test_type,
            CatalogField::RemoteTesting => &self.remote_testing,
        }
    }

    /// Render the record as an indexable [`Document`].
    ///
    /// The text is one `Label: value` line per field in [`CatalogField::ALL`]
    /// order, with no trailing newline. Job level tokens and the duration are
    /// lifted into typed metadata so filtering never re-parses the text.
    pub fn to_document(&self, row_index: usize) -> Document {
        let text = CatalogField::ALL
            .iter()
            .map(|field| format!("{}: {}", field.label(), self.get(*field)))
            .collect::<Vec<_>>()
            .join("\n");

        let job_levels = split_job_levels(&self.job_level);

        Document {
            text,
            metadata: DocumentMetadata {
                row_index,
                product_name: self.product_name.clone(),
                job_levels,
                duration: self.test_duration.trim().to_string(),
            },
        }
    }
}

/// Split a `;`-delimited job level cell into trimmed, non-empty tokens.
pub fn split_job_levels(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|level| !level.is_empty())
        .map(str::to_string)
        .collect()
}

/// Structured attributes carried next to the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Zero-based index of the source data row.
    pub row_index: usize,
    pub product_name: String,
    pub job_levels: Vec<String>,
    /// Trimmed duration cell, compared as a literal string.
    pub duration: String,
}

/// Immutable searchable unit derived from one catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    text: String,
    metadata: DocumentMetadata,
}

impl Document {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn row_index(&self) -> usize {
        self.metadata.row_index
    }

    pub fn job_levels(&self) -> &[String] {
        &self.metadata.job_levels
    }

    pub fn duration(&self) -> &str {
        &self.metadata.duration
    }

    /// Recover a field value from the rendered text by its label.
    ///
    /// Returns the remainder of the first line starting with `"{label}: "`.
    pub fn field(&self, field: CatalogField) -> Option<&str> {
        let prefix = field.label();
        self.text.lines().find_map(|line| {
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(": "))
        })
    }
}

/// A successfully loaded catalog: normalized records and their documents,
/// index-aligned and in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    source_name: String,
    records: Vec<CatalogRecord>,
    documents: Vec<Document>,
}

impl Catalog {
    pub(crate) fn new(source_name: String, records: Vec<CatalogRecord>) -> Self {
        let documents = records
            .iter()
            .enumerate()
            .map(|(row, record)| record.to_document(row))
            .collect();
        Self {
            source_name,
            records,
            documents,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify_numerical() -> CatalogRecord {
        CatalogRecord {
            product_name: "Verify Numerical".into(),
            description: "Numerical reasoning test".into(),
            job_level: "Entry;Mid".into(),
            languages: "English".into(),
            test_duration: "30".into(),
            test_type: "Cognitive".into(),
            remote_testing: "Yes".into(),
        }
    }

    #[test]
    fn document_text_has_fixed_label_order() {
        let doc = verify_numerical().to_document(0);
        assert_eq!(
            doc.text(),
            "Product Name: Verify Numerical\n\
             Description: Numerical reasoning test\n\
             Job Level: Entry;Mid\n\
             Languages: English\n\
             Test Duration: 30\n\
             Test Type: Cognitive\n\
             Remote Testing: Yes"
        );
    }

    #[test]
    fn metadata_matches_text_fields() {
        let doc = verify_numerical().to_document(4);
        assert_eq!(doc.row_index(), 4);
        assert_eq!(doc.job_levels(), ["Entry", "Mid"]);
        assert_eq!(doc.duration(), "30");
        assert_eq!(doc.field(CatalogField::JobLevel), Some("Entry;Mid"));
        assert_eq!(doc.field(CatalogField::TestDuration), Some(doc.duration()));
    }

    #[test]
    fn split_job_levels_trims_and_drops_blanks() {
        assert_eq!(
            split_job_levels(" Entry ; ;Graduate;"),
            vec!["Entry".to_string(), "Graduate".to_string()]
        );
        assert!(split_job_levels("").is_empty());
    }

    #[test]
    fn field_does_not_confuse_similar_labels() {
        let mut record = verify_numerical();
        record.test_type = "Test Duration: 99".into();
        let doc = record.to_document(0);
        assert_eq!(doc.field(CatalogField::TestDuration), Some("30"));
        assert_eq!(doc.field(CatalogField::TestType), Some("Test Duration: 99"));
    }
}
