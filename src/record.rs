//! Canonical publication record shape shared by every external source.
//!
//! Source adapters (arXiv, Crossref) map their payloads into [`SourceRecord`]
//! and [`Fields`] at the boundary so the crawler never branches on
//! source-specific shapes.

use std::collections::BTreeMap;

/// Descriptive attributes of a publication, keyed by field name.
///
/// A missing key and a key mapped to `""` are distinct states: the former means
/// the attribute was never observed, the latter that a source reported it empty.
pub type Fields = BTreeMap<String, String>;

/// Canonical field names.
pub mod field {
    /// Source-native identifier or landing page URL.
    pub const ID: &str = "id";
    /// DOI as reported by the source.
    pub const DOI: &str = "doi";
    /// Title.
    pub const TITLE: &str = "title";
    /// Abstract text.
    pub const ABSTRACT: &str = "abstract";
    /// Comma-separated author names.
    pub const AUTHORS: &str = "authors";
    /// Publication date as reported by the source.
    pub const PUBLISHED: &str = "published";
    /// Primary category.
    pub const CATEGORIES: &str = "categories";
    /// Every category tag, comma-separated.
    pub const ALL_CATEGORIES: &str = "all_categories";
    /// Direct link to the document body (PDF).
    pub const PDF_URL: &str = "pdf_url";
    /// Publisher name.
    pub const PUBLISHER: &str = "publisher";
    /// Name of the service that produced the record.
    pub const SOURCE: &str = "source";
}

/// A raw record returned by a seed search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    /// Mandatory source-native identifier (e.g. `http://arxiv.org/abs/2301.01234v1`).
    pub native_id: String,
    /// Optional DOI-like value, unnormalized.
    pub doi: Option<String>,
    /// Descriptive attributes in the canonical schema.
    pub fields: Fields,
}

impl SourceRecord {
    /// Creates a record with only a source-native identifier.
    #[must_use]
    pub fn new(native_id: impl Into<String>) -> Self {
        Self {
            native_id: native_id.into(),
            doi: None,
            fields: Fields::new(),
        }
    }

    /// Sets the DOI-like value.
    #[must_use]
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Sets a descriptive field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Result of a successful metadata/citation lookup for one publication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRecord {
    /// Descriptive attributes in the canonical schema.
    pub fields: Fields,
    /// Cited DOI-like strings in the order the service listed them.
    pub cited: Vec<String>,
}
