//! Citation-key normalization.
//!
//! Every publication in the graph is identified by a [`CitationKey`]. A
//! DOI-like value always wins and is compared case-insensitively; records that
//! carry no DOI fall back to a key derived from their source-native identifier.

use std::borrow::Borrow;
use std::fmt;

use crate::record::SourceRecord;

/// Prefixes stripped from DOI-like input before normalization.
const DOI_PREFIXES: [&str; 5] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// Marker separating an arXiv abstract URL from the bare arXiv id.
const ARXIV_ABS_MARKER: &str = "/abs/";

/// Normalized identity of a publication.
///
/// Keys are immutable once created and implement `Borrow<str>` so that maps
/// keyed by `CitationKey` can be queried with plain string slices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CitationKey(String);

impl CitationKey {
    /// Wraps an already-normalized key verbatim.
    ///
    /// Prefer [`resolve`] or [`normalize_doi`] for untrusted input.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the metadata service can be queried with this key.
    ///
    /// Only DOI-shaped keys (`10.<registrant>/<suffix>`) are queryable; fallback
    /// keys derived from source-native identifiers are not.
    #[must_use]
    pub fn is_queryable(&self) -> bool {
        let Some(rest) = self.0.strip_prefix("10.") else {
            return false;
        };
        rest.split_once('/')
            .is_some_and(|(registrant, suffix)| !registrant.is_empty() && !suffix.is_empty())
    }
}

impl fmt::Display for CitationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CitationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CitationKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Resolves the citation-key of a raw source record.
///
/// Uses the record's DOI when present and non-blank, otherwise a key derived
/// deterministically from the source-native identifier. Never fails.
#[must_use]
pub fn resolve(record: &SourceRecord) -> CitationKey {
    record
        .doi
        .as_deref()
        .and_then(normalize_doi)
        .unwrap_or_else(|| CitationKey(native_key(&record.native_id)))
}

/// Normalizes a DOI-like string: strips resolver prefixes, trims, lowercases.
///
/// Returns `None` for blank input.
#[must_use]
pub fn normalize_doi(raw: &str) -> Option<CitationKey> {
    let mut value = raw.trim();
    let lower = value.to_ascii_lowercase();
    for prefix in DOI_PREFIXES {
        if lower.starts_with(prefix) {
            value = value[prefix.len()..].trim_start();
            break;
        }
    }

    let normalized = value.trim().to_lowercase();
    (!normalized.is_empty()).then_some(CitationKey(normalized))
}

fn native_key(native_id: &str) -> String {
    let trimmed = native_id.trim();
    match trimmed.rfind(ARXIV_ABS_MARKER) {
        Some(index) => trimmed[index + ARXIV_ABS_MARKER.len()..]
            .trim_matches('/')
            .to_string(),
        None => trimmed.to_string(),
    }
}
