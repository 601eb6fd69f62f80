//! Crossref works lookup - fetches metadata and reference lists for DOIs.
//!
//! The [`CrossrefLookup`] calls `GET {base}/works/{doi}` on the Crossref REST
//! API and maps the `message` object into the canonical field schema, plus
//! the lowercased DOIs of every reference that carries one.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{HttpSettings, build_http_client};
use crate::identity::CitationKey;
use crate::record::{Fields, LookupRecord, field};

use super::{CitationLookup, SourceError};

/// Default Crossref API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

/// Value written to the `source` field.
const SOURCE_LABEL: &str = "Crossref";

const SERVICE: &str = "crossref";

// ==================== Crossref API Response Types ====================

#[derive(Debug, Deserialize)]
pub(crate) struct CrossrefResponse {
    pub status: String,
    pub message: CrossrefMessage,
}

/// The `message` field from a Crossref works response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CrossrefMessage {
    #[serde(rename = "URL")]
    pub url: Option<String>,
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    pub title: Option<Vec<String>>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub author: Option<Vec<CrossrefAuthor>>,
    pub issued: Option<CrossrefDate>,
    pub subject: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub reference: Option<Vec<CrossrefReference>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CrossrefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CrossrefDate {
    pub date_parts: Option<Vec<Vec<Option<i32>>>>,
}

/// One entry of the `reference` array. Most entries carry no DOI.
#[derive(Debug, Deserialize)]
pub(crate) struct CrossrefReference {
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
}

// ==================== CrossrefLookup ====================

/// Citation lookup backed by the Crossref REST API.
///
/// # Polite Pool
///
/// When a contact address is configured, every request carries a `mailto`
/// query parameter so Crossref routes it to the polite pool.
pub struct CrossrefLookup {
    client: Client,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefLookup {
    /// Creates a lookup against the public Crossref API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ClientBuild`] if `mailto` contains control
    /// characters or the HTTP client cannot be built.
    #[tracing::instrument(skip_all)]
    pub fn new(mailto: Option<String>, http: &HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(mailto, DEFAULT_BASE_URL, http)
    }

    /// Creates a lookup with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Same as [`CrossrefLookup::new`].
    #[tracing::instrument(skip_all, fields(base_url))]
    pub fn with_base_url(
        mailto: Option<String>,
        base_url: impl Into<String>,
        http: &HttpSettings,
    ) -> Result<Self, SourceError> {
        let mailto = mailto
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        if let Some(value) = &mailto
            && value.chars().any(char::is_control)
        {
            return Err(SourceError::client_build(
                SERVICE,
                "mailto contains invalid control characters",
            ));
        }
        let client =
            build_http_client(http).map_err(|e| SourceError::from_http_client(SERVICE, &e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mailto,
        })
    }

    fn works_url(&self, key: &CitationKey) -> String {
        let encoded_doi = urlencoding::encode(key.as_str());
        match &self.mailto {
            Some(mailto) => format!(
                "{}/works/{}?mailto={}",
                self.base_url,
                encoded_doi,
                urlencoding::encode(mailto)
            ),
            None => format!("{}/works/{}", self.base_url, encoded_doi),
        }
    }
}

impl std::fmt::Debug for CrossrefLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossrefLookup")
            .field("base_url", &self.base_url)
            .field("mailto", &self.mailto)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CitationLookup for CrossrefLookup {
    fn name(&self) -> &str {
        SERVICE
    }

    #[tracing::instrument(skip(self), fields(lookup = "crossref", doi = %key))]
    async fn lookup(&self, key: &CitationKey) -> Result<LookupRecord, SourceError> {
        let url = self.works_url(key);
        debug!(api_url = %url, "Calling Crossref API");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "Crossref API request failed");
            SourceError::unreachable(SERVICE, key.as_str(), &e.to_string())
        })?;

        if let Some(limit) = response.headers().get("x-rate-limit-limit") {
            debug!(rate_limit = ?limit, "Crossref rate limit");
        }

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(SourceError::not_found(SERVICE, key.as_str()));
        }
        if !status.is_success() {
            debug!(status = status.as_u16(), "Crossref API error");
            return Err(SourceError::http_status(SERVICE, key.as_str(), status.as_u16()));
        }

        let body = response.json::<CrossrefResponse>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse Crossref response JSON");
            SourceError::malformed(SERVICE, key.as_str(), &e.to_string())
        })?;

        if !body.status.eq_ignore_ascii_case("ok") {
            warn!(status = %body.status, "Crossref response status was not ok");
            return Err(SourceError::malformed(
                SERVICE,
                key.as_str(),
                &format!("response status was '{}'", body.status),
            ));
        }

        let record = to_lookup_record(body.message);
        debug!(
            fields = record.fields.len(),
            cited = record.cited.len(),
            "Crossref lookup succeeded"
        );
        Ok(record)
    }
}

// ==================== Mapping Helpers ====================

fn to_lookup_record(message: CrossrefMessage) -> LookupRecord {
    let cited = message
        .reference
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter_map(|reference| reference.doi.as_deref())
        .map(str::trim)
        .filter(|doi| !doi.is_empty())
        .map(str::to_lowercase)
        .collect();

    LookupRecord {
        fields: extract_fields(&message),
        cited,
    }
}

/// Maps a Crossref message into canonical fields.
///
/// Only attributes present in the payload are emitted.
fn extract_fields(message: &CrossrefMessage) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::SOURCE.to_string(), SOURCE_LABEL.to_string());

    if let Some(url) = &message.url {
        fields.insert(field::ID.to_string(), url.clone());
    }
    if let Some(doi) = &message.doi {
        fields.insert(field::DOI.to_string(), doi.trim().to_lowercase());
    }
    if let Some(titles) = &message.title {
        fields.insert(field::TITLE.to_string(), collapse_whitespace(&titles.join(" ")));
    }
    if let Some(abstract_text) = &message.abstract_text {
        fields.insert(field::ABSTRACT.to_string(), collapse_whitespace(abstract_text));
    }
    if let Some(authors) = &message.author {
        let formatted: Vec<String> = authors
            .iter()
            .map(format_author)
            .filter(|name| !name.is_empty())
            .collect();
        fields.insert(field::AUTHORS.to_string(), formatted.join(", "));
    }
    if let Some(published) = format_date(message.issued.as_ref()) {
        fields.insert(field::PUBLISHED.to_string(), published);
    }
    if let Some(subjects) = &message.subject {
        let joined = subjects.join(", ");
        fields.insert(field::CATEGORIES.to_string(), joined.clone());
        fields.insert(field::ALL_CATEGORIES.to_string(), joined);
    }
    if let Some(publisher) = &message.publisher {
        fields.insert(field::PUBLISHER.to_string(), publisher.trim().to_string());
    }

    fields
}

/// Formats an author as "Given Family", tolerating either part missing.
fn format_author(author: &CrossrefAuthor) -> String {
    [author.given.as_deref(), author.family.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins the first `date-parts` entry with `-` (e.g. `2021-3-15`).
fn format_date(date: Option<&CrossrefDate>) -> Option<String> {
    let parts = date?.date_parts.as_ref()?.first()?;
    let rendered: Vec<String> = parts.iter().flatten().map(ToString::to_string).collect();
    (!rendered.is_empty()).then(|| rendered.join("-"))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
