//! arXiv search - produces the seed batch from the arXiv Atom API.
//!
//! Responses are Atom XML. Entries are extracted with static regexes in the
//! same way the HTML scrapers extract meta tags; the feed format is stable and
//! only a handful of elements are needed.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::http::{HttpSettings, build_http_client};
use crate::record::{SourceRecord, field};

use super::{SeedSource, SourceError};

/// Default arXiv export API base URL.
pub const DEFAULT_BASE_URL: &str = "http://export.arxiv.org";

/// Value written to the `source` field.
const SOURCE_LABEL: &str = "arXiv";

const SERVICE: &str = "arxiv";

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static FEED_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<feed[\s>]"));
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<entry[^>]*>(.*?)</entry>"));
static ID_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<id>(.*?)</id>"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<title[^>]*>(.*?)</title>"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<summary[^>]*>(.*?)</summary>"));
static PUBLISHED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<published>(.*?)</published>"));
static AUTHOR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<author>\s*<name>(.*?)</name>"));
static PRIMARY_CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<arxiv:primary_category\s[^>]*term\s*=\s*"([^"]+)""#)
});
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"(?is)<category\s[^>]*term\s*=\s*"([^"]+)""#));
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<link\s[^>]*>"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});
static ARXIV_DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<arxiv:doi[^>]*>(.*?)</arxiv:doi>"));

/// Seed source backed by the arXiv export API.
pub struct ArxivSearch {
    client: Client,
    base_url: String,
}

impl ArxivSearch {
    /// Creates a search against the public arXiv export API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(http: &HttpSettings) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, http)
    }

    /// Creates a search with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ClientBuild`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        http: &HttpSettings,
    ) -> Result<Self, SourceError> {
        let client =
            build_http_client(http).map_err(|e| SourceError::from_http_client(SERVICE, &e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn query_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}/api/query?search_query={}&start=0&max_results={limit}",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

impl std::fmt::Debug for ArxivSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArxivSearch")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SeedSource for ArxivSearch {
    fn name(&self) -> &str {
        SERVICE
    }

    #[tracing::instrument(skip(self), fields(source = "arxiv"))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceRecord>, SourceError> {
        let url = self.query_url(query, limit);
        debug!(api_url = %url, "Calling arXiv API");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(error = %e, "arXiv API request failed");
            SourceError::unreachable(SERVICE, query, &e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http_status(SERVICE, query, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unreachable(SERVICE, query, &e.to_string()))?;

        if !FEED_RE.is_match(&body) {
            return Err(SourceError::malformed(SERVICE, query, "response is not an Atom feed"));
        }

        let mut records = parse_feed(&body);
        records.truncate(limit);
        info!(count = records.len(), "arXiv search returned seed records");
        Ok(records)
    }
}

/// Parses an arXiv Atom feed into seed records in feed order.
///
/// Entries without an `<id>` are skipped.
#[must_use]
pub fn parse_feed(xml: &str) -> Vec<SourceRecord> {
    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .filter_map(|entry| parse_entry(entry.as_str()))
        .collect()
}

fn parse_entry(entry: &str) -> Option<SourceRecord> {
    let id = capture_text(&ID_RE, entry).filter(|id| !id.is_empty())?;
    let mut record = SourceRecord::new(id.clone());

    let doi = related_doi(entry);
    let doi_field = match &doi {
        Some(value) => value.to_lowercase(),
        None => id
            .rsplit_once("/abs/")
            .map_or_else(|| id.clone(), |(_, arxiv_id)| arxiv_id.to_string()),
    };
    record.doi = doi;

    let authors: Vec<String> = AUTHOR_NAME_RE
        .captures_iter(entry)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|name| !name.is_empty())
        .collect();
    let all_categories: Vec<String> = CATEGORY_RE
        .captures_iter(entry)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
        .collect();

    let fields = &mut record.fields;
    fields.insert(field::ID.to_string(), id.clone());
    fields.insert(field::DOI.to_string(), doi_field);
    fields.insert(
        field::TITLE.to_string(),
        capture_text(&TITLE_RE, entry).unwrap_or_default(),
    );
    fields.insert(
        field::ABSTRACT.to_string(),
        capture_text(&SUMMARY_RE, entry).unwrap_or_default(),
    );
    fields.insert(field::AUTHORS.to_string(), authors.join(", "));
    fields.insert(
        field::PUBLISHED.to_string(),
        capture_text(&PUBLISHED_RE, entry).unwrap_or_default(),
    );
    fields.insert(
        field::CATEGORIES.to_string(),
        PRIMARY_CATEGORY_RE
            .captures(entry)
            .and_then(|caps| caps.get(1))
            .map(|m| decode_entities(m.as_str()))
            .unwrap_or_default(),
    );
    fields.insert(field::ALL_CATEGORIES.to_string(), all_categories.join(", "));
    fields.insert(field::PDF_URL.to_string(), pdf_url_for(&id));
    fields.insert(field::SOURCE.to_string(), SOURCE_LABEL.to_string());

    Some(record)
}

/// Returns the DOI from the `rel="related"` doi.org link, else `<arxiv:doi>`.
fn related_doi(entry: &str) -> Option<String> {
    let from_link = LINK_RE.find_iter(entry).find_map(|tag| {
        let mut rel = None;
        let mut href = None;
        for caps in ATTR_RE.captures_iter(tag.as_str()) {
            let name = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match (name.as_deref(), value) {
                (Some("rel"), Some(v)) => rel = Some(v),
                (Some("href"), Some(v)) => href = Some(v),
                _ => {}
            }
        }
        if !rel.is_some_and(|r| r.eq_ignore_ascii_case("related")) {
            return None;
        }
        let href = decode_entities(href?);
        let (_, doi) = href.split_once("doi.org/")?;
        let doi = doi.trim();
        (!doi.is_empty()).then(|| doi.to_string())
    });

    from_link.or_else(|| capture_text(&ARXIV_DOI_RE, entry).filter(|doi| !doi.is_empty()))
}

/// Maps an abstract URL to its PDF URL (`/abs/` to `/pdf/`, `.pdf` suffix).
fn pdf_url_for(id: &str) -> String {
    format!("{}.pdf", id.replacen("/abs/", "/pdf/", 1))
}

fn capture_text(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| clean_text(m.as_str()))
}

fn clean_text(raw: &str) -> String {
    decode_entities(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
