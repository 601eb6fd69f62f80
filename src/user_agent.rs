//! Shared User-Agent string for every outbound HTTP client.
//!
//! arXiv and Crossref both ask API clients to identify themselves; a single
//! format keeps that consistent across the seed search, citation lookups and
//! artifact downloads.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/citegraph";

/// Default User-Agent for all requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("citegraph/{version} (research-tool; +{PROJECT_UA_URL})")
}
