//! Boundary adapters for the external services used by a crawl.
//!
//! Two capabilities are modelled as traits so the crawler can be driven by
//! real HTTP clients or in-memory fakes:
//!
//! - [`SeedSource`]: a search returning an ordered batch of [`SourceRecord`]s
//! - [`CitationLookup`]: a per-key metadata and cited-DOI lookup
//!
//! The adapters map service payloads into the canonical field schema in
//! [`crate::record::field`] so nothing downstream branches on source shapes.

mod arxiv;
mod crossref;
mod error;

pub use arxiv::{ArxivSearch, DEFAULT_BASE_URL as ARXIV_BASE_URL, parse_feed};
pub use crossref::{CrossrefLookup, DEFAULT_BASE_URL as CROSSREF_BASE_URL};
pub use error::SourceError;

use async_trait::async_trait;

use crate::identity::CitationKey;
use crate::record::{LookupRecord, SourceRecord};

/// A search service producing the initial seed batch.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Returns the source name for logging.
    fn name(&self) -> &str;

    /// Runs `query` and returns at most `limit` records in service order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the service cannot be reached or its
    /// response cannot be decoded.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceRecord>, SourceError>;
}

/// A metadata service that lists the works cited by a publication.
#[async_trait]
pub trait CitationLookup: Send + Sync {
    /// Returns the lookup name for logging.
    fn name(&self) -> &str;

    /// Fetches descriptive fields and the cited DOI list for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for transport failures, non-success statuses,
    /// unknown keys and malformed payloads.
    async fn lookup(&self, key: &CitationKey) -> Result<LookupRecord, SourceError>;
}
