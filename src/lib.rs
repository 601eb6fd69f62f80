//! Citegraph Core Library
//!
//! This library builds a bounded, breadth-first citation graph: a seed batch
//! from an arXiv search is expanded by following each publication's cited
//! DOIs through the Crossref works API, until either the frontier runs dry or
//! a node cap is reached. The finished graph is exported as two CSV tables
//! and seed PDFs are fetched afterwards on a best-effort basis.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`identity`] - Citation-key normalization
//! - [`merge`] - Fill-gaps metadata merging
//! - [`graph`] - Node table, edge list and FIFO frontier
//! - [`rate_limiter`] - Minimum spacing between external calls
//! - [`source`] - arXiv seed search and Crossref citation lookup
//! - [`crawl`] - The breadth-first traversal
//! - [`export`] - Atomic CSV export of nodes and edges
//! - [`artifact`] - Post-export PDF download pass
//! - [`pipeline`] - Orchestration of one complete run

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod config;
pub mod crawl;
pub mod export;
pub mod graph;
pub mod http;
pub mod identity;
pub mod merge;
pub mod pipeline;
pub mod rate_limiter;
pub mod record;
pub mod source;
mod user_agent;

// Re-export commonly used types
pub use artifact::{ArtifactError, ArtifactFetcher, ArtifactReport, FetchOutcome};
pub use config::{ArtifactConfig, ConfigError, CrawlConfig, RunConfig};
pub use crawl::{CrawlOutcome, CrawlReport, FrontierCrawler, ProgressCallback, StopReason};
pub use export::{ExportError, ExportPaths, ExportSummary, export_graph};
pub use graph::{Edge, Frontier, GraphStore, Node, NodeOrigin, Resolution};
pub use http::{HttpClientError, HttpSettings, build_http_client};
pub use identity::{CitationKey, normalize_doi};
pub use merge::merge;
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use rate_limiter::RateLimiter;
pub use record::{Fields, LookupRecord, SourceRecord};
pub use source::{ArxivSearch, CitationLookup, CrossrefLookup, SeedSource, SourceError};
