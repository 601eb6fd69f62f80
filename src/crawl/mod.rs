//! Breadth-first frontier crawler.
//!
//! The [`FrontierCrawler`] owns the [`GraphStore`] and [`Frontier`] for one
//! run. Seeds are ingested first (uncapped), then each queued key is resolved
//! in arrival order through a [`CitationLookup`], one call at a time. The
//! shared [`RateLimiter`] keeps the configured delay between the end of one
//! lookup and the start of the next, whatever the outcome. The crawl stops
//! when the frontier is exhausted or the node cap is reached, whichever comes
//! first.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use citegraph_core::{CrawlConfig, CrossrefLookup, FrontierCrawler, HttpSettings, RateLimiter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let lookup = Arc::new(CrossrefLookup::new(None, &HttpSettings::default())?);
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//! let mut crawler = FrontierCrawler::new(CrawlConfig::default(), lookup, limiter);
//! crawler.ingest_seeds(Vec::new());
//! let outcome = crawler.run().await;
//! println!("{} nodes, stop: {}", outcome.store.len(), outcome.report.stop_reason);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::CrawlConfig;
use crate::graph::{Frontier, GraphStore, NodeOrigin, Resolution};
use crate::identity::{self, CitationKey, normalize_doi};
use crate::rate_limiter::RateLimiter;
use crate::record::{Fields, LookupRecord, SourceRecord, field};
use crate::source::CitationLookup;

/// Value written to the `source` field of discovered placeholder nodes.
const DISCOVERED_SOURCE_LABEL: &str = "Crossref";

/// Callback invoked after each processed key with the current node count.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Why the crawl loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every queued key was handed out.
    FrontierExhausted,
    /// The store reached the configured node cap.
    NodeCapReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrontierExhausted => f.write_str("frontier exhausted"),
            Self::NodeCapReached => f.write_str("node cap reached"),
        }
    }
}

/// Counters and ordering information for one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// Keys whose lookup succeeded.
    pub resolved: usize,
    /// Keys marked failed (lookup error or no queryable form).
    pub failed: usize,
    /// Keys handed out by the frontier that were already resolved.
    pub skipped: usize,
    /// External lookups issued.
    pub lookups: usize,
    /// Edges appended to the store.
    pub edges_added: usize,
    /// Placeholder nodes created during traversal.
    pub nodes_discovered: usize,
    /// Keys in the order they were processed (resolved or failed).
    pub resolution_order: Vec<CitationKey>,
}

impl CrawlReport {
    fn new() -> Self {
        Self {
            stop_reason: StopReason::FrontierExhausted,
            resolved: 0,
            failed: 0,
            skipped: 0,
            lookups: 0,
            edges_added: 0,
            nodes_discovered: 0,
            resolution_order: Vec::new(),
        }
    }

    /// Returns the position of `key` in the resolution order.
    #[must_use]
    pub fn resolution_index(&self, key: &str) -> Option<usize> {
        self.resolution_order.iter().position(|k| k.as_str() == key)
    }
}

/// Result of a crawl: the finished graph and its report.
#[derive(Debug)]
pub struct CrawlOutcome {
    /// Finished graph, handed read-only to export and artifact fetching.
    pub store: GraphStore,
    /// Run counters.
    pub report: CrawlReport,
}

/// Drives the breadth-first traversal for one run.
pub struct FrontierCrawler {
    config: CrawlConfig,
    lookup: Arc<dyn CitationLookup>,
    rate_limiter: Arc<RateLimiter>,
    store: GraphStore,
    frontier: Frontier,
    progress: Option<ProgressCallback>,
}

impl FrontierCrawler {
    /// Creates a crawler with an empty graph.
    #[must_use]
    pub fn new(
        config: CrawlConfig,
        lookup: Arc<dyn CitationLookup>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            lookup,
            rate_limiter,
            store: GraphStore::new(),
            frontier: Frontier::new(),
            progress: None,
        }
    }

    /// Registers a callback invoked after every processed key.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Returns the graph built so far.
    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Loads a seed batch as `Seed` nodes in batch order.
    ///
    /// Seed loading is not capped. Records whose key is already present are
    /// ignored, so the first occurrence wins. Returns the number inserted.
    #[instrument(skip_all, fields(batch = records.len()))]
    pub fn ingest_seeds(&mut self, records: Vec<SourceRecord>) -> usize {
        let mut inserted = 0;
        for record in records {
            let key = identity::resolve(&record);
            if self.store.contains(key.as_str()) {
                debug!(key = %key, "duplicate seed ignored");
                continue;
            }
            self.store.insert(key.clone(), NodeOrigin::Seed, record.fields);
            self.frontier.push(key);
            inserted += 1;
        }
        info!(inserted, "seed batch loaded");
        inserted
    }

    /// Runs the traversal to completion.
    #[instrument(skip_all, fields(max_nodes = self.config.max_nodes))]
    pub async fn run(mut self) -> CrawlOutcome {
        let mut report = CrawlReport::new();

        loop {
            if self.frontier.is_exhausted() {
                report.stop_reason = StopReason::FrontierExhausted;
                break;
            }
            if self.store.len() >= self.config.max_nodes {
                report.stop_reason = StopReason::NodeCapReached;
                break;
            }
            let Some(key) = self.frontier.next_key() else {
                report.stop_reason = StopReason::FrontierExhausted;
                break;
            };

            if self.store.get(key.as_str()).is_some_and(|node| node.is_resolved()) {
                debug!(key = %key, "already resolved, skipping");
                report.skipped += 1;
                continue;
            }

            self.process(&key, &mut report).await;
            report.resolution_order.push(key);

            if let Some(callback) = &self.progress {
                callback(self.store.len());
            }
        }

        info!(
            nodes = self.store.len(),
            edges = self.store.edges().len(),
            resolved = report.resolved,
            failed = report.failed,
            stop_reason = %report.stop_reason,
            "crawl finished"
        );

        CrawlOutcome {
            store: self.store,
            report,
        }
    }

    async fn process(&mut self, key: &CitationKey, report: &mut CrawlReport) {
        if !key.is_queryable() {
            debug!(key = %key, "key has no queryable form");
            self.store.mark_resolved(key.as_str(), Resolution::FailedTerminal);
            report.failed += 1;
            return;
        }

        self.rate_limiter.wait().await;
        report.lookups += 1;

        let result = self.lookup.lookup(key).await;
        self.rate_limiter.complete().await;

        match result {
            Ok(record) => {
                self.apply(key, record, report);
                self.store.mark_resolved(key.as_str(), Resolution::Resolved);
                report.resolved += 1;
            }
            Err(error) => {
                warn!(
                    key = %key,
                    lookup = self.lookup.name(),
                    error = %error,
                    "citation lookup failed"
                );
                self.store.mark_resolved(key.as_str(), Resolution::FailedTerminal);
                report.failed += 1;
            }
        }
    }

    fn apply(&mut self, key: &CitationKey, record: LookupRecord, report: &mut CrawlReport) {
        self.store.merge_fields(key.as_str(), &record.fields);

        for cited in &record.cited {
            let Some(target) = normalize_doi(cited) else {
                continue;
            };
            self.store.add_edge(key.clone(), target.clone());
            report.edges_added += 1;

            if self.store.contains(target.as_str()) || self.store.len() >= self.config.max_nodes {
                continue;
            }
            self.store
                .insert(target.clone(), NodeOrigin::Discovered, placeholder_fields(&target));
            self.frontier.push(target);
            report.nodes_discovered += 1;
        }
    }
}

impl fmt::Debug for FrontierCrawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontierCrawler")
            .field("config", &self.config)
            .field("nodes", &self.store.len())
            .field("pending", &self.frontier.pending())
            .finish_non_exhaustive()
    }
}

fn placeholder_fields(key: &CitationKey) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::DOI.to_string(), key.to_string());
    fields.insert(field::SOURCE.to_string(), DISCOVERED_SOURCE_LABEL.to_string());
    fields
}
