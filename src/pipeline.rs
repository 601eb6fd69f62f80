//! End-to-end run: seed search, crawl, export, artifacts.
//!
//! The [`Pipeline`] validates its [`RunConfig`] before any external call,
//! then runs the stages strictly in order. Only configuration and export
//! failures end the run with an error; a failed seed search yields an empty
//! seed batch (and therefore empty tables), and artifact failures are counted.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::artifact::{ArtifactError, ArtifactFetcher, ArtifactReport};
use crate::config::{ConfigError, RunConfig};
use crate::crawl::{CrawlReport, FrontierCrawler, ProgressCallback};
use crate::export::{ExportError, ExportSummary, export_graph};
use crate::rate_limiter::RateLimiter;
use crate::source::{CitationLookup, SeedSource};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration rejected before the crawl.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tables could not be written.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The artifact pass could not start.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Seed records returned by the search.
    pub seeds_found: usize,
    /// Seed nodes created after de-duplication.
    pub seeds_ingested: usize,
    /// Crawl counters.
    pub crawl: CrawlReport,
    /// Table export counters.
    pub export: ExportSummary,
    /// Artifact counters; `None` when the pass was disabled.
    pub artifacts: Option<ArtifactReport>,
}

/// Wires the seed source, citation lookup and configuration into one run.
pub struct Pipeline {
    config: RunConfig,
    seeds: Arc<dyn SeedSource>,
    lookup: Arc<dyn CitationLookup>,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(
        config: RunConfig,
        seeds: Arc<dyn SeedSource>,
        lookup: Arc<dyn CitationLookup>,
    ) -> Self {
        Self {
            config,
            seeds,
            lookup,
            progress: None,
        }
    }

    /// Registers a crawl progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for invalid configuration,
    /// [`PipelineError::Export`] when a table cannot be written (the artifact
    /// pass is then skipped) and [`PipelineError::Artifact`] when the
    /// artifact client or directory cannot be set up.
    #[instrument(skip_all, fields(query = %self.config.query))]
    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;
        let config = &self.config;

        let records = match self.seeds.search(&config.query, config.seed_limit).await {
            Ok(records) => records,
            Err(error) => {
                error!(
                    source = self.seeds.name(),
                    error = %error,
                    "seed search failed; continuing with an empty batch"
                );
                Vec::new()
            }
        };
        let seeds_found = records.len();

        let rate_limiter = Arc::new(RateLimiter::new(config.crawl.request_delay));
        let mut crawler = FrontierCrawler::new(
            config.crawl,
            Arc::clone(&self.lookup),
            Arc::clone(&rate_limiter),
        );
        if let Some(callback) = &self.progress {
            crawler = crawler.with_progress_callback(Arc::clone(callback));
        }
        let seeds_ingested = crawler.ingest_seeds(records);
        let outcome = crawler.run().await;

        let export = export_graph(&outcome.store, &config.export)?;
        let dangling = outcome.store.dangling_edge_count();
        if dangling > 0 {
            info!(dangling, "edges reference publications outside the node table");
        }

        let artifacts = if config.artifacts.enabled {
            let fetcher = ArtifactFetcher::new(
                &config.artifacts.output_dir,
                config.artifacts.concurrency,
                &config.http,
                rate_limiter,
            )?;
            let report = fetcher.fetch_all(&outcome.store).await?;
            if report.failed > 0 {
                warn!(failed = report.failed, "some artifacts could not be downloaded");
            }
            Some(report)
        } else {
            info!("artifact pass disabled");
            None
        };

        Ok(RunSummary {
            seeds_found,
            seeds_ingested,
            crawl: outcome.report,
            export,
            artifacts,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("seeds", &self.seeds.name())
            .field("lookup", &self.lookup.name())
            .finish_non_exhaustive()
    }
}
