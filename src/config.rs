//! Immutable run configuration.
//!
//! A [`RunConfig`] is assembled once by the binary (defaults, config file,
//! command-line flags) and passed down by value. Nothing here reads the
//! environment or global state.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::export::ExportPaths;
use crate::http::HttpSettings;
use crate::source::{ARXIV_BASE_URL, CROSSREF_BASE_URL};

/// Default seed search query.
pub const DEFAULT_QUERY: &str = "all:machine learning";

/// Default number of seed records requested.
pub const DEFAULT_SEED_LIMIT: usize = 300;

/// Default node cap.
pub const DEFAULT_MAX_NODES: usize = 1000;

/// Default spacing between consecutive lookups in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 1000;

/// Largest accepted lookup spacing in milliseconds.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Default node table path.
pub const DEFAULT_NODES_CSV: &str = "papers.csv";

/// Default edge table path.
pub const DEFAULT_EDGES_CSV: &str = "citations.csv";

/// Default artifact directory.
pub const DEFAULT_ARTIFACT_DIR: &str = "pdfs";

/// Default number of concurrent artifact downloads.
pub const DEFAULT_ARTIFACT_CONCURRENCY: usize = 1;

/// Largest accepted artifact concurrency.
pub const MAX_ARTIFACT_CONCURRENCY: usize = 16;

/// Traversal bounds for the frontier crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Node cap; traversal stops once the store holds this many nodes.
    pub max_nodes: usize,
    /// Minimum spacing between consecutive lookups.
    pub request_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            request_delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

/// Settings for the post-export artifact pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConfig {
    /// Whether the pass runs at all.
    pub enabled: bool,
    /// Destination directory.
    pub output_dir: PathBuf,
    /// Maximum simultaneous downloads.
    pub concurrency: usize,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            concurrency: DEFAULT_ARTIFACT_CONCURRENCY,
        }
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Seed search query.
    pub query: String,
    /// Number of seed records requested.
    pub seed_limit: usize,
    /// Traversal bounds.
    pub crawl: CrawlConfig,
    /// Output table paths.
    pub export: ExportPaths,
    /// Artifact pass settings.
    pub artifacts: ArtifactConfig,
    /// HTTP timeouts.
    pub http: HttpSettings,
    /// Contact address for the Crossref polite pool.
    pub mailto: Option<String>,
    /// arXiv API base URL.
    pub arxiv_url: String,
    /// Crossref API base URL.
    pub crossref_url: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            seed_limit: DEFAULT_SEED_LIMIT,
            crawl: CrawlConfig::default(),
            export: ExportPaths::new(DEFAULT_NODES_CSV, DEFAULT_EDGES_CSV),
            artifacts: ArtifactConfig::default(),
            http: HttpSettings::default(),
            mailto: None,
            arxiv_url: ARXIV_BASE_URL.to_string(),
            crossref_url: CROSSREF_BASE_URL.to_string(),
        }
    }
}

impl RunConfig {
    /// Checks the configuration before any external call is made.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.trim().is_empty() {
            return Err(ConfigError::invalid("query", "must not be empty"));
        }
        if self.seed_limit == 0 {
            return Err(ConfigError::invalid("seed_limit", "must be at least 1"));
        }
        if self.crawl.max_nodes == 0 {
            return Err(ConfigError::invalid("max_nodes", "must be at least 1"));
        }
        if self.crawl.request_delay > Duration::from_millis(MAX_DELAY_MS) {
            return Err(ConfigError::invalid(
                "delay_ms",
                &format!("must be at most {MAX_DELAY_MS}"),
            ));
        }
        if !(1..=MAX_ARTIFACT_CONCURRENCY).contains(&self.artifacts.concurrency) {
            return Err(ConfigError::invalid(
                "artifact_concurrency",
                &format!("must be between 1 and {MAX_ARTIFACT_CONCURRENCY}"),
            ));
        }
        if self.http.connect_timeout_secs == 0 || self.http.read_timeout_secs == 0 {
            return Err(ConfigError::invalid("timeouts", "must be at least 1 second"));
        }
        if self.export.nodes == self.export.edges {
            return Err(ConfigError::invalid(
                "edges_csv",
                "must differ from nodes_csv",
            ));
        }
        for (key, value) in [("arxiv_url", &self.arxiv_url), ("crossref_url", &self.crossref_url)] {
            if url::Url::parse(value).is_err() {
                return Err(ConfigError::invalid(key, "must be an absolute URL"));
            }
        }
        Ok(())
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of range or malformed.
    #[error("invalid configuration value for '{key}': {reason}\n  Suggestion: {suggestion}")]
    Invalid {
        /// Config key
        key: String,
        /// What is wrong
        reason: String,
        /// How to fix it
        suggestion: String,
    },
}

impl ConfigError {
    /// Creates an `Invalid` error.
    #[must_use]
    pub fn invalid(key: &str, reason: &str) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
            suggestion: format!("Fix '{key}' in the config file or on the command line"),
        }
    }
}
