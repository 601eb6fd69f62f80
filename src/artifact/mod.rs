//! Post-export artifact pass.
//!
//! Downloads the PDF of every seed node that carries a non-empty `pdf_url`
//! into `<dir>/<sanitized key>.pdf`. Sanitizing is lossy, so when two keys
//! map to the same name the later node (in creation order) gets
//! `<sanitized key>-<n>.pdf` instead. The pass is best-effort: an existing
//! file is skipped, a failed download is logged and counted, and nothing here
//! touches the exported tables.
//!
//! Downloads stream into `<name>.pdf.part` and are renamed on completion, so
//! an interrupted run never leaves a truncated `.pdf` behind. Concurrency is
//! bounded by a semaphore (default 1) and each request waits on the shared
//! [`RateLimiter`] for its domain.

mod error;
mod filename;

pub use error::ArtifactError;
pub use filename::{artifact_file_name, numbered_file_name, sanitize_key};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::graph::{GraphStore, NodeOrigin};
use crate::http::{HttpSettings, build_http_client};
use crate::identity::CitationKey;
use crate::rate_limiter::RateLimiter;
use crate::record::field;

/// Suffix of in-progress downloads.
const PARTIAL_SUFFIX: &str = ".part";

/// One node eligible for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    /// Node key, used for the file name.
    pub key: CitationKey,
    /// Download URL.
    pub url: String,
}

/// Result of a single successful artifact attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Downloaded and published.
    Fetched {
        /// Final file path.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// A file already existed at the destination.
    Skipped {
        /// Existing file path.
        path: PathBuf,
    },
}

/// Counters for one artifact pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtifactReport {
    /// Artifacts downloaded.
    pub fetched: usize,
    /// Artifacts already present.
    pub skipped: usize,
    /// Artifacts that failed.
    pub failed: usize,
}

impl ArtifactReport {
    /// Total candidates attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.fetched + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &Result<FetchOutcome, ArtifactError>) {
        match outcome {
            Ok(FetchOutcome::Fetched { .. }) => self.fetched += 1,
            Ok(FetchOutcome::Skipped { .. }) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Downloads seed artifacts from a finished graph.
#[derive(Debug)]
pub struct ArtifactFetcher {
    client: Client,
    output_dir: PathBuf,
    concurrency: usize,
    rate_limiter: Arc<RateLimiter>,
}

impl ArtifactFetcher {
    /// Creates a fetcher writing into `output_dir`.
    ///
    /// A `concurrency` of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        concurrency: usize,
        http: &HttpSettings,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, ArtifactError> {
        let client =
            build_http_client(http).map_err(|e| ArtifactError::client_build(e.to_string()))?;
        Ok(Self {
            client,
            output_dir: output_dir.into(),
            concurrency: concurrency.max(1),
            rate_limiter,
        })
    }

    /// Returns the download directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the seed nodes with a non-empty `pdf_url`, in creation order.
    #[must_use]
    pub fn candidates(store: &GraphStore) -> Vec<ArtifactCandidate> {
        store
            .nodes()
            .filter(|node| node.origin() == NodeOrigin::Seed)
            .filter_map(|node| {
                let url = node.field(field::PDF_URL)?.trim();
                (!url.is_empty()).then(|| ArtifactCandidate {
                    key: node.key().clone(),
                    url: url.to_string(),
                })
            })
            .collect()
    }

    /// Returns the destination path for `key`.
    #[must_use]
    pub fn destination(&self, key: &CitationKey) -> PathBuf {
        self.output_dir.join(artifact_file_name(key.as_str()))
    }

    /// Assigns one distinct destination to each candidate, in order.
    ///
    /// The first candidate to claim a sanitized name keeps it. A later
    /// candidate with the same name takes the lowest free `-<n>` suffix,
    /// skipping any plain name another candidate already owns.
    #[must_use]
    pub fn plan_destinations(&self, candidates: &[ArtifactCandidate]) -> Vec<PathBuf> {
        let mut claimed = HashSet::new();
        let mut planned: Vec<Option<PathBuf>> = candidates
            .iter()
            .map(|candidate| {
                let path = self.destination(&candidate.key);
                claimed.insert(path.clone()).then_some(path)
            })
            .collect();

        for (candidate, slot) in candidates.iter().zip(planned.iter_mut()) {
            if slot.is_some() {
                continue;
            }
            let path = (2..)
                .map(|n| {
                    self.output_dir
                        .join(numbered_file_name(candidate.key.as_str(), n))
                })
                .find(|path| !claimed.contains(path))
                .unwrap_or_else(|| self.destination(&candidate.key));
            warn!(
                key = %candidate.key,
                path = %path.display(),
                "artifact name already taken by another key, using numbered name"
            );
            claimed.insert(path.clone());
            *slot = Some(path);
        }

        planned.into_iter().flatten().collect()
    }

    /// Downloads every candidate in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] only if the output directory cannot be
    /// created. Per-artifact failures are counted in the report.
    #[instrument(skip_all, fields(dir = %self.output_dir.display(), concurrency = self.concurrency))]
    pub async fn fetch_all(&self, store: &GraphStore) -> Result<ArtifactReport, ArtifactError> {
        let candidates = Self::candidates(store);
        let mut report = ArtifactReport::default();
        if candidates.is_empty() {
            info!("no artifacts to fetch");
            return Ok(report);
        }

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ArtifactError::io(&self.output_dir, e))?;

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        let destinations = self.plan_destinations(&candidates);
        for (candidate, destination) in candidates.into_iter().zip(destinations) {
            let client = self.client.clone();
            let rate_limiter = Arc::clone(&self.rate_limiter);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (candidate, Err(ArtifactError::client_build("download pool closed")));
                };
                let outcome = download(&client, &rate_limiter, &candidate.url, &destination).await;
                (candidate, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((candidate, outcome)) => {
                    match &outcome {
                        Ok(FetchOutcome::Fetched { path, bytes }) => {
                            info!(key = %candidate.key, path = %path.display(), bytes, "artifact fetched");
                        }
                        Ok(FetchOutcome::Skipped { path }) => {
                            debug!(key = %candidate.key, path = %path.display(), "artifact exists, skipped");
                        }
                        Err(error) => {
                            warn!(key = %candidate.key, url = %candidate.url, error = %error, "artifact fetch failed");
                        }
                    }
                    report.record(&outcome);
                }
                Err(join_error) => {
                    warn!(error = %join_error, "artifact task aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            "artifact pass finished"
        );
        Ok(report)
    }

    /// Downloads a single candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the download fails; no partial file is
    /// left behind.
    pub async fn fetch_one(
        &self,
        candidate: &ArtifactCandidate,
    ) -> Result<FetchOutcome, ArtifactError> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ArtifactError::io(&self.output_dir, e))?;
        let destination = self.destination(&candidate.key);
        download(&self.client, &self.rate_limiter, &candidate.url, &destination).await
    }
}

#[instrument(skip(client, rate_limiter), fields(path = %destination.display()))]
async fn download(
    client: &Client,
    rate_limiter: &RateLimiter,
    url: &str,
    destination: &Path,
) -> Result<FetchOutcome, ArtifactError> {
    if fs::try_exists(destination).await.unwrap_or(false) {
        return Ok(FetchOutcome::Skipped {
            path: destination.to_path_buf(),
        });
    }

    let parsed = url::Url::parse(url).map_err(|_| ArtifactError::invalid_url(url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ArtifactError::invalid_url(url));
    }

    rate_limiter.acquire(url).await;

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| ArtifactError::network(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ArtifactError::http_status(url, status.as_u16()));
    }

    let partial = partial_path(destination);
    let result = stream_to_partial(response, url, &partial).await;
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(error) => {
            debug!(path = %partial.display(), "cleaning up partial file after error");
            let _ = fs::remove_file(&partial).await;
            return Err(error);
        }
    };

    if let Err(e) = fs::rename(&partial, destination).await {
        let _ = fs::remove_file(&partial).await;
        return Err(ArtifactError::io(destination, e));
    }

    Ok(FetchOutcome::Fetched {
        path: destination.to_path_buf(),
        bytes,
    })
}

/// Streams the response body into `partial`, returning bytes written.
async fn stream_to_partial(
    response: reqwest::Response,
    url: &str,
    partial: &Path,
) -> Result<u64, ArtifactError> {
    let file = File::create(partial)
        .await
        .map_err(|e| ArtifactError::io(partial, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| ArtifactError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| ArtifactError::io(partial, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| ArtifactError::io(partial, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| ArtifactError::io(partial, e))?;

    Ok(bytes_written)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
