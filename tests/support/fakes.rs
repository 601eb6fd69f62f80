//! In-memory source doubles for crawl and pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use citegraph_core::{
    CitationKey, CitationLookup, Fields, LookupRecord, SeedSource, SourceError, SourceRecord,
};

/// Seed source returning a fixed batch or a fixed error.
pub struct FakeSeeds {
    result: Result<Vec<SourceRecord>, SourceError>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeSeeds {
    pub fn returning(records: Vec<SourceRecord>) -> Self {
        Self {
            result: Ok(records),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(SourceError::http_status("fake-seeds", "q", 503)),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SeedSource for FakeSeeds {
    fn name(&self) -> &str {
        "fake-seeds"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceRecord>, SourceError> {
        self.calls.lock().unwrap().push((query.to_string(), limit));
        self.result.clone().map(|mut records| {
            records.truncate(limit);
            records
        })
    }
}

/// Citation lookup answering from a key map. Unknown keys are `NotFound`.
#[derive(Default)]
pub struct FakeLookup {
    responses: HashMap<String, Result<LookupRecord, SourceError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful lookup for `key` citing `cited`.
    pub fn cites(mut self, key: &str, cited: &[&str]) -> Self {
        self.responses.insert(
            key.to_string(),
            Ok(LookupRecord {
                fields: Fields::from([
                    ("title".to_string(), format!("Title of {key}")),
                    ("source".to_string(), "Crossref".to_string()),
                ]),
                cited: cited.iter().map(ToString::to_string).collect(),
            }),
        );
        self
    }

    /// Registers a successful lookup with explicit fields.
    pub fn with_record(mut self, key: &str, record: LookupRecord) -> Self {
        self.responses.insert(key.to_string(), Ok(record));
        self
    }

    /// Registers a failing lookup for `key`.
    pub fn fails(mut self, key: &str) -> Self {
        self.responses.insert(
            key.to_string(),
            Err(SourceError::http_status("fake-lookup", key, 500)),
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CitationLookup for FakeLookup {
    fn name(&self) -> &str {
        "fake-lookup"
    }

    async fn lookup(&self, key: &CitationKey) -> Result<LookupRecord, SourceError> {
        self.calls.lock().unwrap().push(key.to_string());
        self.responses
            .get(key.as_str())
            .cloned()
            .unwrap_or_else(|| Err(SourceError::not_found("fake-lookup", key.as_str())))
    }
}

/// A seed record with a DOI and a title.
pub fn seed(doi: &str) -> SourceRecord {
    SourceRecord::new(format!("http://arxiv.org/abs/{doi}"))
        .with_doi(doi)
        .with_field("title", format!("Seed {doi}"))
        .with_field("source", "arXiv")
}
