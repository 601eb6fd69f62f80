//! Integration tests for the frontier crawler.
//!
//! Drives the crawl through the public API with in-memory sources.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use citegraph_core::{
    CitationKey, CitationLookup, CrawlConfig, Fields, FrontierCrawler, LookupRecord, NodeOrigin,
    RateLimiter, Resolution, SourceError, SourceRecord, StopReason,
};
use tokio::time::Instant;

mod support;
use support::fakes::{FakeLookup, seed};

fn crawler(lookup: Arc<FakeLookup>, max_nodes: usize) -> FrontierCrawler {
    let config = CrawlConfig {
        max_nodes,
        request_delay: Duration::ZERO,
    };
    FrontierCrawler::new(config, lookup, Arc::new(RateLimiter::disabled()))
}

fn edge_pairs(store: &citegraph_core::GraphStore) -> Vec<(String, String)> {
    store
        .edges()
        .iter()
        .map(|edge| (edge.from.to_string(), edge.to.to_string()))
        .collect()
}

#[tokio::test]
async fn test_crawl_cap_five_exhausts_frontier() {
    let lookup = Arc::new(
        FakeLookup::new()
            .cites("10.1/a", &["10.1/B", "10.1/C"])
            .cites("10.1/b", &[])
            .cites("10.1/c", &[]),
    );
    let mut crawler = crawler(lookup.clone(), 5);
    crawler.ingest_seeds(vec![SourceRecord::new("s1").with_doi("10.1/A")]);

    let outcome = crawler.run().await;

    let keys: Vec<&str> = outcome.store.nodes().map(|n| n.key().as_str()).collect();
    assert_eq!(keys, vec!["10.1/a", "10.1/b", "10.1/c"]);
    assert_eq!(
        edge_pairs(&outcome.store),
        vec![
            ("10.1/a".to_string(), "10.1/b".to_string()),
            ("10.1/a".to_string(), "10.1/c".to_string()),
        ]
    );
    assert_eq!(outcome.report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(outcome.report.resolved, 3);
    assert!(outcome.store.nodes().all(|n| n.is_resolved()));
}

#[tokio::test]
async fn test_crawl_cap_two_stops_at_cap_with_dangling_edge() {
    let lookup = Arc::new(
        FakeLookup::new()
            .cites("10.1/a", &["10.1/B", "10.1/C"])
            .cites("10.1/b", &[])
            .cites("10.1/c", &[]),
    );
    let mut crawler = crawler(lookup.clone(), 2);
    crawler.ingest_seeds(vec![SourceRecord::new("s1").with_doi("10.1/A")]);

    let outcome = crawler.run().await;

    assert_eq!(outcome.store.len(), 2);
    assert!(outcome.store.contains("10.1/b"));
    assert!(!outcome.store.contains("10.1/c"));
    assert_eq!(outcome.store.edges().len(), 2);
    assert_eq!(outcome.store.dangling_edge_count(), 1);
    assert_eq!(outcome.report.stop_reason, StopReason::NodeCapReached);
    // No lookups after the cap was reached.
    assert_eq!(lookup.calls(), vec!["10.1/a"]);
}

#[tokio::test]
async fn test_crawl_lookup_error_marks_node_and_continues() {
    let lookup = Arc::new(FakeLookup::new().fails("10.1/a").cites("10.1/b", &["10.1/c"]));
    let mut crawler = crawler(lookup.clone(), 10);
    crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/b")]);

    let outcome = crawler.run().await;

    let failed = outcome.store.get("10.1/a").unwrap();
    assert_eq!(failed.resolution(), Some(Resolution::FailedTerminal));
    assert!(outcome.store.edges().iter().all(|e| e.from.as_str() != "10.1/a"));
    assert!(outcome.store.contains("10.1/c"));
    assert_eq!(lookup.calls(), vec!["10.1/a", "10.1/b", "10.1/c"]);
    assert_eq!(outcome.report.failed, 2); // 10.1/a errored, 10.1/c unknown
    assert_eq!(outcome.report.resolved, 1);
}

#[tokio::test]
async fn test_crawl_breadth_first_order() {
    let lookup = Arc::new(
        FakeLookup::new()
            .cites("10.1/a", &["10.1/c"])
            .cites("10.1/b", &["10.1/d"])
            .cites("10.1/c", &["10.1/e"])
            .cites("10.1/d", &[])
            .cites("10.1/e", &[]),
    );
    let mut crawler = crawler(lookup.clone(), 100);
    crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/b")]);

    let outcome = crawler.run().await;
    let order: Vec<&str> = outcome
        .report
        .resolution_order
        .iter()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(order, vec!["10.1/a", "10.1/b", "10.1/c", "10.1/d", "10.1/e"]);

    let idx = |key: &str| outcome.report.resolution_index(key).unwrap();
    assert!(idx("10.1/c") > idx("10.1/a"));
    assert!(idx("10.1/e") > idx("10.1/c"));
    assert!(idx("10.1/c") > idx("10.1/b"), "seeds resolve before discoveries");
}

#[tokio::test]
async fn test_crawl_never_looks_up_a_key_twice() {
    let lookup = Arc::new(
        FakeLookup::new()
            .cites("10.1/a", &["10.1/b", "10.1/B", "10.1/a"])
            .cites("10.1/b", &["10.1/a", "10.1/c"])
            .cites("10.1/c", &["10.1/a", "10.1/b"]),
    );
    let mut crawler = crawler(lookup.clone(), 100);
    crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/A")]);

    let outcome = crawler.run().await;

    let calls = lookup.calls();
    let unique: HashSet<&String> = calls.iter().collect();
    assert_eq!(calls.len(), unique.len());
    assert_eq!(outcome.store.len(), 3);
    // Duplicate edges are kept.
    assert_eq!(outcome.store.edges().len(), 7);
}

#[tokio::test]
async fn test_crawl_node_count_never_exceeds_cap() {
    let cited: Vec<String> = (0..50).map(|i| format!("10.2/n{i}")).collect();
    let cited_refs: Vec<&str> = cited.iter().map(String::as_str).collect();
    let lookup = Arc::new(FakeLookup::new().cites("10.1/a", &cited_refs));
    let mut crawler = crawler(lookup, 10);
    crawler.ingest_seeds(vec![seed("10.1/a")]);

    let outcome = crawler.run().await;
    assert_eq!(outcome.store.len(), 10);
    assert_eq!(outcome.store.edges().len(), 50);
    assert_eq!(outcome.report.nodes_discovered, 9);
    assert_eq!(outcome.report.stop_reason, StopReason::NodeCapReached);
}

#[tokio::test]
async fn test_crawl_seed_load_is_not_capped() {
    let lookup = Arc::new(FakeLookup::new());
    let mut crawler = crawler(lookup.clone(), 2);
    let inserted = crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/b"), seed("10.1/c")]);
    assert_eq!(inserted, 3);

    let outcome = crawler.run().await;
    assert_eq!(outcome.store.len(), 3);
    assert_eq!(outcome.report.stop_reason, StopReason::NodeCapReached);
    assert!(lookup.calls().is_empty());
}

#[tokio::test]
async fn test_crawl_merge_keeps_seed_values_and_fills_gaps() {
    let record = LookupRecord {
        fields: Fields::from([
            ("title".to_string(), "Crossref Title".to_string()),
            ("abstract".to_string(), "From Crossref".to_string()),
            ("publisher".to_string(), "ACM".to_string()),
            ("source".to_string(), "Crossref".to_string()),
        ]),
        cited: Vec::new(),
    };
    let lookup = Arc::new(FakeLookup::new().with_record("10.1/a", record));
    let mut crawler = crawler(lookup, 10);
    crawler.ingest_seeds(vec![
        SourceRecord::new("http://arxiv.org/abs/1")
            .with_doi("10.1/a")
            .with_field("title", "arXiv Title")
            .with_field("abstract", "")
            .with_field("source", "arXiv"),
    ]);

    let outcome = crawler.run().await;
    let node = outcome.store.get("10.1/a").unwrap();
    assert_eq!(node.origin(), NodeOrigin::Seed);
    assert_eq!(node.field("title"), Some("arXiv Title"));
    assert_eq!(node.field("abstract"), Some("From Crossref"));
    assert_eq!(node.field("publisher"), Some("ACM"));
    assert_eq!(node.field("source"), Some("arXiv"));
}

#[tokio::test]
async fn test_crawl_spaces_lookups_with_rate_limiter() {
    tokio::time::pause();

    let lookup = Arc::new(
        FakeLookup::new()
            .cites("10.1/a", &[])
            .cites("10.1/b", &[])
            .cites("10.1/c", &[]),
    );
    let config = CrawlConfig {
        max_nodes: 10,
        request_delay: Duration::from_secs(1),
    };
    let limiter = Arc::new(RateLimiter::new(config.request_delay));
    let mut crawler = FrontierCrawler::new(config, lookup, limiter);
    crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/b"), seed("10.1/c")]);

    let start = tokio::time::Instant::now();
    let outcome = crawler.run().await;
    assert_eq!(outcome.report.lookups, 3);
    assert!(start.elapsed() >= Duration::from_secs(2));
}

/// Lookup that takes `took` per call and records when each call ran.
struct SlowLookup {
    took: Duration,
    failing: HashSet<String>,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

#[async_trait]
impl CitationLookup for SlowLookup {
    fn name(&self) -> &str {
        "slow"
    }

    async fn lookup(&self, key: &CitationKey) -> Result<LookupRecord, SourceError> {
        let started = Instant::now();
        tokio::time::sleep(self.took).await;
        self.spans.lock().unwrap().push((started, Instant::now()));
        if self.failing.contains(key.as_str()) {
            Err(SourceError::http_status("slow", key.as_str(), 503))
        } else {
            Ok(LookupRecord::default())
        }
    }
}

#[tokio::test]
async fn test_crawl_delay_is_measured_from_end_of_slow_or_failed_lookup() {
    tokio::time::pause();

    let lookup = Arc::new(SlowLookup {
        took: Duration::from_secs(2),
        failing: HashSet::from(["10.1/b".to_string()]),
        spans: Mutex::new(Vec::new()),
    });
    let config = CrawlConfig {
        max_nodes: 10,
        request_delay: Duration::from_secs(1),
    };
    let limiter = Arc::new(RateLimiter::new(config.request_delay));
    let mut crawler = FrontierCrawler::new(config, lookup.clone(), limiter);
    crawler.ingest_seeds(vec![seed("10.1/a"), seed("10.1/b"), seed("10.1/c")]);

    let outcome = crawler.run().await;
    assert_eq!(outcome.report.resolved, 2);
    assert_eq!(outcome.report.failed, 1);

    let spans = lookup.spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        let gap = pair[1].0.duration_since(pair[0].1);
        assert!(gap >= Duration::from_secs(1), "gap after a call was {gap:?}");
    }
}
