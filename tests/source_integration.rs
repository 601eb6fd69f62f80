//! Integration tests for the arXiv and Crossref adapters against wiremock.

use citegraph_core::{
    ArxivSearch, CitationKey, CitationLookup, CrossrefLookup, HttpSettings, SeedSource, SourceError,
};
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-01T00:00:00Z</published>
    <title>Graph Learning</title>
    <summary>First abstract.</summary>
    <author><name>Ada Lovelace</name></author>
    <link title="doi" href="http://dx.doi.org/10.5555/First" rel="related"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.LG"/>
    <category term="cs.LG"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <published>2024-01-02T00:00:00Z</published>
    <title>Second Paper</title>
    <summary>Second abstract.</summary>
    <author><name>Alan Turing</name></author>
    <category term="cs.AI"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00003v1</id>
    <published>2024-01-03T00:00:00Z</published>
    <title>Third Paper</title>
    <summary>Third abstract.</summary>
    <author><name>Grace Hopper</name></author>
    <category term="cs.AI"/>
  </entry>
</feed>"#;

fn works_body() -> serde_json::Value {
    json!({
        "status": "ok",
        "message-type": "work",
        "message": {
            "URL": "https://doi.org/10.1000/xyz",
            "DOI": "10.1000/XYZ",
            "title": ["A Crossref   Title"],
            "author": [
                {"given": "Jane", "family": "Doe"},
                {"family": "Solo"}
            ],
            "issued": {"date-parts": [[2021, 5, 4]]},
            "publisher": "ACM",
            "subject": ["Computer Science", "AI"],
            "reference": [
                {"key": "r1", "DOI": "10.2000/ABC"},
                {"key": "r2", "unstructured": "no doi here"},
                {"key": "r3", "DOI": "  "},
                {"key": "r4", "DOI": "10.2000/def"}
            ]
        }
    })
}

// ==================== Crossref ====================

#[tokio::test]
async fn test_crossref_lookup_maps_fields_and_citations() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/10\.1000(%2F|/)xyz$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_body()))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(None, server.uri(), &HttpSettings::default()).unwrap();
    let record = lookup.lookup(&CitationKey::new("10.1000/xyz")).await.unwrap();

    assert_eq!(record.cited, vec!["10.2000/abc", "10.2000/def"]);
    assert_eq!(record.fields.get("doi").unwrap(), "10.1000/xyz");
    assert_eq!(record.fields.get("title").unwrap(), "A Crossref Title");
    assert_eq!(record.fields.get("publisher").unwrap(), "ACM");
    assert_eq!(record.fields.get("source").unwrap(), "Crossref");
    assert!(!record.fields.contains_key("pdf_url"));
}

#[tokio::test]
async fn test_crossref_lookup_sends_mailto() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .and(query_param("mailto", "me@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(works_body()))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(
        Some("me@example.com".to_string()),
        server.uri(),
        &HttpSettings::default(),
    )
    .unwrap();
    assert!(lookup.lookup(&CitationKey::new("10.1000/xyz")).await.is_ok());
}

#[tokio::test]
async fn test_crossref_lookup_404_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(None, server.uri(), &HttpSettings::default()).unwrap();
    let err = lookup.lookup(&CitationKey::new("10.1/missing")).await.unwrap_err();
    assert!(matches!(err, SourceError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_crossref_lookup_server_error_is_http_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(None, server.uri(), &HttpSettings::default()).unwrap();
    let err = lookup.lookup(&CitationKey::new("10.1/a")).await.unwrap_err();
    assert!(
        matches!(err, SourceError::HttpStatus { status: 500, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_crossref_lookup_bad_status_field_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "failed", "message": {}})),
        )
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(None, server.uri(), &HttpSettings::default()).unwrap();
    let err = lookup.lookup(&CitationKey::new("10.1/a")).await.unwrap_err();
    assert!(matches!(err, SourceError::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_crossref_lookup_non_json_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path_regex(r"^/works/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let lookup = CrossrefLookup::with_base_url(None, server.uri(), &HttpSettings::default()).unwrap();
    let err = lookup.lookup(&CitationKey::new("10.1/a")).await.unwrap_err();
    assert!(matches!(err, SourceError::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_crossref_lookup_unreachable_host() {
    let lookup =
        CrossrefLookup::with_base_url(None, "http://127.0.0.1:1", &HttpSettings::default()).unwrap();
    let err = lookup.lookup(&CitationKey::new("10.1/a")).await.unwrap_err();
    assert!(matches!(err, SourceError::Unreachable { .. }), "got {err:?}");
}

// ==================== arXiv ====================

#[tokio::test]
async fn test_arxiv_search_returns_records_in_feed_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:graphs"))
        .and(query_param("start", "0"))
        .and(query_param("max_results", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;

    let search = ArxivSearch::with_base_url(server.uri(), &HttpSettings::default()).unwrap();
    let records = search.search("all:graphs", 10).await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.native_id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "http://arxiv.org/abs/2401.00001v1",
            "http://arxiv.org/abs/2401.00002v1",
            "http://arxiv.org/abs/2401.00003v1",
        ]
    );
    assert_eq!(records[0].doi.as_deref(), Some("10.5555/First"));
    assert!(records[1].doi.is_none());
    assert_eq!(records[1].fields.get("doi").unwrap(), "2401.00002v1");
}

#[tokio::test]
async fn test_arxiv_search_truncates_to_limit() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let search = ArxivSearch::with_base_url(server.uri(), &HttpSettings::default()).unwrap();
    let records = search.search("all:graphs", 2).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_arxiv_search_service_unavailable() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let search = ArxivSearch::with_base_url(server.uri(), &HttpSettings::default()).unwrap();
    let err = search.search("all:graphs", 5).await.unwrap_err();
    assert!(
        matches!(err, SourceError::HttpStatus { status: 503, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_arxiv_search_non_feed_body_is_malformed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Rate exceeded."))
        .mount(&server)
        .await;

    let search = ArxivSearch::with_base_url(server.uri(), &HttpSettings::default()).unwrap();
    let err = search.search("all:graphs", 5).await.unwrap_err();
    assert!(matches!(err, SourceError::MalformedResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_arxiv_search_empty_feed_yields_no_records() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#),
        )
        .mount(&server)
        .await;

    let search = ArxivSearch::with_base_url(server.uri(), &HttpSettings::default()).unwrap();
    assert!(search.search("all:nothing", 5).await.unwrap().is_empty());
}
