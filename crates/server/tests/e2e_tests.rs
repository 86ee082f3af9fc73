//! End-to-end tests with mocked sources.
//!
//! These tests run the full router in-process; sources are `MockSource`s
//! injected straight into the orchestrator.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use indexhub_core::{category::taxonomy, SourceError};

use common::{fixtures, outcome_for, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_hides_api_keys() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["server"]["port"], 9117);
    assert_eq!(response.body["cache"]["ttl_secs"], 540);
    assert_eq!(response.body["sources"][0]["id"], "remote");
    assert_eq!(response.body["sources"][0]["api_key_configured"], true);
    assert!(!response.body.to_string().contains("super-secret"));
}

// =============================================================================
// Source Tests
// =============================================================================

#[tokio::test]
async fn test_list_sources() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/sources").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["initialized"], true);
    let sources = response.body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["id"], "alpha");
    assert_eq!(sources[0]["kind"], "public");
}

#[tokio::test]
async fn test_count_sources() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/sources/count").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["configured"], 2);
    assert_eq!(response.body["initialized"], 2);
}

#[tokio::test]
async fn test_download_through_source() {
    let fixture = TestFixture::new();
    let link = "https://alpha.example/dl/42.torrent";

    let response = fixture
        .post("/api/v1/sources/alpha/download", json!({ "link": link }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, link.as_bytes());
    assert_eq!(fixture.alpha.downloads(), vec![link.to_string()]);
    assert!(fixture.beta.downloads().is_empty());
}

#[tokio::test]
async fn test_download_unknown_source() {
    let fixture = TestFixture::new();

    let response = fixture
        .post(
            "/api/v1/sources/nope/download",
            json!({ "link": "https://x.example/a.torrent" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "unknown source: nope");
}

// =============================================================================
// Search Tests
// =============================================================================

#[tokio::test]
async fn test_search_collects_every_source() {
    let fixture = TestFixture::new();
    fixture.alpha.set_items(vec![
        fixtures::result_item("Ubuntu 24.04", &[taxonomy::PC]),
        fixtures::result_item("Ubuntu 22.04", &[taxonomy::PC]),
    ]);
    fixture
        .beta
        .set_items(vec![fixtures::result_item("Ubuntu Server", &[])]);

    let response = fixture
        .post("/api/v1/search", json!({ "query": "ubuntu" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["summary"]["selected"], 2);
    assert_eq!(response.body["summary"]["succeeded"], 2);
    assert_eq!(response.body["summary"]["cancelled"], false);

    let alpha = outcome_for(&response.body, "alpha");
    assert_eq!(alpha["status"], "success");
    assert_eq!(alpha["items"].as_array().unwrap().len(), 2);
    assert_eq!(alpha["items"][0]["title"], "Ubuntu 24.04");

    let beta = outcome_for(&response.body, "beta");
    assert_eq!(beta["items"].as_array().unwrap().len(), 1);

    let queries = fixture.alpha.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].term, "ubuntu");
}

#[tokio::test]
async fn test_search_reports_failing_source() {
    let fixture = TestFixture::new();
    fixture
        .alpha
        .set_items(vec![fixtures::result_item("Debian 12", &[])]);
    fixture
        .beta
        .set_error(Some(SourceError::Parse("unexpected page".to_string())));

    let response = fixture
        .post("/api/v1/search", json!({ "query": "debian" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["summary"]["succeeded"], 1);
    assert_eq!(response.body["summary"]["failed"], 1);

    let beta = outcome_for(&response.body, "beta");
    assert_eq!(beta["status"], "failure");
    assert_eq!(beta["kind"], "error");
    assert!(beta["message"]
        .as_str()
        .unwrap()
        .contains("unexpected page"));
}

#[tokio::test]
async fn test_search_applies_limit_and_categories() {
    let fixture = TestFixture::new();
    fixture.alpha.set_items(vec![
        fixtures::result_item("Movie One", &[taxonomy::MOVIES_HD]),
        fixtures::result_item("Series", &[taxonomy::TV]),
        fixtures::result_item("Movie Two", &[taxonomy::MOVIES]),
        fixtures::result_item("Movie Three", &[taxonomy::MOVIES]),
    ]);

    let response = fixture
        .post(
            "/api/v1/search",
            json!({ "query": "movie", "categories": [taxonomy::MOVIES], "limit": 2 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let items = outcome_for(&response.body, "alpha")["items"]
        .as_array()
        .unwrap()
        .clone();
    let titles: Vec<_> = items.iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Movie One", "Movie Two"]);
}

#[tokio::test]
async fn test_search_skips_private_sources() {
    let fixture = TestFixture::with_private_beta();

    let response = fixture
        .post("/api/v1/search", json!({ "query": "anything" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["summary"]["selected"], 1);
    assert_eq!(response.body["sources"].as_array().unwrap().len(), 1);
    assert_eq!(fixture.beta.call_count(), 0);
}

#[tokio::test]
async fn test_search_rejects_malformed_body() {
    let fixture = TestFixture::new();
    let response = fixture.post_raw("/api/v1/search", "{not json").await;

    assert!(response.status.is_client_error());
    assert_eq!(fixture.alpha.call_count(), 0);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture
        .post("/api/v1/search", json!({ "query": "metrics" }))
        .await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("indexhub_queries_total"));
    assert!(text.contains("indexhub_sources_initialized"));
}
