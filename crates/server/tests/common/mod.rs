//! Common test utilities for E2E testing with mocks.
//!
//! The fixture builds an in-process router over an orchestrator whose
//! sources are `MockSource`s, so every endpoint can be exercised without
//! reaching any real site.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use indexhub_core::{
    config::{JackettSourceConfig, NativeSourceConfig},
    testing::MockSource,
    Config, QueryOrchestrator, SourceAdapter, SourceKind,
};
use indexhub_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use indexhub_core::testing::fixtures;

/// In-process server over two public mock sources, `alpha` and `beta`.
pub struct TestFixture {
    pub router: Router,
    pub alpha: Arc<MockSource>,
    pub beta: Arc<MockSource>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_sources(MockSource::new("alpha"), MockSource::new("beta"))
    }

    pub fn with_sources(alpha: MockSource, beta: MockSource) -> Self {
        let alpha = Arc::new(alpha);
        let beta = Arc::new(beta);

        let mut config = Config::default();
        config.sources.push(NativeSourceConfig::Jackett(JackettSourceConfig {
            api_key: "super-secret".to_string(),
            ..fixtures::jackett_config("remote", "http://jackett.local:9117")
        }));

        let sources: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::clone(&alpha) as Arc<dyn SourceAdapter>,
            Arc::clone(&beta) as Arc<dyn SourceAdapter>,
        ];
        let orchestrator = Arc::new(QueryOrchestrator::with_sources(
            config.orchestrator.clone(),
            sources,
        ));

        let state = Arc::new(AppState::new(config, orchestrator));
        Self {
            router: create_router(state),
            alpha,
            beta,
        }
    }

    /// Fixture whose `beta` source is private and therefore never queried.
    pub fn with_private_beta() -> Self {
        Self::with_sources(
            MockSource::new("alpha"),
            MockSource::new("beta").with_kind(SourceKind::Private),
        )
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);

        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json)
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            body,
            bytes,
        }
    }
}

/// Outcome entry of `source` in a search response body.
pub fn outcome_for<'a>(body: &'a Value, source: &str) -> &'a Value {
    body["sources"]
        .as_array()
        .expect("sources array")
        .iter()
        .find(|entry| entry["source"]["id"] == source)
        .map(|entry| &entry["outcome"])
        .unwrap_or_else(|| panic!("no outcome for {}", source))
}
