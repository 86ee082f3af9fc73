//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external seams (sources
//! and the HTTP transport), allowing end-to-end tests of the orchestrator
//! and the session client without any network.
//!
//! # Example
//!
//! ```rust,ignore
//! use indexhub_core::testing::{fixtures, MockSource};
//!
//! let fast = Arc::new(MockSource::new("fast").with_items(vec![fixtures::result_item("a", &[2000])]));
//! let slow = Arc::new(MockSource::new("slow").with_delay(Duration::from_millis(200)));
//! let orchestrator = QueryOrchestrator::with_sources(Default::default(), vec![fast, slow]);
//! ```

mod mock_source;
mod mock_transport;

pub use mock_source::MockSource;
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use crate::config::{HttpConfig, JackettSourceConfig};
    use crate::http::HttpTransport;
    use crate::registry::AdapterContext;
    use crate::source::{ResultItem, SourceKind};

    /// Adapter context with fast retries and default caching.
    pub fn adapter_context(transport: Arc<dyn HttpTransport>) -> AdapterContext {
        AdapterContext::new(transport).with_http(HttpConfig {
            retry_delay_ms: 10,
            ..Default::default()
        })
    }

    pub fn jackett_config(id: &str, url: &str) -> JackettSourceConfig {
        JackettSourceConfig {
            id: id.to_string(),
            name: None,
            url: url.to_string(),
            api_key: "test-key".to_string(),
            indexer: "all".to_string(),
            kind: SourceKind::Aggregate,
        }
    }

    /// A public, login-free JSON definition for `https://{id}.example/`.
    pub fn definition_toml(id: &str) -> String {
        format!(
            r#"
id = "{id}"
name = "{id}"
description = "test definition"
kind = "public"
links = ["https://{id}.example/"]

[caps]
search = true
tv_search = true

[[caps.categories]]
token = "1"
category = 2000
description = "Movies"

[[caps.categories]]
token = "2"
category = 5000
description = "TV"

[search]
path = "api/search"
[search.params]
q = "{{{{term}}}}"
cat = "{{{{categories}}}}"
[search.response]
results = "data"
title = "name"
link = "download"
size = "size"
seeders = "seeders"
leechers = "leechers"
date = "added"
category = "category"
"#
        )
    }

    /// An item published an hour ago.
    pub fn result_item(title: &str, categories: &[u32]) -> ResultItem {
        ResultItem::new(title, Utc::now() - Duration::hours(1))
            .with_categories(categories.to_vec())
            .with_link(format!("https://example.org/dl/{}", title.replace(' ', "-")))
    }
}
