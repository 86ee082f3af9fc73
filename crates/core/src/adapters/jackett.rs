//! Native adapter that proxies a remote Jackett instance.
//!
//! Jackett already speaks the universal category taxonomy, so the category
//! table is the identity mapping and results come back pre-categorized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::category::CategoryMapper;
use crate::config::JackettSourceConfig;
use crate::http::SessionClient;
use crate::registry::{AdapterContext, RegistryError};
use crate::source::{
    CapabilitySet, Query, ResultCache, ResultItem, Source, SourceAdapter, SourceError,
};

pub struct JackettAdapter {
    source: Source,
    config: JackettSourceConfig,
    client: SessionClient,
    cache: ResultCache,
}

impl JackettAdapter {
    pub fn new(config: JackettSourceConfig, ctx: &AdapterContext) -> Result<Self, RegistryError> {
        if config.url.trim().is_empty() {
            return Err(RegistryError::Construction {
                id: config.id.clone(),
                reason: "jackett url is empty".to_string(),
            });
        }

        let source = Source {
            id: config.id.clone(),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| format!("Jackett ({})", config.indexer)),
            description: format!("Jackett indexer '{}' at {}", config.indexer, config.url),
            kind: config.kind,
            site_link: config.url.clone(),
            caps: CapabilitySet::all(),
            categories: CategoryMapper::identity(),
        };
        let client = ctx.session_client(&config.id, Default::default());
        let cache = ctx.result_cache();

        Ok(Self {
            source,
            config,
            client,
            cache,
        })
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &Query) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.indexer),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(&query.search_string())
        );

        if let Some(imdb) = query.imdb_id.as_deref().filter(|id| !id.is_empty()) {
            url.push_str(&format!("&imdbid={}", urlencoding::encode(imdb)));
        }
        for cat in &query.categories {
            url.push_str(&format!("&Category[]={}", cat));
        }

        url
    }
}

#[async_trait]
impl SourceAdapter for JackettAdapter {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn results_for_query(&self, query: &Query) -> Result<Vec<ResultItem>, SourceError> {
        if let Some(cached) = self.cache.get(query).await {
            debug!(source = %self.source.id, results = cached.len(), "Jackett cache hit");
            return Ok(cached);
        }

        let url = self.build_search_url(query);
        debug!(source = %self.source.id, indexer = %self.config.indexer, "Searching Jackett");

        let response = self
            .client
            .fetch_with_retry(self.client.get_request(url))
            .await?;
        let body = response.text();

        if !response.is_success() {
            return Err(SourceError::Other(format!(
                "HTTP {}: {}",
                response.status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let jackett_response: JackettResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::parse(&self.source.id, &body, e))?;

        debug!(
            source = %self.source.id,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        let items: Vec<ResultItem> = jackett_response
            .Results
            .into_iter()
            .map(JackettResult::into_item)
            .collect();
        self.cache.insert(query, items.clone()).await;
        Ok(items)
    }

    async fn download(&self, link: &str) -> Result<Vec<u8>, SourceError> {
        Ok(self.client.download(link, None).await?)
    }
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    // Jackett returns dates in ISO 8601 format
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            // Try parsing without timezone
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    Details: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
    Grabs: Option<i32>,
    Files: Option<i32>,
    #[serde(default)]
    Category: Vec<u32>,
    PublishDate: Option<String>,
    MinimumRatio: Option<f64>,
    MinimumSeedTime: Option<i64>,
    DownloadVolumeFactor: Option<f64>,
    UploadVolumeFactor: Option<f64>,
}

impl JackettResult {
    fn into_item(self) -> ResultItem {
        let non_negative = |v: Option<i32>| v.map(|n| n.max(0) as u32);
        ResultItem {
            title: self.Title,
            link: self.Link,
            details: self.Details,
            magnet_uri: self.MagnetUri,
            info_hash: self.InfoHash.map(|h| h.to_lowercase()),
            size_bytes: self.Size.unwrap_or(0).max(0) as u64,
            seeders: non_negative(self.Seeders),
            peers: non_negative(self.Peers),
            grabs: non_negative(self.Grabs),
            files: non_negative(self.Files),
            publish_date: self
                .PublishDate
                .as_deref()
                .and_then(parse_jackett_date)
                .unwrap_or_else(Utc::now),
            categories: self.Category,
            minimum_ratio: self.MinimumRatio,
            minimum_seed_time: self.MinimumSeedTime.map(|s| s.max(0) as u64),
            download_volume_factor: self.DownloadVolumeFactor,
            upload_volume_factor: self.UploadVolumeFactor,
        }
    }
}
