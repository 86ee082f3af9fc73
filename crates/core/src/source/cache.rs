//! Per-adapter result cache.
//!
//! Each adapter gets its own [`ResultCache`] from the registry and drops it
//! with itself. Entries are keyed by the normalized query so that the same
//! search repeated within the TTL does not hit the remote site again.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::CacheConfig;

use super::{Query, ResultItem};

/// Normalized query identity: type, lowercased term, external id, episode
/// and sorted categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(query: &Query) -> Self {
        let mut categories = query.categories.clone();
        categories.sort_unstable();
        categories.dedup();
        let categories = categories
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Self(format!(
            "{:?}|{}|{}|{}|{}|{}",
            query.query_type,
            query.term.trim().to_lowercase(),
            query.imdb_id.as_deref().unwrap_or(""),
            query.season.map(|s| s.to_string()).unwrap_or_default(),
            query.episode.as_deref().unwrap_or(""),
            categories,
        ))
    }
}

#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Cache<CacheKey, Arc<Vec<ResultItem>>>>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl ResultCache {
    /// A zero TTL disables caching entirely.
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { inner: Some(inner) }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, query: &Query) -> Option<Vec<ResultItem>> {
        let cache = self.inner.as_ref()?;
        cache
            .get(&CacheKey::new(query))
            .await
            .map(|items| items.as_ref().clone())
    }

    pub async fn insert(&self, query: &Query, items: Vec<ResultItem>) {
        if let Some(cache) = &self.inner {
            cache.insert(CacheKey::new(query), Arc::new(items)).await;
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }
}
