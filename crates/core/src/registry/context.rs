use std::sync::Arc;

use crate::config::{CacheConfig, HttpConfig};
use crate::http::{Encoding, HttpTransport, RetryPolicy, SessionClient, SessionState};
use crate::source::{
    InMemorySettingsStore, PersistingObserver, ResultCache, SettingsStore, StoredSettings,
};

/// Everything an adapter constructor may need.
///
/// Each adapter gets its own session and cache from here; only the
/// transport and the settings store are shared.
#[derive(Clone)]
pub struct AdapterContext {
    pub transport: Arc<dyn HttpTransport>,
    pub settings: Arc<dyn SettingsStore>,
    pub http: HttpConfig,
    pub cache: CacheConfig,
}

impl AdapterContext {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            settings: Arc::new(InMemorySettingsStore::new()),
            http: HttpConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn stored_settings(&self, source_id: &str) -> StoredSettings {
        self.settings.load(source_id).unwrap_or_default()
    }

    /// A session client seeded from the stored cookie header, persisting
    /// changes back into the settings store.
    pub fn session_client(&self, source_id: &str, encoding: Encoding) -> SessionClient {
        let stored = self.stored_settings(source_id);
        SessionClient::new(source_id, self.transport.clone())
            .with_session(SessionState::with_cookie_header(stored.cookie_header))
            .with_observer(Arc::new(PersistingObserver::new(self.settings.clone())))
            .with_retry(RetryPolicy::from(&self.http))
            .with_encoding(encoding)
    }

    pub fn result_cache(&self) -> ResultCache {
        ResultCache::from_config(&self.cache)
    }
}
