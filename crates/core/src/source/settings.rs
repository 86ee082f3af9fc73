//! Per-source settings persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SourceCredentialsConfig;
use crate::http::SessionObserver;

/// What a source remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(default)]
    pub cookie_header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_link: Option<String>,
    /// Login form values (`username`, `password`, ...).
    #[serde(default)]
    pub credentials: HashMap<String, String>,
}

/// Load/save of per-source settings. The storage format is up to the
/// implementation.
pub trait SettingsStore: Send + Sync {
    fn load(&self, source_id: &str) -> Option<StoredSettings>;
    fn save(&self, source_id: &str, settings: StoredSettings);
}

/// Process-local [`SettingsStore`].
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: RwLock<HashMap<String, StoredSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the configured credentials, one entry per source.
    pub fn from_config(credentials: &[SourceCredentialsConfig]) -> Self {
        let entries = credentials
            .iter()
            .map(|c| (c.id.clone(), StoredSettings::from(c)))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl From<&SourceCredentialsConfig> for StoredSettings {
    fn from(config: &SourceCredentialsConfig) -> Self {
        Self {
            cookie_header: config.cookie_header.clone().unwrap_or_default(),
            site_link: config.site_link.clone(),
            credentials: config.values.clone(),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self, source_id: &str) -> Option<StoredSettings> {
        self.entries.read().ok()?.get(source_id).cloned()
    }

    fn save(&self, source_id: &str, settings: StoredSettings) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(source_id.to_string(), settings);
        }
    }
}

/// Writes changed session cookies back into a [`SettingsStore`].
pub struct PersistingObserver {
    store: Arc<dyn SettingsStore>,
}

impl PersistingObserver {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }
}

impl SessionObserver for PersistingObserver {
    fn on_session_cookie_changed(&self, source_id: &str, cookie_header: &str) {
        let mut settings = self.store.load(source_id).unwrap_or_default();
        settings.cookie_header = cookie_header.to_string();
        self.store.save(source_id, settings);
        debug!(source = %source_id, "Persisted session cookies");
    }
}
