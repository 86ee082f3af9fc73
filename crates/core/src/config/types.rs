use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::source::SourceKind;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub definitions: DefinitionsConfig,
    /// Natively implemented sources, one table per instance.
    #[serde(default)]
    pub sources: Vec<NativeSourceConfig>,
    /// Login values and cookies seeded into the settings store at startup.
    #[serde(default)]
    pub credentials: Vec<SourceCredentialsConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9117
}

/// Outbound HTTP behaviour shared by every source's session client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Overrides the built-in browser user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Attempts per request on transport failures (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed delay between attempts (default: 500)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// Query orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Source kinds that receive queries (default: public only)
    #[serde(default = "default_queryable_kinds")]
    pub queryable_kinds: Vec<SourceKind>,
    /// Per-source deadline. No deadline when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timeout_secs: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            queryable_kinds: default_queryable_kinds(),
            source_timeout_secs: None,
        }
    }
}

fn default_queryable_kinds() -> Vec<SourceKind> {
    vec![SourceKind::Public]
}

/// Per-source result cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Entry lifetime; 0 disables caching (default: 540)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_cache_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    9 * 60
}

fn default_cache_entries() -> u64 {
    100
}

/// Data-described sources
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefinitionsConfig {
    /// Directory scanned for `*.toml` definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Settings of one natively implemented source, tagged by adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "adapter", rename_all = "snake_case")]
pub enum NativeSourceConfig {
    Jackett(JackettSourceConfig),
}

impl NativeSourceConfig {
    pub fn id(&self) -> &str {
        match self {
            NativeSourceConfig::Jackett(c) => &c.id,
        }
    }

    pub fn adapter(&self) -> &'static str {
        match self {
            NativeSourceConfig::Jackett(_) => "jackett",
        }
    }
}

/// A remote Jackett instance used as a source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettSourceConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Jackett server URL (e.g., "http://localhost:9117")
    pub url: String,
    /// Jackett API key
    pub api_key: String,
    /// Indexer to query through Jackett (default: "all")
    #[serde(default = "default_indexer")]
    pub indexer: String,
    #[serde(default = "default_jackett_kind")]
    pub kind: SourceKind,
}

fn default_indexer() -> String {
    "all".to_string()
}

fn default_jackett_kind() -> SourceKind {
    SourceKind::Aggregate
}

/// Stored settings of one source, keyed by source id
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceCredentialsConfig {
    pub id: String,
    /// Session cookie header to start from, skipping the first login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_link: Option<String>,
    /// Values substituted into the login form (`username`, `password`, ...).
    #[serde(default)]
    pub values: HashMap<String, String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub orchestrator: OrchestratorConfig,
    pub cache: CacheConfig,
    pub definitions: DefinitionsConfig,
    pub sources: Vec<SanitizedSourceConfig>,
    pub credentials: Vec<SanitizedCredentialsConfig>,
}

/// Sanitized native source (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourceConfig {
    pub adapter: String,
    pub id: String,
    pub url: String,
    pub api_key_configured: bool,
}

/// Sanitized credentials (only the value names are shown)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCredentialsConfig {
    pub id: String,
    pub keys: Vec<String>,
    pub cookie_configured: bool,
}

impl From<&SourceCredentialsConfig> for SanitizedCredentialsConfig {
    fn from(credentials: &SourceCredentialsConfig) -> Self {
        let mut keys: Vec<String> = credentials.values.keys().cloned().collect();
        keys.sort();
        Self {
            id: credentials.id.clone(),
            keys,
            cookie_configured: credentials
                .cookie_header
                .as_deref()
                .is_some_and(|c| !c.is_empty()),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            http: config.http.clone(),
            orchestrator: config.orchestrator.clone(),
            cache: config.cache.clone(),
            definitions: config.definitions.clone(),
            sources: config
                .sources
                .iter()
                .map(|s| match s {
                    NativeSourceConfig::Jackett(j) => SanitizedSourceConfig {
                        adapter: s.adapter().to_string(),
                        id: j.id.clone(),
                        url: j.url.clone(),
                        api_key_configured: !j.api_key.is_empty(),
                    },
                })
                .collect(),
            credentials: config.credentials.iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 9117);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.retry_attempts, 3);
        assert_eq!(config.http.retry_delay_ms, 500);
        assert_eq!(config.orchestrator.queryable_kinds, vec![SourceKind::Public]);
        assert!(config.orchestrator.source_timeout_secs.is_none());
        assert_eq!(config.cache.ttl_secs, 540);
        assert!(config.definitions.dir.is_none());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_deserialize_jackett_source() {
        let toml = r#"
[[sources]]
adapter = "jackett"
id = "local-jackett"
url = "http://localhost:9117"
api_key = "test-api-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let NativeSourceConfig::Jackett(jackett) = &config.sources[0];
        assert_eq!(jackett.url, "http://localhost:9117");
        assert_eq!(jackett.indexer, "all");
        assert_eq!(jackett.kind, SourceKind::Aggregate);
        assert_eq!(config.sources[0].id(), "local-jackett");
    }

    #[test]
    fn test_unknown_adapter_fails() {
        let toml = r#"
[[sources]]
adapter = "prowlarr"
id = "p"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_orchestrator_kinds() {
        let toml = r#"
[orchestrator]
queryable_kinds = ["public", "aggregate"]
source_timeout_secs = 20
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.orchestrator.queryable_kinds,
            vec![SourceKind::Public, SourceKind::Aggregate]
        );
        assert_eq!(config.orchestrator.source_timeout_secs, Some(20));
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            sources: vec![NativeSourceConfig::Jackett(JackettSourceConfig {
                id: "j".to_string(),
                name: None,
                url: "http://localhost:9117".to_string(),
                api_key: "secret-key".to_string(),
                indexer: "all".to_string(),
                kind: SourceKind::Aggregate,
            })],
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        let source = &sanitized.sources[0];
        assert_eq!(source.adapter, "jackett");
        assert!(source.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_deserialize_source_credentials() {
        let toml = r#"
[[credentials]]
id = "private"
cookie_header = "uid=1; pass=abc"
[credentials.values]
username = "me"
password = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let credentials = &config.credentials[0];
        assert_eq!(credentials.id, "private");
        assert_eq!(credentials.cookie_header.as_deref(), Some("uid=1; pass=abc"));
        assert_eq!(credentials.values.get("password").map(String::as_str), Some("secret"));
        assert!(credentials.site_link.is_none());
    }

    #[test]
    fn test_sanitized_config_hides_credential_values() {
        let config = Config {
            credentials: vec![SourceCredentialsConfig {
                id: "private".to_string(),
                cookie_header: Some("uid=1; pass=cookie-secret".to_string()),
                site_link: None,
                values: HashMap::from([
                    ("username".to_string(), "me".to_string()),
                    ("password".to_string(), "hunter2".to_string()),
                ]),
            }],
            ..Default::default()
        };

        let sanitized = SanitizedConfig::from(&config);
        let credentials = &sanitized.credentials[0];
        assert_eq!(credentials.keys, vec!["password", "username"]);
        assert!(credentials.cookie_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("cookie-secret"));
    }
}
