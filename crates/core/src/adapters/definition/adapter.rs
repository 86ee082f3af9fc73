use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::http::{FetchError, FetchRequest, FetchResponse, LoginRequest, Method, SessionClient};
use crate::registry::{AdapterContext, DefinitionInterpreter, RegistryError};
use crate::source::{Query, ResultCache, ResultItem, Source, SourceAdapter, SourceError};

use super::extract::{as_f64, as_text, as_u32, parse_date, parse_size, value_at};
use super::{Definition, ResponseFields};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder regex"));

/// Generic adapter driven by a [`Definition`].
pub struct DefinitionAdapter {
    source: Source,
    definition: Definition,
    client: SessionClient,
    cache: ResultCache,
    credentials: HashMap<String, String>,
    login_lock: Mutex<()>,
}

impl DefinitionAdapter {
    pub fn new(definition: Definition, ctx: &AdapterContext) -> Result<Self, RegistryError> {
        let stored = ctx.stored_settings(&definition.id);
        let site_link = stored
            .site_link
            .clone()
            .or_else(|| definition.links.first().cloned())
            .ok_or_else(|| RegistryError::Construction {
                id: definition.id.clone(),
                reason: "no site link".to_string(),
            })?;
        let site_link = normalize_site_link(&site_link).map_err(|reason| {
            RegistryError::Construction {
                id: definition.id.clone(),
                reason,
            }
        })?;

        let source = Source {
            id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            kind: definition.kind,
            site_link,
            caps: definition.caps.modes.clone(),
            categories: definition.category_mapper(),
        };
        let client = ctx.session_client(&definition.id, definition.encoding);
        let cache = ctx.result_cache();

        Ok(Self {
            source,
            definition,
            client,
            cache,
            credentials: stored.credentials,
            login_lock: Mutex::new(()),
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        Url::parse(&self.source.site_link)
            .and_then(|base| base.join(path))
            .map_err(|e| FetchError::InvalidUrl(format!("{}{}: {}", self.source.site_link, path, e)))
    }

    /// Log in unless the session already holds cookies.
    async fn ensure_logged_in(&self) -> Result<(), SourceError> {
        if self.definition.login.is_none() {
            return Ok(());
        }
        let _guard = self.login_lock.lock().await;
        if self.client.session().is_logged_in().await {
            return Ok(());
        }
        self.login().await
    }

    async fn login(&self) -> Result<(), SourceError> {
        let Some(block) = &self.definition.login else {
            return Ok(());
        };
        let url = self.url_for(&block.path)?.to_string();

        let mut form = Vec::with_capacity(block.form.len());
        for (name, template) in &block.form {
            let value = render(template, |key| self.credentials.get(key).cloned())
                .map_err(|missing| SourceError::Login(format!("missing credential '{}'", missing)))?;
            form.push((name.clone(), value));
        }

        info!(source = %self.source.id, "Logging in");
        let response = self
            .client
            .login(LoginRequest {
                url: url.clone(),
                form,
                referer: Some(url),
                return_first_call_cookies: true,
                accumulate_cookies: true,
                ..Default::default()
            })
            .await?;

        let session = self.client.session();
        if let Some(marker) = &block.failure_marker {
            if response.text().contains(marker.as_str()) {
                return Err(SourceError::Login("the site rejected the credentials".to_string()));
            }
        }
        if response.cookies.is_empty() {
            return Err(SourceError::Login("no session cookie returned".to_string()));
        }

        self.client.set_cookie_header(&response.cookies).await;
        session.set_logged_in(true).await;
        Ok(())
    }

    fn search_request(&self, query: &Query) -> Result<FetchRequest, SourceError> {
        let search = &self.definition.search;
        let tokens = self.source.categories.to_source_tokens(&query.categories);

        let mut params = Vec::with_capacity(search.params.len());
        for (name, template) in &search.params {
            let value = render(template, |key| match key {
                "term" | "keywords" => Some(query.search_string()),
                "categories" => Some(tokens.join(&search.category_separator)),
                "imdb" => Some(query.imdb_id.clone().unwrap_or_default()),
                "season" => Some(query.season.map(|s| s.to_string()).unwrap_or_default()),
                "episode" => Some(query.episode.clone().unwrap_or_default()),
                _ => None,
            })
            .map_err(|unknown| {
                SourceError::Unsupported(format!("unknown search placeholder '{}'", unknown))
            })?;
            if !value.is_empty() {
                params.push((name.clone(), value));
            }
        }

        let url = self.url_for(&search.path)?;
        let request = match search.method {
            Method::Get => {
                let url = Url::parse_with_params(url.as_str(), &params)
                    .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
                self.client.get_request(url.to_string())
            }
            Method::Post => self.client.post_request(url.to_string(), params),
        };
        Ok(request)
    }

    fn is_login_redirect(&self, response: &FetchResponse) -> bool {
        let Some(block) = &self.definition.login else {
            return false;
        };
        response.is_redirect()
            && response
                .redirect_target
                .as_deref()
                .is_some_and(|target| target.contains(block.path.trim_start_matches('/')))
    }

    async fn fetch_search_page(&self, request: FetchRequest) -> Result<FetchResponse, SourceError> {
        let mut response = self.client.fetch_with_retry(request.clone()).await?;

        if self.is_login_redirect(&response) {
            warn!(source = %self.source.id, "Session expired, logging in again");
            self.client.session().reset().await;
            {
                let _guard = self.login_lock.lock().await;
                self.login().await?;
            }
            response = self.client.fetch_with_retry(request.clone()).await?;
            if self.is_login_redirect(&response) {
                return Err(SourceError::Login(
                    "still redirected to the login page after logging in".to_string(),
                ));
            }
        }

        if response.is_redirect() {
            response = self
                .client
                .follow_redirects(response, Some(request.url.as_str()), None, None, true)
                .await?;
        }
        Ok(response)
    }

    fn parse_results(&self, body: &str) -> Result<Vec<ResultItem>, SourceError> {
        let fields = &self.definition.search.response;
        let document: Value =
            serde_json::from_str(body).map_err(|e| SourceError::parse(&self.source.id, body, e))?;

        let rows = match value_at(&document, &fields.results) {
            Some(Value::Array(rows)) => rows,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(SourceError::parse(
                    &self.source.id,
                    body,
                    format!("'{}' is not an array", fields.results),
                ))
            }
        };

        let items: Vec<ResultItem> = rows.iter().filter_map(|row| self.parse_row(row, fields)).collect();
        if items.len() < rows.len() {
            debug!(
                source = %self.source.id,
                skipped = rows.len() - items.len(),
                "Skipped rows without title or link"
            );
        }
        Ok(items)
    }

    fn parse_row(&self, row: &Value, fields: &ResponseFields) -> Option<ResultItem> {
        let get = |path: &Option<String>| path.as_deref().and_then(|p| value_at(row, p));
        let text = |path: &Option<String>| get(path).and_then(as_text);

        let title = value_at(row, &fields.title).and_then(as_text)?;
        let link = text(&fields.link).map(|l| self.absolute(&l));
        let magnet_uri = text(&fields.magnet);
        if link.is_none() && magnet_uri.is_none() {
            return None;
        }

        let seeders = get(&fields.seeders).and_then(as_u32);
        let leechers = get(&fields.leechers).and_then(as_u32);
        let peers = match (seeders, leechers) {
            (Some(s), Some(l)) => Some(s.saturating_add(l)),
            (s, l) => s.or(l),
        };

        let mut categories: Vec<u32> = match text(&fields.category) {
            Some(token) => {
                let ids = self.source.categories.to_universal_categories(&token);
                let ids = if ids.is_empty() {
                    self.source.categories.to_universal_from_description(&token)
                } else {
                    ids
                };
                ids.into_iter().collect()
            }
            None => Vec::new(),
        };
        categories.sort_unstable();

        Some(ResultItem {
            title,
            link,
            details: text(&fields.details).map(|d| self.absolute(&d)),
            magnet_uri,
            info_hash: text(&fields.info_hash).map(|h| h.to_lowercase()),
            size_bytes: get(&fields.size).and_then(parse_size).unwrap_or(0),
            seeders,
            peers,
            grabs: get(&fields.grabs).and_then(as_u32),
            files: None,
            publish_date: get(&fields.date).and_then(parse_date).unwrap_or_else(Utc::now),
            categories,
            minimum_ratio: None,
            minimum_seed_time: None,
            download_volume_factor: get(&fields.download_volume_factor).and_then(as_f64),
            upload_volume_factor: get(&fields.upload_volume_factor).and_then(as_f64),
        })
    }

    /// Resolve a site-relative link.
    fn absolute(&self, link: &str) -> String {
        if link.starts_with("magnet:") {
            return link.to_string();
        }
        self.url_for(link)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string())
    }
}

#[async_trait]
impl SourceAdapter for DefinitionAdapter {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn results_for_query(&self, query: &Query) -> Result<Vec<ResultItem>, SourceError> {
        if let Some(cached) = self.cache.get(query).await {
            debug!(source = %self.source.id, results = cached.len(), "Cache hit");
            return Ok(cached);
        }

        self.ensure_logged_in().await?;
        let request = self.search_request(query)?;
        let response = self.fetch_search_page(request).await?;
        let body = response.text();

        if !response.is_success() {
            return Err(SourceError::Other(format!(
                "HTTP {}: {}",
                response.status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let items = self.parse_results(&body)?;
        debug!(source = %self.source.id, results = items.len(), "Search complete");
        self.cache.insert(query, items.clone()).await;
        Ok(items)
    }

    async fn download(&self, link: &str) -> Result<Vec<u8>, SourceError> {
        self.ensure_logged_in().await?;
        let referer = self.source.site_link.clone();
        Ok(self.client.download(link, Some(&referer)).await?)
    }
}

/// Interprets TOML definitions into [`DefinitionAdapter`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlDefinitionInterpreter;

impl DefinitionInterpreter for TomlDefinitionInterpreter {
    fn interpret(
        &self,
        raw: &str,
        ctx: &AdapterContext,
    ) -> Result<Arc<dyn SourceAdapter>, RegistryError> {
        let definition = Definition::parse(raw)?;
        Ok(Arc::new(DefinitionAdapter::new(definition, ctx)?))
    }
}

/// Expand `{{name}}` placeholders. Fails with the first unresolved name.
fn render(template: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = lookup(name.as_str()).ok_or_else(|| name.as_str().to_string())?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn normalize_site_link(link: &str) -> Result<String, String> {
    let mut url = Url::parse(link.trim()).map_err(|e| format!("invalid site link '{}': {}", link, e))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::taxonomy::MOVIES;
    use crate::config::SourceCredentialsConfig;
    use crate::http::Method;
    use crate::source::{InMemorySettingsStore, SettingsStore, StoredSettings};
    use crate::testing::{fixtures, MockTransport};

    const PRIVATE_DEFINITION: &str = r#"
id = "private"
name = "Private"
kind = "private"
links = ["https://private.example"]

[[caps.categories]]
token = "1"
category = 2000
description = "Movies"

[login]
path = "login.php"
failure_marker = "Invalid login"
[login.form]
username = "{{username}}"
password = "{{password}}"

[search]
path = "api/search"
[search.params]
q = "{{term}}"
[search.response]
results = "data"
title = "name"
link = "download"
"#;

    fn public_adapter(transport: Arc<MockTransport>) -> DefinitionAdapter {
        let ctx = fixtures::adapter_context(transport);
        let definition = Definition::parse(&fixtures::definition_toml("site")).unwrap();
        DefinitionAdapter::new(definition, &ctx).unwrap()
    }

    fn private_adapter(
        transport: Arc<MockTransport>,
        credentials: &[(&str, &str)],
    ) -> (DefinitionAdapter, Arc<InMemorySettingsStore>) {
        let store = Arc::new(InMemorySettingsStore::new());
        store.save(
            "private",
            StoredSettings {
                credentials: credentials
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            },
        );
        let ctx = fixtures::adapter_context(transport).with_settings(store.clone());
        let definition = Definition::parse(PRIVATE_DEFINITION).unwrap();
        (DefinitionAdapter::new(definition, &ctx).unwrap(), store)
    }

    #[tokio::test]
    async fn test_search_builds_request_and_parses_rows() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(MockTransport::ok(
            r#"{"data":[
                {"name":"Movie A","download":"/dl/1","size":"2 KB","seeders":"5","leechers":3,
                 "added":1700000000,"category":"1"},
                {"name":"No Link"}
            ]}"#,
        ));
        let adapter = public_adapter(transport.clone());

        let items = adapter
            .results_for_query(&Query::search("movie").with_categories(vec![MOVIES]))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Get);
        assert_eq!(requests[0].url, "https://site.example/api/search?cat=1&q=movie");

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.title, "Movie A");
        assert_eq!(item.link.as_deref(), Some("https://site.example/dl/1"));
        assert_eq!(item.size_bytes, 2048);
        assert_eq!(item.seeders, Some(5));
        assert_eq!(item.peers, Some(8));
        assert_eq!(item.categories, vec![MOVIES]);
        assert_eq!(item.publish_date.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_empty_placeholders_are_dropped() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(MockTransport::ok(r#"{"data":[]}"#));
        let adapter = public_adapter(transport.clone());

        let items = adapter
            .results_for_query(&Query::search("x"))
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(transport.requests()[0].url, "https://site.example/api/search?q=x");
    }

    #[tokio::test]
    async fn test_login_before_first_search() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(
            MockTransport::redirect("https://private.example/index.php")
                .with_cookies("uid=1; pass=abc"),
        );
        transport.push_response(MockTransport::ok("welcome back"));
        transport.push_response(MockTransport::ok(
            r#"{"data":[{"name":"Hidden Gem","download":"/dl/9"}]}"#,
        ));
        let (adapter, store) =
            private_adapter(transport.clone(), &[("username", "me"), ("password", "secret")]);

        let items = adapter
            .results_for_query(&Query::search("gem"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://private.example/login.php");
        assert!(requests[0]
            .post_data
            .contains(&("username".to_string(), "me".to_string())));
        let search_cookies = requests[2].cookies.clone().unwrap_or_default();
        assert!(search_cookies.contains("uid=1"));
        assert!(search_cookies.contains("pass=abc"));

        assert!(adapter.client.session().is_logged_in().await);
        let persisted = store.load("private").unwrap();
        assert!(persisted.cookie_header.contains("uid=1"));
        assert_eq!(persisted.credentials.get("username").map(String::as_str), Some("me"));
    }

    #[tokio::test]
    async fn test_login_failure_marker() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(MockTransport::ok("Invalid login, try again").with_cookies("tmp=1"));
        let (adapter, _) =
            private_adapter(transport.clone(), &[("username", "me"), ("password", "wrong")]);

        let err = adapter
            .results_for_query(&Query::search("gem"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Login(_)));
        assert!(!adapter.client.session().is_logged_in().await);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_configured_credentials_reach_login_form() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(MockTransport::ok("welcome").with_cookies("uid=7"));
        transport.push_response(MockTransport::ok(r#"{"data":[]}"#));
        let store = Arc::new(InMemorySettingsStore::from_config(&[SourceCredentialsConfig {
            id: "private".to_string(),
            values: HashMap::from([
                ("username".to_string(), "cfg-user".to_string()),
                ("password".to_string(), "cfg-pass".to_string()),
            ]),
            ..Default::default()
        }]));
        let ctx = fixtures::adapter_context(transport.clone()).with_settings(store);
        let adapter =
            DefinitionAdapter::new(Definition::parse(PRIVATE_DEFINITION).unwrap(), &ctx).unwrap();

        adapter.results_for_query(&Query::search("gem")).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, "https://private.example/login.php");
        assert!(requests[0]
            .post_data
            .contains(&("password".to_string(), "cfg-pass".to_string())));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let transport = Arc::new(MockTransport::new());
        let (adapter, _) = private_adapter(transport.clone(), &[("username", "me")]);

        let err = adapter
            .results_for_query(&Query::search("gem"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "login failed: missing credential 'password'");
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_render_placeholders() {
        let rendered = render("{{ term }} in {{cat}}", |key| match key {
            "term" => Some("foo".to_string()),
            "cat" => Some("1,2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(rendered, "foo in 1,2");
        assert_eq!(render("plain", |_| None).unwrap(), "plain");
        assert_eq!(render("{{nope}}", |_| None).unwrap_err(), "nope");
    }

    #[test]
    fn test_normalize_site_link() {
        assert_eq!(normalize_site_link("https://a.org").unwrap(), "https://a.org/");
        assert_eq!(normalize_site_link("https://a.org/tracker").unwrap(), "https://a.org/tracker/");
        assert!(normalize_site_link("not a url").is_err());
    }
}
