//! Wire-level HTTP execution.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE, LOCATION, REFERER, SET_COOKIE};
use reqwest::{redirect, Client, Url};
use tracing::debug;

use crate::config::HttpConfig;

use super::{FetchError, FetchRequest, FetchResponse, Method};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Executes exactly one HTTP exchange.
///
/// Implementations must not follow redirects or keep cookies: both are the
/// [`SessionClient`](super::SessionClient)'s job.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };

        if let Some(cookies) = request.cookies.as_deref().filter(|c| !c.is_empty()) {
            builder = builder.header(COOKIE, cookies);
        }
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.method == Method::Post {
            builder = match &request.raw_body {
                Some(body) => builder.body(body.clone()),
                None => builder.form(&request.post_data),
            };
        }

        debug!(method = ?request.method, url = %url, "HTTP request");
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let cookies = set_cookie_header(response.headers());
        let redirect_target = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| url.join(location).ok())
            .map(|u| u.to_string());
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            body,
            cookies,
            redirect_target,
            url: url.to_string(),
            encoding: request.encoding,
        })
    }
}

/// Collapse every `Set-Cookie` header into `name=value; name2=value2`.
fn set_cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('='))
        .collect::<Vec<_>>()
        .join("; ")
}
