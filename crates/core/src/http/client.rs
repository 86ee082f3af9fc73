//! Session-aware fetch client.
//!
//! Every adapter owns one [`SessionClient`]. It threads the adapter's cookie
//! header through requests, follows redirects by hand so cookies set on
//! intermediate hops are not lost, retries transport failures, and classifies
//! gateway/bot-challenge responses as "source unreachable".

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::HttpConfig;
use crate::metrics;

use super::cookies::resolve_cookies;
use super::health::check_upstream;
use super::{
    Encoding, FetchError, FetchRequest, FetchResponse, HttpTransport, NoopObserver,
    SessionObserver, SessionState,
};

/// Maximum number of redirect hops followed before giving up silently.
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Bounded retry with a fixed inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// A login POST followed by its redirect chain.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub url: String,
    pub form: Vec<(String, String)>,
    /// Cookies sent with the POST. Defaults to none, not the session's.
    pub cookies: Option<String>,
    pub referer: Option<String>,
    /// Fixed target for every redirect hop instead of the `Location` header.
    pub redirect_override: Option<String>,
    /// Also keep the cookies set by the POST response itself.
    pub return_first_call_cookies: bool,
    pub accumulate_cookies: bool,
}

pub struct SessionClient {
    source_id: String,
    transport: Arc<dyn HttpTransport>,
    session: SessionState,
    observer: Arc<dyn SessionObserver>,
    retry: RetryPolicy,
    encoding: Encoding,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("source_id", &self.source_id)
            .field("retry", &self.retry)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    pub fn new(source_id: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            source_id: source_id.into(),
            transport,
            session: SessionState::new(),
            observer: Arc::new(NoopObserver),
            retry: RetryPolicy::default(),
            encoding: Encoding::default(),
        }
    }

    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// GET request pre-filled with this source's encoding.
    pub fn get_request(&self, url: impl Into<String>) -> FetchRequest {
        FetchRequest::get(url).with_encoding(self.encoding)
    }

    /// POST request pre-filled with this source's encoding.
    pub fn post_request(&self, url: impl Into<String>, form: Vec<(String, String)>) -> FetchRequest {
        FetchRequest::post(url, form).with_encoding(self.encoding)
    }

    /// Execute one request.
    ///
    /// Without an explicit cookie override the session's header is sent.
    /// Cookies set by the response are merged into the session.
    pub async fn fetch(&self, mut request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let cookie_override = request.cookies.clone();
        if request.cookies.is_none() {
            request.cookies = Some(self.session.cookie_header().await);
        }

        metrics::FETCH_ATTEMPTS
            .with_label_values(&[self.source_id.as_str()])
            .inc();
        debug!(source = %self.source_id, url = %request.url, "Fetching");

        let response = self.transport.execute(&request).await?;
        check_upstream(&response)?;
        self.update_cookie_header(cookie_override.as_deref(), &response.cookies)
            .await;
        Ok(response)
    }

    /// [`fetch`](Self::fetch) with bounded retry on transport failures.
    ///
    /// A received response is never retried, whatever its status.
    pub async fn fetch_with_retry(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.fetch(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    warn!(
                        source = %self.source_id,
                        url = %request.url,
                        attempt,
                        attempts,
                        error = %e,
                        "Request failed"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        metrics::FETCH_RETRIES
                            .with_label_values(&[self.source_id.as_str()])
                            .inc();
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Transport("no attempt was made".to_string())))
    }

    /// Follow up to [`MAX_REDIRECT_HOPS`] redirects starting from `response`.
    ///
    /// With `accumulate` set, cookies from every hop are merged into the
    /// session and into the returned response. Otherwise the returned
    /// response carries only the last hop's cookies (or the override when
    /// the last hop set none). Running out of hops is not an error: the last
    /// response is returned and may still be a redirect.
    pub async fn follow_redirects(
        &self,
        mut response: FetchResponse,
        referer: Option<&str>,
        redirect_override: Option<&str>,
        cookie_override: Option<String>,
        accumulate: bool,
    ) -> Result<FetchResponse, FetchError> {
        let mut cookie_override = cookie_override;

        for hop in 0..MAX_REDIRECT_HOPS {
            if !response.is_redirect() {
                break;
            }
            let target = match redirect_override {
                Some(url) => url.to_string(),
                None => response.redirect_target.clone().unwrap_or_default(),
            };

            let hop_cookies = if accumulate {
                let session = self.session.cookie_header().await;
                resolve_cookies([session.as_str(), cookie_override.as_deref().unwrap_or("")])
            } else {
                cookie_override.clone().unwrap_or_default()
            };

            let mut request = FetchRequest::get(target)
                .with_cookies(hop_cookies)
                .with_encoding(response.encoding);
            if let Some(referer) = referer {
                request = request.with_referer(referer);
            }

            debug!(source = %self.source_id, hop = hop + 1, url = %request.url, "Following redirect");
            response = self.transport.execute(&request).await?;
            check_upstream(&response)?;

            if accumulate {
                let session = self.session.cookie_header().await;
                let merged = resolve_cookies([
                    session.as_str(),
                    cookie_override.as_deref().unwrap_or(""),
                    response.cookies.as_str(),
                ]);
                self.set_cookie_header(&merged).await;
                cookie_override = Some(merged.clone());
                response.cookies = merged;
            }

            if let Some(cookies) = &cookie_override {
                if response.cookies.is_empty() {
                    response.cookies = cookies.clone();
                }
            }
        }

        if response.is_redirect() {
            debug!(
                source = %self.source_id,
                url = %response.url,
                "Redirect limit reached, returning last response"
            );
        }
        Ok(response)
    }

    /// POST a login form and follow the resulting redirect chain.
    pub async fn login(&self, login: LoginRequest) -> Result<FetchResponse, FetchError> {
        let sent_cookies = login.cookies.clone().unwrap_or_default();
        let mut request = self
            .post_request(login.url.clone(), login.form)
            .with_cookies(sent_cookies.clone());
        if let Some(referer) = &login.referer {
            request = request.with_referer(referer.clone());
        }

        let mut response = self.transport.execute(&request).await?;
        check_upstream(&response)?;

        if login.accumulate_cookies {
            let session = self.session.cookie_header().await;
            response.cookies =
                resolve_cookies([session.as_str(), sent_cookies.as_str(), response.cookies.as_str()]);
        }
        let first_call_cookies = response.cookies.clone();

        if response.is_redirect() {
            let cookies = response.cookies.clone();
            response = self
                .follow_redirects(
                    response,
                    Some(login.url.as_str()),
                    login.redirect_override.as_deref(),
                    Some(cookies),
                    login.accumulate_cookies,
                )
                .await?;
        }

        if login.return_first_call_cookies {
            let session = self.session.cookie_header().await;
            let later = if login.accumulate_cookies {
                response.cookies.as_str()
            } else {
                ""
            };
            response.cookies =
                resolve_cookies([session.as_str(), first_call_cookies.as_str(), later]);
        }

        Ok(response)
    }

    /// Fetch a downloadable payload.
    ///
    /// Magnet links are returned as their own bytes without a request.
    pub async fn download(&self, link: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        if link.starts_with("magnet:") {
            return Ok(link.as_bytes().to_vec());
        }

        let url = link
            .replace('(', "%28")
            .replace(')', "%29")
            .replace('\'', "%27");
        let request = self
            .get_request(url.clone())
            .with_referer(referer.unwrap_or(&url).to_string());

        let mut response = self.fetch_with_retry(request).await?;
        if response.is_redirect() {
            response = self
                .follow_redirects(response, None, None, None, false)
                .await?;
        }

        if !matches!(response.status, 200 | 100 | 206) {
            error!(
                source = %self.source_id,
                url = %url,
                status = response.status,
                "Download failed"
            );
            return Err(FetchError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }
        Ok(response.body)
    }

    /// Merge the session header, the request's override and the response's
    /// cookies; persist the result if it changed.
    async fn update_cookie_header(&self, cookie_override: Option<&str>, response_cookies: &str) {
        if response_cookies.is_empty() && cookie_override.is_none() {
            return;
        }
        let session = self.session.cookie_header().await;
        let merged = resolve_cookies([
            session.as_str(),
            cookie_override.unwrap_or(""),
            response_cookies,
        ]);
        self.set_cookie_header(&merged).await;
    }

    /// Replace the session cookie header, notifying the observer on change.
    pub async fn set_cookie_header(&self, cookie_header: &str) {
        if self.session.replace_cookie_header(cookie_header).await {
            debug!(source = %self.source_id, "Session cookies changed");
            self.observer
                .on_session_cookie_changed(&self.source_id, cookie_header);
        }
    }
}
