//! Per-source session state.

use tokio::sync::RwLock;

/// Notified whenever a source's cookie header changes, so it can be persisted.
pub trait SessionObserver: Send + Sync {
    fn on_session_cookie_changed(&self, source_id: &str, cookie_header: &str);
}

/// Observer that ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_session_cookie_changed(&self, _source_id: &str, _cookie_header: &str) {}
}

#[derive(Debug, Default)]
struct SessionInner {
    cookie_header: String,
    logged_in: bool,
}

/// Cookie jar and liveness of one source.
///
/// Owned by exactly one [`SessionClient`](super::SessionClient); deliberately
/// not `Clone`.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<SessionInner>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the session from a persisted cookie header.
    pub fn with_cookie_header(cookie_header: impl Into<String>) -> Self {
        let cookie_header = cookie_header.into();
        let logged_in = !cookie_header.is_empty();
        Self {
            inner: RwLock::new(SessionInner {
                cookie_header,
                logged_in,
            }),
        }
    }

    pub async fn cookie_header(&self) -> String {
        self.inner.read().await.cookie_header.clone()
    }

    /// Replace the cookie header. Returns `true` if it changed.
    pub(crate) async fn replace_cookie_header(&self, cookie_header: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.cookie_header == cookie_header {
            return false;
        }
        inner.cookie_header = cookie_header.to_string();
        true
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.read().await.logged_in
    }

    pub async fn set_logged_in(&self, logged_in: bool) {
        self.inner.write().await.logged_in = logged_in;
    }

    /// Forget cookies and login state.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.cookie_header.clear();
        inner.logged_in = false;
    }
}
