//! Session fetch layer shared by every source adapter.

mod client;
mod cookies;
mod error;
mod health;
mod session;
mod transport;
mod types;

pub use client::{LoginRequest, RetryPolicy, SessionClient, MAX_REDIRECT_HOPS};
pub use cookies::{resolve_cookies, CookieJar, STRIPPED_COOKIES};
pub use error::{FetchError, UnavailableReason};
pub use health::{check_upstream, classify};
pub use session::{NoopObserver, SessionObserver, SessionState};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{Encoding, FetchRequest, FetchResponse, Method};
