//! Error types for the session fetch layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a source was classified as unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "status", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Gateway-family status (502, 504, 521, 522, 523).
    Gateway(u16),
    /// An anti-bot interstitial was served instead of content.
    BotChallenge,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableReason::Gateway(status) => {
                write!(f, "gateway error {} - the site seems to be down", status)
            }
            UnavailableReason::BotChallenge => {
                write!(f, "the page is protected by an anti-bot challenge")
            }
        }
    }
}

/// Errors produced by the fetch layer.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection, TLS, or protocol failure before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// A response arrived but says the upstream site is unreachable.
    #[error("source unreachable: request to {url} failed ({reason})")]
    Unavailable {
        url: String,
        status: u16,
        reason: UnavailableReason,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("remote server returned {status} for {url}")]
    UnexpectedStatus { url: String, status: u16 },
}

impl FetchError {
    /// Only failures that happened before a response arrived are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Timeout)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FetchError::Unavailable { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}
