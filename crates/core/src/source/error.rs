use thiserror::Error;
use tracing::error;

use crate::http::FetchError;

/// Errors an adapter can raise from a query or download.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// The source itself is down or challenging us, as opposed to answering badly.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SourceError::Fetch(e) if e.is_unavailable())
    }

    /// Log a page that could not be parsed, raw content included, and wrap
    /// the cause.
    pub fn parse(source_id: &str, raw: &str, cause: impl std::fmt::Display) -> Self {
        error!(
            source = %source_id,
            error = %cause,
            raw = %raw,
            "Failed to parse response"
        );
        SourceError::Parse(cause.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::UnavailableReason;

    #[test]
    fn test_unreachable_only_for_unavailable_fetches() {
        let down = SourceError::from(FetchError::Unavailable {
            url: "https://a/".into(),
            status: 502,
            reason: UnavailableReason::Gateway(502),
        });
        assert!(down.is_unreachable());
        assert!(!SourceError::from(FetchError::Timeout).is_unreachable());
        assert!(!SourceError::Parse("bad json".into()).is_unreachable());
    }

    #[test]
    fn test_other_displays_message_verbatim() {
        assert_eq!(SourceError::Other("timeout".into()).to_string(), "timeout");
    }
}
