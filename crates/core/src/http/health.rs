//! Upstream health classification.

use super::{FetchError, FetchResponse, UnavailableReason};

/// Statuses CDNs and reverse proxies use when the origin is down.
const GATEWAY_STATUSES: &[u16] = &[502, 504, 521, 522, 523];

const LEGACY_CHALLENGE_MARKER: &str =
    "<span data-translate=\"complete_sec_check\">Please complete the security check to access</span>";
const INTERSTITIAL_MARKER: &str = "<title>Just a moment...</title>";

/// Classify a received response.
///
/// Returns `Some` when the response means "the site is unreachable" rather
/// than "the site answered".
pub fn classify(status: u16, body: &str) -> Option<UnavailableReason> {
    if GATEWAY_STATUSES.contains(&status) {
        return Some(UnavailableReason::Gateway(status));
    }
    let challenged = match status {
        403 => body.contains(LEGACY_CHALLENGE_MARKER) || body.contains(INTERSTITIAL_MARKER),
        503 => body.contains(INTERSTITIAL_MARKER),
        _ => false,
    };
    challenged.then_some(UnavailableReason::BotChallenge)
}

/// Turn an unreachable-classified response into a [`FetchError::Unavailable`].
pub fn check_upstream(response: &FetchResponse) -> Result<(), FetchError> {
    // Only decode bodies for the statuses that can carry a challenge page.
    let body = if matches!(response.status, 403 | 503) {
        response.text()
    } else {
        String::new()
    };
    match classify(response.status, &body) {
        Some(reason) => Err(FetchError::Unavailable {
            url: response.url.clone(),
            status: response.status,
            reason,
        }),
        None => Ok(()),
    }
}
