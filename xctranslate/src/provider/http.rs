//! HTTP plumbing shared by the backends.

use std::time::Duration;

use reqwest::{
    StatusCode,
    header::{HeaderMap, RETRY_AFTER},
};

use super::ProviderError;
use crate::error::Error;

const USER_AGENT: &str = concat!("xctranslate/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::Provider(format!("failed to build HTTP client: {}", e)))
}

/// Seconds form of the `Retry-After` header. HTTP dates are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Maps a non-success status to a provider error.
pub(crate) fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> ProviderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), snippet(body));
    match status.as_u16() {
        429 => ProviderError::Throttled {
            retry_after: retry_after(headers),
        },
        // DeepL's "quota exceeded"
        456 => ProviderError::QuotaExceeded(detail),
        408 => ProviderError::Transient(detail),
        code if code >= 500 => ProviderError::Transient(detail),
        _ => ProviderError::Rejected(detail),
    }
}

/// Transport-level failures (timeouts, DNS, resets) are always worth a retry.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transient(format!("request timed out: {}", err))
    } else {
        ProviderError::Transient(err.to_string())
    }
}

pub(crate) fn malformed(what: &str, detail: impl std::fmt::Display) -> ProviderError {
    ProviderError::Transient(format!("malformed {} response: {}", what, detail))
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
