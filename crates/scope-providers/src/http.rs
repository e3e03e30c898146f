//! Shared HTTP plumbing for provider adapters

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use scope_core::{ConfigError, ProviderError};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("anomalyscope/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed into an error message
const MAX_ERROR_BODY: usize = 512;

/// Build the HTTP client shared by every adapter
///
/// # Errors
/// Returns `ConfigError::InvalidSetting` if the TLS backend cannot start
pub fn build_client(request_timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConfigError::invalid("http_client", e.to_string()))
}

/// Map a reqwest failure to a provider error
pub(crate) fn transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.is_decode() {
        ProviderError::MalformedResponse(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Map a non-success status to a provider error
#[must_use]
pub fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let message = truncate(body.trim(), MAX_ERROR_BODY);
    match status.as_u16() {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited {
            retry_after: retry_after(headers),
        },
        408 | 504 => ProviderError::Timeout,
        code => ProviderError::Http {
            status: code,
            message,
        },
    }
}

/// `Retry-After` in seconds; HTTP-date values are ignored
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Check the status and decode a JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &headers, &body));
    }

    let body = response.text().await.map_err(|e| transport_error(&e))?;
    serde_json::from_str(&body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
