//! Shared request handling for the Stats API clients.

use std::time::Duration;

use preview_core::{
    FailureReason, ProviderFailure, ProviderKind, ProviderResult, parse_retry_after,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tracing::debug;

/// User agent for HTTP requests.
const USER_AGENT: &str = concat!("game-preview/", env!("CARGO_PKG_VERSION"));

/// Transport-level timeout; the retry policy usually cuts an attempt off first.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Issues a GET and decodes the JSON body, classifying every failure.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: ProviderKind,
    url: &str,
) -> ProviderResult<T> {
    debug!(provider = %provider, "MLB request: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| send_failure(provider, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(status_failure(provider, status, response.headers()));
    }

    let text = response
        .text()
        .await
        .map_err(|e| send_failure(provider, &e))?;
    serde_json::from_str(&text)
        .map_err(|e| ProviderFailure::new(provider, FailureReason::Malformed(e.to_string())))
}

pub(crate) fn send_failure(provider: ProviderKind, error: &reqwest::Error) -> ProviderFailure {
    let reason = if error.is_timeout() {
        FailureReason::Timeout(REQUEST_TIMEOUT)
    } else if error.is_decode() {
        FailureReason::Malformed(error.to_string())
    } else {
        FailureReason::Network(error.to_string())
    };
    ProviderFailure::new(provider, reason)
}

/// Classifies a non-success response, keeping any `Retry-After` hint.
pub(crate) fn status_failure(
    provider: ProviderKind,
    status: StatusCode,
    headers: &HeaderMap,
) -> ProviderFailure {
    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    ProviderFailure::new(
        provider,
        FailureReason::from_http_status(status.as_u16(), retry_after),
    )
}
