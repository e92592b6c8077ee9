// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing: client construction and status mapping.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use witness_core::WitnessError;

/// Builds a client with JSON defaults, an optional bearer token and a timeout.
pub(crate) fn build_client(
    token: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, WitnessError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| WitnessError::Config(format!("invalid bridge token header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| WitnessError::UpstreamApi {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Transport-level failure.
pub(crate) fn transport(e: reqwest::Error) -> WitnessError {
    WitnessError::UpstreamApi {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Passes successful responses through; maps 429 to `RateLimited` and any
/// other failure status to `UpstreamApi`.
pub(crate) async fn check_status(response: Response) -> Result<Response, WitnessError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(WitnessError::RateLimited {
            retry_after: retry_after(response.headers()),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(WitnessError::upstream(format!("upstream returned {status}: {body}")))
}

/// `Retry-After` in delta-seconds form.
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

/// Joins a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
