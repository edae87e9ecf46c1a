//! Shared HTTP plumbing for provider clients.
//!
//! Completion and embedding clients both talk JSON over `reqwest`; this
//! module owns the client construction and the mapping from HTTP failures
//! to `AppError` so every provider classifies failures the same way.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use statute_core::{AppError, AppResult};

/// Build a `reqwest` client with a bounded request timeout.
pub fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport-level failure (connect, timeout, body read).
pub fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::upstream(format!("{} request timed out: {}", provider, err))
    } else {
        AppError::upstream(format!("Failed to reach {}: {}", provider, err))
    }
}

/// Read a success body and decode it as JSON.
///
/// Read failures are transport errors; a body that does not decode is a
/// non-retryable upstream error, since resending gets the same reply.
pub async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;
    decode_json(provider, &body)
}

/// Decode a response body, mapping failures to a fatal upstream error.
pub fn decode_json<T: DeserializeOwned>(provider: &str, body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|e| {
        AppError::upstream_fatal(format!("Malformed {} response: {}", provider, e))
    })
}

/// Map a non-success HTTP status.
///
/// 401/403 mean the operator must fix credentials, so they are
/// configuration errors. 408, 429 and 5xx are transient.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body.trim());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Config(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => AppError::upstream(message),
        s if s.is_server_error() => AppError::upstream(message),
        _ => AppError::upstream_fatal(message),
    }
}

/// Read an error body without failing the error path itself.
pub async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
