//! Shared HTTP plumbing for the Notion and SiYuan clients.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: token missing, invalid or not shared with the integration")]
    Unauthorized,

    #[error("Rate limited by the remote API")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// SiYuan answered 200 but with a non-zero envelope code.
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },
}

/// Convert a non-success status and its body into a `ClientError`.
pub(crate) fn status_error(status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        _ => ClientError::Server(format!("{}: {}", status, body)),
    }
}

/// Handle response, converting HTTP errors to ClientError.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Request failed with {}: {}", status, body);
        Err(status_error(status, body))
    }
}

/// Fixed delay applied after every API call.
///
/// This is the only rate limiting the migration does: calls are strictly
/// sequential and each one is followed by the same pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
