use reqwest::StatusCode;
use thiserror::Error;

/// Failures at the HTTP seam. Fetchers map every variant to their user-facing
/// message; the variant itself only reaches the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {status}")]
    Status { status: StatusCode },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(e)
        }
    }
}
