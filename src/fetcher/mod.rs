//! HTTP access to the location history endpoint
//!
//! The history API answers one request per time window with a CSV body. The
//! client here only deals with transport: authentication, retries with
//! exponential backoff, and splitting the streamed body into lines. What to do
//! with the lines (header handling, file output) belongs to
//! [`crate::downloader`].

pub mod history_http;

pub use history_http::{HistoryClient, WindowError, WindowStats};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-retryable HTTP status, or retries exhausted on a retryable one
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Token rejected by the API
    #[error("authentication failed with status {0}, check the TOKEN value")]
    AuthFailed(u16),

    /// Rate limit still exceeded after the last retry
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Connection, timeout or body read failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// The line sink refused a line
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for FetcherError {
    fn from(err: std::io::Error) -> Self {
        FetcherError::IoError(err.to_string())
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;
