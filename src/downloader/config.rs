//! Download configuration constants

use secrecy::SecretString;
use std::time::Duration;

/// History endpoint of the location API.
pub const HISTORY_URL: &str = "https://dnaspaces.io/api/location/v1/history";

/// Maximum number of retries for a failed window request.
pub const MAX_RETRIES: u32 = 5;

/// Upper bound accepted for `--max-retries`.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Base request timeout. Attempt `n` (0-based) waits `(n + 1)` times as long.
/// A full day of history can take a while before the first byte arrives.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    backoff_from(Duration::from_millis(INITIAL_BACKOFF_MS), retry_count)
}

/// Exponential backoff starting at `initial`, capped at [`MAX_BACKOFF_MS`].
pub fn backoff_from(initial: Duration, retry_count: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry_count);
    initial
        .saturating_mul(factor)
        .min(Duration::from_millis(MAX_BACKOFF_MS))
}

/// Timeout for a given attempt (0-based).
pub fn request_timeout(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.saturating_add(1))
}

/// Connection settings for the history API.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Bearer token
    pub token: SecretString,
    /// Endpoint URL
    pub endpoint: String,
    /// Retries per window after the first attempt
    pub max_retries: u32,
    /// Timeout of the first attempt
    pub base_timeout: Duration,
}

impl HistoryConfig {
    /// Settings for the public endpoint with default retries and timeout.
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            endpoint: HISTORY_URL.to_string(),
            max_retries: MAX_RETRIES,
            base_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Use a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the retry count, clamped to [`MAX_RETRIES_LIMIT`].
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(MAX_RETRIES_LIMIT);
        self
    }

    /// Set the timeout of the first attempt.
    pub fn with_base_timeout(mut self, timeout: Duration) -> Self {
        self.base_timeout = timeout;
        self
    }
}
