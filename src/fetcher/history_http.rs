//! Location history HTTP client
//!
//! One GET per window with `startTime`/`endTime` as epoch milliseconds and a
//! bearer token. Failures before the body starts (network errors, 429, 5xx) are
//! retried with exponential backoff and a timeout that grows with each attempt.
//! Once lines have been handed to the sink the window is not retried, since a
//! second attempt would duplicate them.

use crate::convert::to_epoch_millis;
use crate::downloader::config::{backoff_from, request_timeout, HistoryConfig, INITIAL_BACKOFF_MS};
use crate::fetcher::{FetcherError, FetcherResult};
use crate::range::TimeInterval;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one window request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    /// Lines handed to the sink, header included
    pub lines: u64,
    /// HTTP requests sent for the window
    pub attempts: u32,
}

impl WindowStats {
    /// Requests beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// A window that could not be fetched.
#[derive(Debug, thiserror::Error)]
#[error("{error} (after {attempts} requests)")]
pub struct WindowError {
    /// Why the window failed
    pub error: FetcherError,
    /// HTTP requests sent for the window before giving up
    pub attempts: u32,
}

/// HTTP client for the history endpoint
pub struct HistoryClient {
    client: Client,
    endpoint: String,
    token: SecretString,
    max_retries: u32,
    base_timeout: Duration,
    initial_backoff: Duration,
}

impl HistoryClient {
    /// Create a client from connection settings.
    pub fn new(client: Client, config: &HistoryConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            max_retries: config.max_retries,
            base_timeout: config.base_timeout,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first backoff delay.
    pub fn with_initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one window and feed every non-empty body line to `sink`.
    ///
    /// Line terminators (`\n` or `\r\n`) are stripped. Returns the number of
    /// lines delivered and the number of requests it took. On failure the
    /// request count is carried in the [`WindowError`].
    pub async fn fetch_window<F>(
        &self,
        window: &TimeInterval,
        mut sink: F,
    ) -> Result<WindowStats, WindowError>
    where
        F: FnMut(&str) -> std::io::Result<()>,
    {
        let (response, attempts) = self.request_with_retry(window).await?;
        let lines = stream_lines(response, &mut sink)
            .await
            .map_err(|error| WindowError { error, attempts })?;

        debug!(
            start = %window.start,
            end = %window.end,
            lines,
            attempts,
            "Window fetched"
        );
        Ok(WindowStats { lines, attempts })
    }

    /// Send the window request until a successful status arrives.
    async fn request_with_retry(
        &self,
        window: &TimeInterval,
    ) -> Result<(Response, u32), WindowError> {
        let params = [
            ("startTime", to_epoch_millis(&window.start).to_string()),
            ("endTime", to_epoch_millis(&window.end).to_string()),
        ];
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 0..=self.max_retries {
            attempts = attempt + 1;
            let timeout = request_timeout(self.base_timeout, attempt);
            info!(
                "Requesting history {} to {} (attempt {}/{})",
                window.start,
                window.end,
                attempt + 1,
                self.max_retries + 1
            );

            let result = self
                .client
                .get(&self.endpoint)
                .query(&params)
                .bearer_auth(self.token.expose_secret())
                .timeout(timeout)
                .send()
                .await;

            let response = match result {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_error = Some(FetcherError::NetworkError(e.to_string()));
                    if attempt < self.max_retries {
                        self.backoff(attempt).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Rate limit error (429) on attempt {}/{}",
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(FetcherError::RateLimitExceeded);
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            if status.is_server_error() {
                warn!(
                    "Server error {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    self.max_retries + 1
                );
                last_error = Some(FetcherError::HttpError(format!("Server error: {}", status)));
                if attempt < self.max_retries {
                    self.backoff(attempt).await;
                    continue;
                }
                break;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(WindowError {
                    error: FetcherError::AuthFailed(status.as_u16()),
                    attempts,
                });
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(WindowError {
                    error: FetcherError::HttpError(format!(
                        "Client error {}: {}",
                        status,
                        error_text.trim()
                    )),
                    attempts,
                });
            }

            return Ok((response, attempts));
        }

        let error = last_error
            .unwrap_or_else(|| FetcherError::NetworkError("Max retries exceeded".to_string()));
        Err(WindowError { error, attempts })
    }

    async fn backoff(&self, attempt: u32) {
        let delay = backoff_from(self.initial_backoff, attempt);
        debug!("Retrying after {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}

async fn stream_lines<F>(mut response: Response, sink: &mut F) -> FetcherResult<u64>
where
    F: FnMut(&str) -> std::io::Result<()>,
{
    let mut splitter = LineSplitter::default();
    let mut delivered = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetcherError::NetworkError(format!("body read failed: {}", e)))?
    {
        for line in splitter.push(&chunk) {
            sink(&line)?;
            delivered += 1;
        }
    }
    if let Some(line) = splitter.finish() {
        sink(&line)?;
        delivered += 1;
    }
    Ok(delivered)
}

/// Reassembles lines from arbitrarily split body chunks.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut consumed = 0;

        while let Some(pos) = self.pending[consumed..].iter().position(|&b| b == b'\n') {
            let end = consumed + pos;
            if let Some(line) = decode_line(&self.pending[consumed..end]) {
                lines.push(line);
            }
            consumed = end + 1;
        }
        self.pending.drain(..consumed);
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(String::from_utf8_lossy(raw).into_owned())
}
