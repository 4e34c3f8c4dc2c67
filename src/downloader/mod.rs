//! Window-by-window history retrieval
//!
//! The downloader walks the windows produced by [`crate::range`] in order,
//! fetches each through [`crate::fetcher::HistoryClient`] and appends the
//! lines to a single CSV file.
//!
//! # Quick Start
//!
//! ```no_run
//! use location_history_downloader::downloader::{HistoryConfig, HistoryDownloader};
//! use location_history_downloader::fetcher::HistoryClient;
//! use location_history_downloader::range::get_date_range;
//! use secrecy::SecretString;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let windows = get_date_range(None, None, Some("Australia/Sydney"))?;
//! let config = HistoryConfig::new(SecretString::from("token".to_string()));
//! let client = HistoryClient::new(reqwest::Client::new(), &config);
//!
//! let summary = HistoryDownloader::new(client)
//!     .download(&windows, Path::new("history.csv"))
//!     .await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Problems with the destination file are returned as [`DownloadError`]. A
//! window that cannot be fetched stops the loop but is reported through
//! [`DownloadSummary::failure`], so callers still see what was written.

pub mod config;
pub mod history;

pub use config::{calculate_backoff, HistoryConfig, HISTORY_URL, MAX_RETRIES};
pub use history::HistoryDownloader;

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use std::path::PathBuf;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Destination problem
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Nothing to download
    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Result of a download run.
#[derive(Debug)]
pub struct DownloadSummary {
    /// Destination file
    pub path: PathBuf,
    /// Data rows written, header excluded
    pub rows: u64,
    /// Windows fetched successfully
    pub windows_completed: usize,
    /// Windows requested
    pub windows_total: usize,
    /// HTTP requests sent, retries included
    pub api_requests: u64,
    /// Requests beyond the first per window
    pub retries: u64,
    /// Error of the window that stopped the run
    pub failure: Option<FetcherError>,
}

impl DownloadSummary {
    /// Whether every window was fetched.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.windows_completed == self.windows_total
    }
}
