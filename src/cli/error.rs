//! CLI error types and conversions

use crate::convert::ConvertError;
use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::range::RangeError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Date range or zone error
    #[error("range error: {0}")]
    RangeError(#[from] RangeError),

    /// Timestamp conversion error
    #[error("conversion error: {0}")]
    ConvertError(#[from] ConvertError),

    /// Download error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// JSON report could not be produced
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Background task panicked or was cancelled
    #[error("task error: {0}")]
    TaskError(String),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
