//! # Location History Downloader Library
//!
//! Retrieves client location history from the DNA Spaces history API as CSV,
//! one request per time window, and optionally rewrites the epoch-millisecond
//! timestamp columns as local wall-clock time in a chosen zone.
//!
//! ## Features
//!
//! - **Date ranges**: Validates a requested interval against the API's 30-day lookback
//!   and splits it into fixed-size windows
//! - **Time zones**: IANA zone names via chrono-tz; naive timestamps get the zone attached
//! - **Retries**: Transient HTTP failures are retried with exponential backoff
//! - **Streaming conversion**: Timestamp columns are rewritten in bounded row chunks
//!
//! ## Quick Start
//!
//! ```no_run
//! use location_history_downloader::range::{get_date_range, resolve_timezone};
//! use location_history_downloader::convert::rewrite_file;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Yesterday until now, in windows of one day
//! let windows = get_date_range(None, None, Some("Australia/Sydney"))?;
//! println!("{} windows", windows.len());
//!
//! // Convert a downloaded file in place
//! let zone = resolve_timezone(Some("Australia/Sydney"))?;
//! let summary = rewrite_file(Path::new("client-history.csv"), zone, true, 100_000)?;
//! println!("{} rows converted", summary.rows);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`range`] - Interval validation, zone attachment and window splitting
//! - [`convert`] - Streaming timestamp-column rewrite
//! - [`fetcher`] - HTTP client for the history endpoint
//! - [`downloader`] - Window-by-window retrieval into a CSV file
//! - [`output`] - Destination path helpers
//! - [`cli`] - Command-line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Timestamp column conversion
pub mod convert;

/// History retrieval
pub mod downloader;

/// HTTP access to the history endpoint
pub mod fetcher;

/// Output path helpers
pub mod output;

/// Date range validation and splitting
pub mod range;

pub use convert::{rewrite_file, TimestampRewriter};
pub use range::{get_date_range, RangeSplitter, TimeInterval, TimestampInput};

/// Columns of a history record, in file order.
pub const HISTORY_COLUMNS: [&str; 25] = [
    "tenantid",
    "macaddress",
    "devicetype",
    "campusid",
    "buildingid",
    "floorid",
    "floorhierarchy",
    "coordinatex",
    "coordinatey",
    "sourcetimestamp",
    "maxdetectedapmac",
    "maxdetectedband",
    "detectingcontrollers",
    "firstactiveat",
    "locatedsinceactivecount",
    "changedon",
    "manufacturer",
    "associated",
    "maxdetectedrssi",
    "ssid",
    "username",
    "associatedapmac",
    "associatedaprssi",
    "maxdetectedslot",
    "ipaddress",
];

/// Columns newer API versions append after [`HISTORY_COLUMNS`].
pub const EXTENDED_COLUMNS: [&str; 5] = [
    "staticdevice",
    "recordtype",
    "computetype",
    "source",
    "machashed",
];

/// Columns holding epoch milliseconds, `0` when unset.
pub const TIMESTAMP_COLUMNS: [&str; 3] = ["sourcetimestamp", "firstactiveat", "changedon"];

/// Whether `header` names the known history columns, with or without the extension.
pub fn is_history_header(header: &[&str]) -> bool {
    let base = header.len() >= HISTORY_COLUMNS.len()
        && header
            .iter()
            .zip(HISTORY_COLUMNS.iter())
            .all(|(actual, expected)| actual.trim().eq_ignore_ascii_case(expected));

    base && (header.len() == HISTORY_COLUMNS.len()
        || header.len() == HISTORY_COLUMNS.len() + EXTENDED_COLUMNS.len())
}
