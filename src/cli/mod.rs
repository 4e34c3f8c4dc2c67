//! CLI command implementations

pub mod convert;
pub mod error;
pub mod history;
pub mod range;

pub use convert::ConvertArgs;
pub use error::CliError;
pub use history::{Cli, Commands, HistoryArgs, OutputFormat};
pub use range::RangeArgs;

use crate::range::{RangeError, TimestampInput};

/// Parse a `--start-time`/`--end-time` value.
///
/// Accepts RFC 3339 (`2020-05-21T10:00:00+10:00`, `...Z`), the same without an
/// offset (the zone from `--timezone` is attached later), or a bare date.
pub(crate) fn parse_timestamp(input: &str) -> Result<TimestampInput, String> {
    input
        .trim()
        .parse()
        .map_err(|e: RangeError| e.to_string())
}

/// Parse and validate a row chunk size (at least one row).
pub(crate) fn parse_row_chunk_size(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("row chunk size must be at least 1".to_string());
    }
    Ok(value)
}
