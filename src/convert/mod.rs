//! Timestamp conversion of history files
//!
//! History files hold three timestamp columns as epoch milliseconds, with `0`
//! meaning "never set". This module rewrites those columns as local wall-clock
//! text in a chosen zone, streaming the file in row chunks so arbitrarily large
//! files can be converted in bounded memory.
//!
//! - [`timestamp`] - cell parsing, zone conversion and epoch-millisecond helpers
//! - [`rewriter`] - the rename-then-stream file rewrite
//!
//! Concurrent rewrites of the same path are not guarded against; callers must
//! make sure a path is converted by one caller at a time.

pub mod rewriter;
pub mod timestamp;

pub use rewriter::{rewrite_file, RewriteSummary, TimestampRewriter};
pub use timestamp::{
    convert_column_zone, millis_to_zoned, to_epoch_millis, TimestampCell, TIMESTAMP_FORMAT,
};

/// Number of rows converted and written per chunk.
pub const DEFAULT_ROW_CHUNK_SIZE: usize = 100_000;

/// Suffix appended to the source file while it is being rewritten.
pub const ORIGINAL_SUFFIX: &str = ".old";

/// Conversion errors
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Source could not be opened or read
    #[error("read failure: {0}")]
    ReadFailure(String),

    /// Source could not be moved aside
    #[error("rename failure: {0}")]
    RenameFailure(String),

    /// Destination could not be written
    #[error("write failure: {0}")]
    WriteFailure(String),
}

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;
