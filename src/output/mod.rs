//! Destination file helpers

pub mod path;

pub use path::{check_file_writable, default_filename, resolve_filename, FILENAME_PREFIX};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Destination cannot be created or overwritten
    #[error("file is not writable: {0}")]
    NotWritable(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}
