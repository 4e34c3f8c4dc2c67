//! Destination path naming and writability checks

use chrono::{DateTime, TimeZone};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of generated history filenames.
pub const FILENAME_PREFIX: &str = "client-history-";

/// `client-history-YYYYMMDDHHMM.csv` for the wall-clock minute of `now`.
pub fn default_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    PathBuf::from(format!("{}{}.csv", FILENAME_PREFIX, now.format("%Y%m%d%H%M")))
}

/// The requested path, or a generated one when none was given.
pub fn resolve_filename<Tz: TimeZone>(requested: Option<PathBuf>, now: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    match requested {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => default_filename(now),
    }
}

/// Whether `path` can be written.
///
/// An existing file must be a writable regular file. A missing file needs an
/// existing, writable parent directory (the current directory for bare names).
/// Nothing is created or truncated.
pub fn check_file_writable(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => false,
        Ok(meta) => {
            !meta.permissions().readonly() && OpenOptions::new().append(true).open(path).is_ok()
        }
        Err(_) => {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let writable = std::fs::metadata(parent)
                .map(|meta| meta.is_dir() && !meta.permissions().readonly())
                .unwrap_or(false);
            debug!(path = %path.display(), parent = %parent.display(), writable, "Checked parent directory");
            writable
        }
    }
}
