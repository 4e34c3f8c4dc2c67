//! Time range partitioning
//!
//! Turns a requested `(start, end, timezone)` triple into the ordered list of
//! fixed-size windows the history endpoint is called with.
//!
//! # Overview
//!
//! 1. **Defaults**: a missing end is "now" (UTC), a missing start is one day before the end
//! 2. **Zone resolution**: [`zone::resolve_timezone`] maps an optional IANA name to a [`ResolvedZone`]
//! 3. **Normalization**: naive timestamps get the resolved zone attached, explicit offsets are kept
//! 4. **Validation**: [`RangeSplitter::validate`] applies the lookback and ordering policy
//! 5. **Splitting**: [`RangeSplitter::split`] emits contiguous windows of `HOURLY_TIME_CHUNK_SIZE` hours
//!
//! # Quick Start
//!
//! ```
//! use location_history_downloader::range::{RangeSplitter, TimestampInput};
//! use chrono::{TimeZone, Utc};
//!
//! let now = Utc.with_ymd_and_hms(2020, 5, 20, 0, 0, 0).unwrap();
//! let splitter = RangeSplitter::new().with_fixed_now(now);
//!
//! let start: TimestampInput = "2020-05-01T01:00:00Z".parse().unwrap();
//! let end: TimestampInput = "2020-05-11T01:00:00Z".parse().unwrap();
//!
//! let windows = splitter
//!     .get_date_range(Some(start), Some(end), None)
//!     .unwrap();
//! assert_eq!(windows.len(), 10);
//! ```
//!
//! # Error Handling
//!
//! Two kinds of failure are kept apart:
//! - garbage input (unparsable text, unknown zone names) is a [`RangeError`]
//! - a well-formed interval that breaks the policy yields an empty window list,
//!   with every reason logged at error level

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::str::FromStr;

pub mod splitter;
pub mod zone;

pub use splitter::{get_date_range, RangeSplitter, RejectionReason};
pub use zone::{normalize, resolve_timezone, ResolvedZone};

/// Maximum lookback (and maximum span) of a requested interval, in days.
pub const MAX_DAYS: i64 = 30;

/// Duration of one retrieval window, in hours.
pub const HOURLY_TIME_CHUNK_SIZE: i64 = 24;

/// Errors raised while building a date range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// The zone name does not exist in the time zone database
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The input cannot be interpreted as a timestamp
    #[error("malformed interval: {0}")]
    MalformedInterval(String),
}

/// A timestamp with an explicit UTC offset.
pub type ZonedTimestamp = DateTime<FixedOffset>;

/// Caller-supplied timestamp, which may or may not carry an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampInput {
    /// Timestamp with an explicit offset; the offset is authoritative
    Zoned(ZonedTimestamp),
    /// Wall-clock timestamp without any zone information
    Naive(NaiveDateTime),
}

impl TimestampInput {
    /// The zoned timestamp, if this input carries an offset.
    pub fn zoned(&self) -> Option<ZonedTimestamp> {
        match self {
            TimestampInput::Zoned(dt) => Some(*dt),
            TimestampInput::Naive(_) => None,
        }
    }

    /// Whether the input carries an offset.
    pub fn has_offset(&self) -> bool {
        matches!(self, TimestampInput::Zoned(_))
    }

    /// Shift the timestamp back by `delta`, keeping its kind.
    ///
    /// Returns `None` when the result falls outside the representable calendar.
    pub fn checked_sub(&self, delta: Duration) -> Option<Self> {
        match self {
            TimestampInput::Zoned(dt) => dt.checked_sub_signed(delta).map(TimestampInput::Zoned),
            TimestampInput::Naive(dt) => dt.checked_sub_signed(delta).map(TimestampInput::Naive),
        }
    }
}

impl From<ZonedTimestamp> for TimestampInput {
    fn from(dt: ZonedTimestamp) -> Self {
        TimestampInput::Zoned(dt)
    }
}

impl From<NaiveDateTime> for TimestampInput {
    fn from(dt: NaiveDateTime) -> Self {
        TimestampInput::Naive(dt)
    }
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl FromStr for TimestampInput {
    type Err = RangeError;

    /// Parse an ISO-8601 timestamp.
    ///
    /// Accepts a bare date (`2020-05-01`, midnight), a date and time with either
    /// `T` or a space as separator, and an optional `Z` or `+HH:MM` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(RangeError::MalformedInterval(
                "empty timestamp".to_string(),
            ));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(TimestampInput::Zoned(dt));
        }

        // `%:z` does not accept the `Z` designator
        let with_offset = match input.strip_suffix(['Z', 'z']) {
            Some(stripped) => format!("{stripped}+00:00"),
            None => input.to_string(),
        };
        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&with_offset, format) {
                return Ok(TimestampInput::Zoned(dt));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(TimestampInput::Naive(dt));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(TimestampInput::Naive(midnight));
            }
        }

        Err(RangeError::MalformedInterval(format!(
            "'{input}' is not an ISO-8601 timestamp"
        )))
    }
}

/// One retrieval window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    /// Inclusive start
    pub start: ZonedTimestamp,
    /// End of the window; equals the next window's start
    pub end: ZonedTimestamp,
}

impl TimeInterval {
    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end.signed_duration_since(self.start)
    }
}
