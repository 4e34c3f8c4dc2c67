//! Epoch-millisecond timestamp cells

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone};
use tracing::warn;

use crate::range::{ResolvedZone, ZonedTimestamp};

/// Text format of converted timestamps. Values are rendered at whole seconds,
/// so the millisecond field is always `.000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Value of a timestamp column that was never set.
pub const UNSET_SENTINEL: i64 = 0;

/// One value of a timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampCell {
    /// Unset or unparsable value
    Missing,
    /// Instant with an offset
    Instant(ZonedTimestamp),
    /// Wall-clock time without an offset
    Naive(NaiveDateTime),
    /// Text that was never parsed as a timestamp
    Raw(String),
}

impl TimestampCell {
    /// Parse a raw CSV field.
    ///
    /// Numeric fields are epoch milliseconds in UTC, empty fields are missing,
    /// anything else is kept as [`TimestampCell::Raw`].
    pub fn from_field(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return TimestampCell::Missing;
        }
        if parse_millis(trimmed).is_some() {
            millis_to_zoned(trimmed, true)
        } else {
            TimestampCell::Raw(field.to_string())
        }
    }

    /// Whether the cell holds no value.
    pub fn is_missing(&self) -> bool {
        matches!(self, TimestampCell::Missing)
    }

    /// CSV text of the cell. Missing values are empty fields.
    ///
    /// The sub-second part is dropped here only; the cell keeps the exact instant.
    pub fn render(&self) -> String {
        match self {
            TimestampCell::Missing => String::new(),
            TimestampCell::Instant(dt) => dt.trunc_subsecs(0).format(TIMESTAMP_FORMAT).to_string(),
            TimestampCell::Naive(dt) => dt.trunc_subsecs(0).format(TIMESTAMP_FORMAT).to_string(),
            TimestampCell::Raw(text) => text.clone(),
        }
    }
}

/// Milliseconds since the Unix epoch, rounded to the nearest millisecond.
pub fn to_epoch_millis<T: TimeZone>(timestamp: &DateTime<T>) -> i64 {
    // timestamp() floors, so the sub-second part is never negative
    let sub_millis = (i64::from(timestamp.timestamp_subsec_nanos()) + 500_000) / 1_000_000;
    timestamp.timestamp() * 1000 + sub_millis
}

fn parse_millis(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && value.abs() < 9.0e18)
            .map(|value| value.round() as i64)
    })
}

/// Interpret a raw value as epoch milliseconds.
///
/// The sentinel `0` and unparsable values are [`TimestampCell::Missing`]. With
/// `source_is_utc` the result is a UTC instant, otherwise the UTC wall clock
/// without an offset.
pub fn millis_to_zoned(value: &str, source_is_utc: bool) -> TimestampCell {
    let millis = match parse_millis(value.trim()) {
        Some(UNSET_SENTINEL) | None => return TimestampCell::Missing,
        Some(millis) => millis,
    };

    match DateTime::from_timestamp_millis(millis) {
        Some(dt) if source_is_utc => TimestampCell::Instant(dt.fixed_offset()),
        Some(dt) => TimestampCell::Naive(dt.naive_utc()),
        None => TimestampCell::Missing,
    }
}

/// Re-express every instant of a column in `zone`.
///
/// Cells that are not instants are passed through unchanged and logged.
pub fn convert_column_zone(column: Vec<TimestampCell>, zone: &ResolvedZone) -> Vec<TimestampCell> {
    let mut passed_through = 0usize;
    let converted: Vec<_> = column
        .into_iter()
        .map(|cell| match cell {
            TimestampCell::Instant(dt) => TimestampCell::Instant(zone.convert(&dt)),
            TimestampCell::Missing => TimestampCell::Missing,
            other => {
                passed_through += 1;
                other
            }
        })
        .collect();

    if passed_through > 0 {
        warn!(
            "{} values are not zoned timestamps and were left unchanged (target {})",
            passed_through, zone
        );
    }
    converted
}
