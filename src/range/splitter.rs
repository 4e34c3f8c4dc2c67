//! Interval validation and fixed-size splitting

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info};

use super::zone::{normalize, resolve_timezone};
use super::{RangeError, TimeInterval, TimestampInput, HOURLY_TIME_CHUNK_SIZE, MAX_DAYS};

/// Reason a well-formed interval is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// A bound cannot be computed within the supported calendar range
    OutOfRange,
    /// A timestamp has no zone or offset attached
    MissingOffset,
    /// Start lies further in the past than the lookback allows
    StartTooOld {
        /// Lookback in days
        max_days: i64,
    },
    /// End lies too far after start
    SpanTooLong {
        /// Maximum span in days
        max_days: i64,
    },
    /// End lies in the future
    EndInFuture,
    /// Start lies after end
    StartAfterEnd,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "Time is outside the supported calendar range."),
            Self::MissingOffset => write!(f, "Start and end time must include a timezone."),
            Self::StartTooOld { max_days } => {
                write!(f, "Start time cannot be more than {max_days} days in the past.")
            }
            Self::SpanTooLong { max_days } => {
                write!(f, "End time cannot be greater than {max_days} days after start time.")
            }
            Self::EndInFuture => write!(f, "End time cannot be in the future."),
            Self::StartAfterEnd => write!(f, "Start time cannot be after end time."),
        }
    }
}

/// Validates intervals and splits them into retrieval windows.
#[derive(Debug, Clone)]
pub struct RangeSplitter {
    max_days: i64,
    chunk: Duration,
    fixed_now: Option<DateTime<Utc>>,
}

impl Default for RangeSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeSplitter {
    /// Splitter with a lookback of [`MAX_DAYS`] and windows of [`HOURLY_TIME_CHUNK_SIZE`] hours.
    pub fn new() -> Self {
        Self {
            max_days: MAX_DAYS,
            chunk: Duration::hours(HOURLY_TIME_CHUNK_SIZE),
            fixed_now: None,
        }
    }

    /// Set the lookback / maximum span in days.
    pub fn with_max_days(mut self, max_days: i64) -> Self {
        self.max_days = max_days;
        self
    }

    /// Set the window size in hours (at least one).
    pub fn with_chunk_hours(mut self, hours: u32) -> Self {
        self.chunk = Duration::hours(i64::from(hours.max(1)));
        self
    }

    /// Evaluate "now" as a fixed instant instead of the system clock.
    pub fn with_fixed_now(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    /// Fill in missing bounds: end defaults to now (UTC), start to one day before end.
    pub fn fill_defaults(
        &self,
        start: Option<TimestampInput>,
        end: Option<TimestampInput>,
    ) -> (TimestampInput, TimestampInput) {
        let end = end.unwrap_or_else(|| {
            let now = self.now();
            debug!("No end time provided, using now {}", now);
            TimestampInput::Zoned(now.fixed_offset())
        });
        let start = start.unwrap_or_else(|| {
            debug!("No start time provided, using one day before end");
            end.checked_sub(Duration::days(1)).unwrap_or(end)
        });
        (start, end)
    }

    /// Every policy check the interval fails, in evaluation order.
    pub fn check(&self, start: &TimestampInput, end: &TimestampInput) -> Vec<RejectionReason> {
        let (Some(start), Some(end)) = (start.zoned(), end.zoned()) else {
            return vec![RejectionReason::MissingOffset];
        };

        let mut reasons = Vec::new();
        let now = self.now();

        let limit = Duration::try_days(self.max_days);
        match limit.and_then(|limit| now.checked_sub_signed(limit)) {
            Some(oldest) if start < oldest => reasons.push(RejectionReason::StartTooOld {
                max_days: self.max_days,
            }),
            Some(_) => {}
            None => reasons.push(RejectionReason::OutOfRange),
        }

        if let Some(limit) = limit {
            if end.signed_duration_since(start) > limit {
                reasons.push(RejectionReason::SpanTooLong {
                    max_days: self.max_days,
                });
            }
        }

        if end > now {
            reasons.push(RejectionReason::EndInFuture);
        }

        if start > end {
            reasons.push(RejectionReason::StartAfterEnd);
        }

        reasons
    }

    /// Whether the interval may be requested. Each failed check is logged.
    pub fn validate(&self, start: &TimestampInput, end: &TimestampInput) -> bool {
        let reasons = self.check(start, end);
        for reason in &reasons {
            error!("{}", reason);
        }
        reasons.is_empty()
    }

    /// Split `[start, end]` into consecutive windows of the configured size.
    ///
    /// The last window ends exactly at `end` and may be shorter. An invalid
    /// interval produces no windows.
    pub fn split(&self, start: &TimestampInput, end: &TimestampInput) -> Vec<TimeInterval> {
        if !self.validate(start, end) {
            debug!("Split time range into 0 windows");
            return Vec::new();
        }
        let (Some(mut cursor), Some(end)) = (start.zoned(), end.zoned()) else {
            return Vec::new();
        };

        let mut windows = Vec::new();
        loop {
            match cursor.checked_add_signed(self.chunk) {
                Some(next) if next < end => {
                    windows.push(TimeInterval { start: cursor, end: next });
                    cursor = next;
                }
                _ => break,
            }
        }
        windows.push(TimeInterval { start: cursor, end });

        debug!("Split time range into {} windows", windows.len());
        windows
    }

    /// Build the retrieval windows for an optional start, end and zone name.
    pub fn get_date_range(
        &self,
        start: Option<TimestampInput>,
        end: Option<TimestampInput>,
        zone: Option<&str>,
    ) -> Result<Vec<TimeInterval>, RangeError> {
        let (start, end) = self.fill_defaults(start, end);
        let zone = resolve_timezone(zone)?;
        let start = TimestampInput::Zoned(normalize(start, &zone)?);
        let end = TimestampInput::Zoned(normalize(end, &zone)?);

        let windows = self.split(&start, &end);
        if let (Some(first), Some(last)) = (windows.first(), windows.last()) {
            info!(
                windows = windows.len(),
                start = %first.start,
                end = %last.end,
                "Date range ready"
            );
        }
        Ok(windows)
    }
}

/// [`RangeSplitter::get_date_range`] with the default lookback, window size and clock.
pub fn get_date_range(
    start: Option<TimestampInput>,
    end: Option<TimestampInput>,
    zone: Option<&str>,
) -> Result<Vec<TimeInterval>, RangeError> {
    RangeSplitter::new().get_date_range(start, end, zone)
}
