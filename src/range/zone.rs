//! Time zone resolution and attachment

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, error};

use super::{RangeError, TimestampInput, ZonedTimestamp};

/// A zone that naive timestamps can be attached to and instants converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedZone {
    /// The host's local zone
    Local,
    /// A zone from the IANA database
    Named(Tz),
}

impl ResolvedZone {
    /// Zone name for log output.
    pub fn name(&self) -> String {
        match self {
            ResolvedZone::Local => "local".to_string(),
            ResolvedZone::Named(tz) => tz.name().to_string(),
        }
    }

    /// Interpret a wall-clock time in this zone.
    ///
    /// In a DST fold the earlier of the two instants is used. Wall-clock times
    /// skipped by a DST gap do not exist and are rejected.
    pub fn attach(&self, naive: NaiveDateTime) -> Result<ZonedTimestamp, RangeError> {
        match self {
            ResolvedZone::Local => pick_local(Local.from_local_datetime(&naive), naive, self),
            ResolvedZone::Named(tz) => pick_local(tz.from_local_datetime(&naive), naive, self),
        }
    }

    /// Re-express an instant in this zone.
    pub fn convert<T: TimeZone>(&self, instant: &DateTime<T>) -> ZonedTimestamp {
        match self {
            ResolvedZone::Local => instant.with_timezone(&Local).fixed_offset(),
            ResolvedZone::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }
}

impl std::fmt::Display for ResolvedZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn pick_local<T: TimeZone>(
    result: LocalResult<DateTime<T>>,
    naive: NaiveDateTime,
    zone: &ResolvedZone,
) -> Result<ZonedTimestamp, RangeError> {
    match result {
        LocalResult::Single(dt) => Ok(dt.fixed_offset()),
        LocalResult::Ambiguous(earliest, _) => {
            debug!("{} is ambiguous in {}, using the earlier instant", naive, zone);
            Ok(earliest.fixed_offset())
        }
        LocalResult::None => Err(RangeError::MalformedInterval(format!(
            "{naive} does not exist in timezone {zone}"
        ))),
    }
}

/// Resolve an optional zone name.
///
/// An absent or blank name selects the host's local zone. A name that is not in
/// the IANA database is an error; there is no fallback to the local zone.
pub fn resolve_timezone(zone_name: Option<&str>) -> Result<ResolvedZone, RangeError> {
    match zone_name.map(str::trim).filter(|name| !name.is_empty()) {
        None => {
            debug!("No timezone provided, using the host local zone");
            Ok(ResolvedZone::Local)
        }
        Some(name) => match name.parse::<Tz>() {
            Ok(tz) => {
                debug!("Using timezone {}", tz.name());
                Ok(ResolvedZone::Named(tz))
            }
            Err(_) => {
                error!("Timezone {} provided is not in the time zone database", name);
                Err(RangeError::InvalidTimezone(name.to_string()))
            }
        },
    }
}

/// Attach `zone` to a naive timestamp. Explicit offsets are returned unchanged.
pub fn normalize(timestamp: TimestampInput, zone: &ResolvedZone) -> Result<ZonedTimestamp, RangeError> {
    match timestamp {
        TimestampInput::Zoned(dt) => {
            debug!("Timezone offset {} provided with time {}", dt.offset(), dt);
            Ok(dt)
        }
        TimestampInput::Naive(naive) => {
            let zoned = zone.attach(naive)?;
            debug!("Attached timezone {} to time {}: {}", zone, naive, zoned);
            Ok(zoned)
        }
    }
}
