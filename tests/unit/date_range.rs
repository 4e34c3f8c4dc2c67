use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use location_history_downloader::range::{RangeError, RangeSplitter, TimestampInput};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 5, 20, 0, 0, 0).unwrap()
}

fn splitter() -> RangeSplitter {
    RangeSplitter::new().with_fixed_now(fixed_now())
}

fn parse(input: &str) -> TimestampInput {
    input.parse().unwrap()
}

#[test]
fn test_ten_day_interval_in_daily_windows() {
    let windows = splitter()
        .get_date_range(
            Some(parse("2020-05-01T01:00:00Z")),
            Some(parse("2020-05-11T01:00:00Z")),
            None,
        )
        .unwrap();

    assert_eq!(windows.len(), 10);
    for window in &windows {
        assert_eq!(window.duration(), Duration::days(1));
    }
    assert_eq!(windows[0].start, parse("2020-05-01T01:00:00Z").zoned().unwrap());
    assert_eq!(windows[0].end, parse("2020-05-02T01:00:00Z").zoned().unwrap());
    assert_eq!(windows[9].end, parse("2020-05-11T01:00:00Z").zoned().unwrap());
}

#[test]
fn test_windows_are_contiguous() {
    let windows = splitter()
        .with_chunk_hours(7)
        .get_date_range(
            Some(parse("2020-05-10T00:00:00+10:00")),
            Some(parse("2020-05-12T05:00:00+10:00")),
            None,
        )
        .unwrap();

    assert_eq!(windows.len(), 8);
    for pair in windows.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    let last = windows.last().unwrap();
    assert!(last.duration() <= Duration::hours(7));
    assert!(last.duration() > Duration::zero());
}

#[test]
fn test_start_older_than_lookback_yields_no_windows() {
    let windows = splitter()
        .get_date_range(
            Some(parse("2020-04-01T00:00:00Z")),
            Some(parse("2020-04-02T00:00:00Z")),
            None,
        )
        .unwrap();
    assert!(windows.is_empty());
}

#[test]
fn test_defaults_cover_the_last_day() {
    let windows = splitter().get_date_range(None, None, Some("UTC")).unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].end, fixed_now().fixed_offset());
    assert_eq!(windows[0].duration(), Duration::days(1));
}

#[test]
fn test_naive_bounds_take_the_zone() {
    let windows = splitter()
        .get_date_range(
            Some(parse("2020-05-18 00:00:00")),
            Some(parse("2020-05-19 00:00:00")),
            Some("Australia/Sydney"),
        )
        .unwrap();

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start.offset().local_minus_utc(), 10 * 3600);
    assert_eq!(windows[0].start.hour(), 0);
    assert_eq!(
        windows[0].start.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2020, 5, 17, 14, 0, 0).unwrap()
    );
}

#[test]
fn test_unknown_zone_is_an_error() {
    let result = splitter().get_date_range(None, None, Some("Mars/Olympus_Mons"));
    assert!(matches!(result, Err(RangeError::InvalidTimezone(_))));
}

#[test]
fn test_blank_zone_is_local() {
    let start = TimestampInput::Naive(
        NaiveDate::from_ymd_opt(2020, 5, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    );
    let windows = splitter()
        .get_date_range(Some(start), Some(parse("2020-05-19T12:00:00Z")), Some("  "))
        .unwrap();
    assert!(!windows.is_empty());
}

#[test]
fn test_garbage_text_does_not_parse() {
    assert!("next tuesday".parse::<TimestampInput>().is_err());
}
