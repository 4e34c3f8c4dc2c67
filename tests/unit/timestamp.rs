use chrono::Timelike;
use location_history_downloader::convert::{
    convert_column_zone, millis_to_zoned, to_epoch_millis, TimestampCell,
};
use location_history_downloader::range::{resolve_timezone, ResolvedZone};

const SAMPLE_MS: &str = "1590019287571";

fn converted_hour(zone: &str) -> u32 {
    let zone = resolve_timezone(Some(zone)).unwrap();
    let column = convert_column_zone(vec![millis_to_zoned(SAMPLE_MS, true)], &zone);
    match &column[0] {
        TimestampCell::Instant(dt) => dt.hour(),
        other => panic!("expected instant, got {other:?}"),
    }
}

#[test]
fn test_sample_is_utc_midnight() {
    let cell = millis_to_zoned(SAMPLE_MS, true);
    assert_eq!(cell.render(), "2020-05-21 00:01:27.000");
}

#[test]
fn test_hour_per_zone() {
    assert_eq!(converted_hour("UTC"), 0);
    assert_eq!(converted_hour("Australia/Sydney"), 10);
    assert_eq!(converted_hour("Pacific/Auckland"), 12);
    assert_eq!(converted_hour("America/New_York"), 20);
}

#[test]
fn test_sydney_rendering_whole_seconds() {
    let zone = resolve_timezone(Some("Australia/Sydney")).unwrap();
    let column = convert_column_zone(vec![millis_to_zoned(SAMPLE_MS, true)], &zone);
    assert_eq!(column[0].render(), "2020-05-21 10:01:27.000");
}

#[test]
fn test_unset_value_stays_missing_in_every_zone() {
    for name in ["UTC", "Australia/Sydney", "Asia/Kolkata", "America/Los_Angeles"] {
        let zone = resolve_timezone(Some(name)).unwrap();
        let column = convert_column_zone(vec![millis_to_zoned("0", true)], &zone);
        assert!(column[0].is_missing(), "{name}");
        assert!(!column[0].render().starts_with("1970"), "{name}");
    }
}

#[test]
fn test_conversion_preserves_the_instant() {
    let zone = ResolvedZone::Named(chrono_tz::Australia::Sydney);
    let column = convert_column_zone(vec![millis_to_zoned(SAMPLE_MS, true)], &zone);
    let TimestampCell::Instant(dt) = &column[0] else {
        panic!("expected instant");
    };
    assert_eq!(to_epoch_millis(dt).to_string(), SAMPLE_MS);
}
