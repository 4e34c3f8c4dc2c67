use chrono::{Local, TimeZone, Utc};
use location_history_downloader::output::{
    check_file_writable, default_filename, resolve_filename, FILENAME_PREFIX,
};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_generated_name_shape() {
    let name = default_filename(&Local::now());
    let name = name.to_str().unwrap();
    assert!(name.starts_with(FILENAME_PREFIX));
    assert!(name.ends_with(".csv"));
    let stamp = &name[FILENAME_PREFIX.len()..name.len() - ".csv".len()];
    assert_eq!(stamp.len(), 12);
    assert!(stamp.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn test_explicit_name_wins() {
    let now = Utc.with_ymd_and_hms(2020, 5, 21, 9, 7, 0).unwrap();
    let path = resolve_filename(Some(PathBuf::from("data/history.csv")), &now);
    assert_eq!(path, PathBuf::from("data/history.csv"));
}

#[test]
fn test_writable_checks() {
    let dir = TempDir::new().unwrap();
    assert!(check_file_writable(&dir.path().join("fresh.csv")));
    assert!(!check_file_writable(dir.path()));
    assert!(!check_file_writable(&dir.path().join("a").join("b.csv")));
}
