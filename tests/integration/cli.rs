//! Integration tests for the command-line interface

use assert_cmd::Command;
use chrono::{Duration, SecondsFormat, Utc};
use location_history_downloader::HISTORY_COLUMNS;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const BIN: &str = "location-history-downloader";

/// A one-day interval that ended yesterday, as RFC 3339 text.
fn recent_interval() -> (String, String) {
    let end = Utc::now() - Duration::days(1);
    let start = end - Duration::days(1);
    (
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn history_body() -> String {
    let mut row: Vec<&str> = vec![""; HISTORY_COLUMNS.len()];
    row[1] = "aa:bb:cc:dd:ee:ff";
    row[9] = "1590019287571";
    row[13] = "0";
    row[15] = "1590019287571";
    format!("{}\n{}\n", HISTORY_COLUMNS.join(","), row.join(","))
}

#[test]
fn test_range_human_output() {
    let (start, end) = recent_interval();

    let output = Command::cargo_bin(BIN)
        .unwrap()
        .args(["range", "-s", start.as_str(), "-e", end.as_str(), "-z", "UTC"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Local:").count(), 1);
    assert!(stdout.contains("UTC:"));
    assert!(stdout.contains("Timestamp (msec):"));
}

#[test]
fn test_range_json_output() {
    let (start, end) = recent_interval();

    let output = Command::cargo_bin(BIN)
        .unwrap()
        .args([
            "--output-format",
            "json",
            "range",
            "-s",
            start.as_str(),
            "-e",
            end.as_str(),
            "--chunk-hours",
            "6",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let windows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let windows = windows.as_array().unwrap();
    assert_eq!(windows.len(), 4);
    let first_start = windows[0]["start_ms"].as_i64().unwrap();
    let first_end = windows[0]["end_ms"].as_i64().unwrap();
    assert_eq!(first_end - first_start, 6 * 3600 * 1000);
}

#[test]
fn test_range_rejects_old_start() {
    Command::cargo_bin(BIN)
        .unwrap()
        .args(["range", "-s", "2020-01-01T00:00:00Z", "-e", "2020-01-02T00:00:00Z"])
        .assert()
        .failure();
}

#[test]
fn test_unknown_timezone_fails() {
    Command::cargo_bin(BIN)
        .unwrap()
        .args(["range", "-z", "Not/AZone"])
        .assert()
        .failure();
}

#[test]
fn test_history_without_token() {
    let dir = TempDir::new().unwrap();

    let output = Command::cargo_bin(BIN)
        .unwrap()
        .env_remove("TOKEN")
        .current_dir(dir.path())
        .args(["history"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Please set environment variable TOKEN before running."),
        "stderr: {stderr}"
    );
}

#[test]
fn test_convert_command() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.csv");
    fs::write(&path, "macaddress,changedon\naa,1590019287571\nbb,0\n").unwrap();

    Command::cargo_bin(BIN)
        .unwrap()
        .args(["convert", path.to_str().unwrap(), "-z", "Pacific/Auckland", "--keep-original"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "macaddress,changedon\naa,2020-05-21 12:01:27.000\nbb,\n"
    );
    assert!(dir.path().join("history.csv.old").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_history_download_and_convert() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(history_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let (start, end) = recent_interval();
    let uri = server.uri();

    let output = Command::cargo_bin(BIN)
        .unwrap()
        .env("TOKEN", "test-token")
        .args([
            "--output-format",
            "json",
            "history",
            "-s",
            start.as_str(),
            "-e",
            end.as_str(),
            "-z",
            "Australia/Sydney",
            "-f",
            path.to_str().unwrap(),
            "-c",
            "--endpoint",
            uri.as_str(),
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["success"], true);
    assert_eq!(report["rows_written"], 1);
    assert_eq!(report["converted"], true);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let record = reader.records().next().unwrap().unwrap();
    assert_eq!(&record[9], "2020-05-21 10:01:27.000");
    assert_eq!(&record[13], "");
    assert!(!dir.path().join("out.csv.old").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_history_auth_failure_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let (start, end) = recent_interval();
    let uri = server.uri();

    let output = Command::cargo_bin(BIN)
        .unwrap()
        .args([
            "history",
            "-s",
            start.as_str(),
            "-e",
            end.as_str(),
            "-f",
            path.to_str().unwrap(),
            "--token",
            "bad",
            "--endpoint",
            uri.as_str(),
            "--no-progress",
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("authentication failed"), "stderr: {stderr}");
}
