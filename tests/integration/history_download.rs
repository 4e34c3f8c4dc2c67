//! Integration tests for window-by-window retrieval against a mock API

use chrono::{DateTime, Duration};
use location_history_downloader::downloader::{HistoryConfig, HistoryDownloader};
use location_history_downloader::fetcher::{FetcherError, HistoryClient};
use location_history_downloader::range::{RangeSplitter, TimeInterval};
use location_history_downloader::HISTORY_COLUMNS;
use secrecy::SecretString;
use std::time::Duration as StdDuration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HISTORY_PATH: &str = "/api/location/v1/history";

fn client_for(server: &MockServer, max_retries: u32) -> HistoryClient {
    let config = HistoryConfig::new(SecretString::from("secret-token".to_string()))
        .with_endpoint(format!("{}{}", server.uri(), HISTORY_PATH))
        .with_max_retries(max_retries)
        .with_base_timeout(StdDuration::from_secs(5));
    HistoryClient::new(reqwest::Client::new(), &config)
        .with_initial_backoff(StdDuration::from_millis(1))
}

fn three_windows() -> Vec<TimeInterval> {
    let start = DateTime::parse_from_rfc3339("2020-05-17T00:00:00+10:00").unwrap();
    (0..3)
        .map(|i| TimeInterval {
            start: start + Duration::days(i),
            end: start + Duration::days(i + 1),
        })
        .collect()
}

fn body(rows: &[&str]) -> String {
    let mut body = HISTORY_COLUMNS.join(",");
    body.push_str("\r\n");
    for row in rows {
        body.push_str(row);
        body.push_str("\r\n");
    }
    body
}

#[tokio::test]
async fn test_all_windows_into_one_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(HISTORY_PATH))
        .and(header("Authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body(&["r1", "r2"])))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("history.csv");
    let summary = HistoryDownloader::new(client_for(&server, 2))
        .download(&three_windows(), &output)
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.windows_completed, 3);
    assert_eq!(summary.rows, 6);
    assert_eq!(summary.api_requests, 3);

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], HISTORY_COLUMNS.join(","));
    assert!(!content.contains('\r'));
}

#[tokio::test]
async fn test_transient_errors_count_as_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body(&["r"])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let summary = HistoryDownloader::new(client_for(&server, 3))
        .download(&three_windows(), &dir.path().join("h.csv"))
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.retries, 1);
    assert_eq!(summary.api_requests, 4);
    assert_eq!(summary.rows, 3);
}

#[tokio::test]
async fn test_exhausted_retries_stop_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("h.csv");
    let summary = HistoryDownloader::new(client_for(&server, 1))
        .download(&three_windows(), &output)
        .await
        .unwrap();

    assert_eq!(summary.windows_completed, 0);
    assert_eq!(summary.rows, 0);
    assert!(matches!(summary.failure, Some(FetcherError::HttpError(_))));
    assert_eq!(summary.api_requests, 2);
    assert_eq!(summary.retries, 1);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}

#[tokio::test]
async fn test_split_windows_drive_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body(&[])))
        .expect(5)
        .mount(&server)
        .await;

    let now = chrono::Utc::now();
    let end = (now - Duration::days(1)).fixed_offset();
    let start = end - Duration::hours(30);
    let windows = RangeSplitter::new()
        .with_chunk_hours(6)
        .get_date_range(Some(start.into()), Some(end.into()), None)
        .unwrap();
    assert_eq!(windows.len(), 5);

    let dir = TempDir::new().unwrap();
    let summary = HistoryDownloader::new(client_for(&server, 0))
        .download(&windows, &dir.path().join("h.csv"))
        .await
        .unwrap();
    assert_eq!(summary.windows_completed, 5);
    assert_eq!(summary.rows, 0);
}
