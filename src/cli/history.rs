//! History command implementation

use crate::cli::convert::rewrite_in_background;
use crate::cli::{parse_row_chunk_size, parse_timestamp, ConvertArgs, RangeArgs};
use crate::convert::{RewriteSummary, DEFAULT_ROW_CHUNK_SIZE};
use crate::downloader::{DownloadSummary, HistoryConfig, HistoryDownloader, HISTORY_URL};
use crate::fetcher::HistoryClient;
use crate::output::resolve_filename;
use crate::range::{resolve_timezone, RangeSplitter, TimestampInput, HOURLY_TIME_CHUNK_SIZE};
use chrono::Local;
use clap::{Parser, Subcommand};
use reqwest::Client;
use secrecy::SecretString;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use super::CliError;

/// Shown when no API token is configured.
pub const MISSING_TOKEN_MESSAGE: &str = "Please set environment variable TOKEN before running.";

/// Location History Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "location-history-downloader")]
#[command(about = "Download client location history as CSV", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Maximum number of retries for failed requests (default: 5, range: 1-20)
    #[arg(long, global = true, default_value = "5", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Append log lines to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download client history for a time range
    History(HistoryArgs),

    /// Show the windows a time range is split into
    Range(RangeArgs),

    /// Rewrite the timestamp columns of a downloaded file in a time zone
    Convert(ConvertArgs),
}

/// Arguments of the history command
#[derive(Parser, Debug)]
pub struct HistoryArgs {
    /// Start time (RFC 3339, or without offset to use --timezone). Default: one day before the end
    #[arg(short = 's', long, value_parser = parse_timestamp)]
    pub start_time: Option<TimestampInput>,

    /// End time (RFC 3339, or without offset to use --timezone). Default: now
    #[arg(short = 'e', long, value_parser = parse_timestamp)]
    pub end_time: Option<TimestampInput>,

    /// IANA time zone name (e.g. Australia/Sydney). Default: the local zone
    #[arg(short = 'z', long)]
    pub timezone: Option<String>,

    /// Filename to write the client history data into. Default: client-history-YYYYMMDDHHMM.csv
    #[arg(short = 'f', long)]
    pub filename: Option<PathBuf>,

    /// Convert timestamp columns to the time zone after downloading
    #[arg(short = 'c', long, default_value_t = false)]
    pub convert_time: bool,

    /// Keep the unconverted file next to the output as <filename>.old
    #[arg(long, default_value_t = false)]
    pub keep_original: bool,

    /// API token
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// History endpoint URL
    #[arg(long, default_value = HISTORY_URL)]
    pub endpoint: String,

    /// Hours of history per request
    #[arg(long, default_value_t = HOURLY_TIME_CHUNK_SIZE as u32, value_parser = clap::value_parser!(u32).range(1..=720))]
    pub chunk_hours: u32,

    /// Rows converted per chunk
    #[arg(long, default_value_t = DEFAULT_ROW_CHUNK_SIZE, value_parser = parse_row_chunk_size)]
    pub row_chunk_size: usize,

    /// Do not draw a progress bar
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl HistoryArgs {
    /// Download, optionally convert, and report.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        debug!(
            start = ?self.start_time,
            end = ?self.end_time,
            timezone = ?self.timezone,
            filename = ?self.filename,
            "History arguments"
        );

        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                error!("{}", MISSING_TOKEN_MESSAGE);
                CliError::ConfigurationError(MISSING_TOKEN_MESSAGE.to_string())
            })?;

        let windows = RangeSplitter::new()
            .with_chunk_hours(self.chunk_hours)
            .get_date_range(self.start_time, self.end_time, self.timezone.as_deref())?;
        if windows.is_empty() {
            return Err(CliError::InvalidArgument(
                "requested time range was rejected, see the log for the reasons".to_string(),
            ));
        }

        let path = resolve_filename(self.filename.clone(), &Local::now());
        let config = HistoryConfig::new(SecretString::from(token.to_string()))
            .with_endpoint(&self.endpoint)
            .with_max_retries(cli.max_retries);
        let client = HistoryClient::new(Client::new(), &config);
        let show_progress = cli.output_format == OutputFormat::Human && !self.no_progress;

        let mut summary = HistoryDownloader::new(client)
            .with_progress(show_progress)
            .download(&windows, &path)
            .await?;

        let conversion = if !self.convert_time {
            None
        } else if summary.rows == 0 {
            warn!("No rows were written to {}, skipping conversion", path.display());
            None
        } else {
            let zone = resolve_timezone(self.timezone.as_deref())?;
            info!(
                "Converting {} timestamps to local time with timezone {}",
                path.display(),
                zone
            );
            Some(rewrite_in_background(path.clone(), zone, self.keep_original, self.row_chunk_size).await)
        };

        let conversion_summary = conversion.as_ref().and_then(|result| result.as_ref().ok());
        match cli.output_format {
            OutputFormat::Json => output_json(&summary, conversion_summary)?,
            OutputFormat::Human => output_human(&summary, conversion_summary),
        }

        if let Some(failure) = summary.failure.take() {
            return Err(failure.into());
        }
        if let Some(Err(e)) = conversion {
            return Err(e);
        }
        Ok(())
    }
}

fn output_json(
    summary: &DownloadSummary,
    conversion: Option<&RewriteSummary>,
) -> Result<(), CliError> {
    let output = serde_json::json!({
        "success": summary.is_complete(),
        "output_path": summary.path.display().to_string(),
        "windows_completed": summary.windows_completed,
        "windows_total": summary.windows_total,
        "rows_written": summary.rows,
        "api_requests": summary.api_requests,
        "retries": summary.retries,
        "converted": conversion.is_some(),
        "original_path": conversion
            .and_then(|c| c.original.as_ref())
            .map(|p| p.display().to_string()),
        "error": summary.failure.as_ref().map(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn output_human(summary: &DownloadSummary, conversion: Option<&RewriteSummary>) {
    if summary.is_complete() {
        println!("\nHistory download completed successfully!");
    } else {
        eprintln!("\nHistory download stopped early!");
    }
    println!("Output: {}", summary.path.display());
    println!(
        "Windows: {}/{}",
        summary.windows_completed, summary.windows_total
    );
    println!("Rows written: {}", summary.rows);
    if summary.retries > 0 {
        println!("Retries: {}", summary.retries);
    }
    if let Some(conversion) = conversion {
        println!("Timestamps converted: {} rows", conversion.rows);
        if let Some(original) = &conversion.original {
            println!("Original kept at: {}", original.display());
        }
    }
    if let Some(e) = &summary.failure {
        eprintln!("Error: {e}");
    }
}
