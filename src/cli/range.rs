//! Range command implementation

use crate::cli::{parse_timestamp, Cli, CliError, OutputFormat};
use crate::convert::to_epoch_millis;
use crate::range::{RangeSplitter, TimeInterval, TimestampInput, HOURLY_TIME_CHUNK_SIZE};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Arguments of the range command
#[derive(Parser, Debug)]
pub struct RangeArgs {
    /// Start time. Default: one day before the end
    #[arg(short = 's', long, value_parser = parse_timestamp)]
    pub start_time: Option<TimestampInput>,

    /// End time. Default: now
    #[arg(short = 'e', long, value_parser = parse_timestamp)]
    pub end_time: Option<TimestampInput>,

    /// IANA time zone name. Default: the local zone
    #[arg(short = 'z', long)]
    pub timezone: Option<String>,

    /// Hours per window
    #[arg(long, default_value_t = HOURLY_TIME_CHUNK_SIZE as u32, value_parser = clap::value_parser!(u32).range(1..=720))]
    pub chunk_hours: u32,
}

/// One window as printed by the range command.
#[derive(Debug, Serialize)]
struct WindowReport {
    local_start: String,
    local_end: String,
    utc_start: String,
    utc_end: String,
    start_ms: i64,
    end_ms: i64,
}

impl From<&TimeInterval> for WindowReport {
    fn from(window: &TimeInterval) -> Self {
        Self {
            local_start: window.start.format(DISPLAY_FORMAT).to_string(),
            local_end: window.end.format(DISPLAY_FORMAT).to_string(),
            utc_start: window.start.with_timezone(&Utc).format(DISPLAY_FORMAT).to_string(),
            utc_end: window.end.with_timezone(&Utc).format(DISPLAY_FORMAT).to_string(),
            start_ms: to_epoch_millis(&window.start),
            end_ms: to_epoch_millis(&window.end),
        }
    }
}

impl RangeArgs {
    /// Print the windows of the requested range.
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let windows = RangeSplitter::new()
            .with_chunk_hours(self.chunk_hours)
            .get_date_range(self.start_time, self.end_time, self.timezone.as_deref())?;
        if windows.is_empty() {
            return Err(CliError::InvalidArgument(
                "requested time range was rejected, see the log for the reasons".to_string(),
            ));
        }

        let reports: Vec<WindowReport> = windows.iter().map(WindowReport::from).collect();
        match cli.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&reports)?),
            OutputFormat::Human => {
                for report in &reports {
                    println!("Local: {} to {}", report.local_start, report.local_end);
                    println!("UTC: {} to {}", report.utc_start, report.utc_end);
                    println!("Timestamp (msec): {} to {}", report.start_ms, report.end_ms);
                }
            }
        }
        Ok(())
    }
}
