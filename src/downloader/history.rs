//! History downloader

use crate::downloader::{DownloadError, DownloadSummary};
use crate::fetcher::HistoryClient;
use crate::is_history_header;
use crate::output::{check_file_writable, OutputError};
use crate::range::TimeInterval;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Fetches windows sequentially into one CSV file.
pub struct HistoryDownloader {
    client: HistoryClient,
    show_progress: bool,
}

impl HistoryDownloader {
    /// Create a downloader without a progress bar.
    pub fn new(client: HistoryClient) -> Self {
        Self {
            client,
            show_progress: false,
        }
    }

    /// Draw a progress bar over the windows.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Fetch every window into `path`, truncating it first.
    ///
    /// Stops at the first window that fails; rows written before it stay in the
    /// file and the error is returned in [`DownloadSummary::failure`].
    pub async fn download(
        &self,
        windows: &[TimeInterval],
        path: &Path,
    ) -> Result<DownloadSummary, DownloadError> {
        if windows.is_empty() {
            return Err(DownloadError::ValidationError(
                "no time windows to download".to_string(),
            ));
        }
        if !check_file_writable(path) {
            error!(
                "File {} cannot be written. Check path and permissions",
                path.display()
            );
            return Err(OutputError::NotWritable(path.display().to_string()).into());
        }
        debug!("File {} is suitable for writing", path.display());

        let mut file = HistoryFile::create(path)?;
        let progress = self.progress_bar(windows.len());
        let mut summary = DownloadSummary {
            path: path.to_path_buf(),
            rows: 0,
            windows_completed: 0,
            windows_total: windows.len(),
            api_requests: 0,
            retries: 0,
            failure: None,
        };

        info!("Connecting to {}. This may take a minute or two.", self.client.endpoint());

        for (index, window) in windows.iter().enumerate() {
            progress.set_message(format!("{} to {}", window.start, window.end));
            let mut first_line = true;

            let result = self
                .client
                .fetch_window(window, |line| {
                    let written = file.write_line(line, first_line);
                    first_line = false;
                    written
                })
                .await;

            match result {
                Ok(stats) => {
                    summary.windows_completed += 1;
                    summary.api_requests += u64::from(stats.attempts);
                    summary.retries += u64::from(stats.retries());
                    info!(
                        "Window {}/{} done. Wrote {} lines so far to {}",
                        index + 1,
                        windows.len(),
                        file.rows,
                        path.display()
                    );
                    progress.inc(1);
                }
                Err(e) => {
                    summary.api_requests += u64::from(e.attempts);
                    summary.retries += u64::from(e.attempts.saturating_sub(1));
                    error!(
                        "Unable to fetch window {}/{} ({} to {}): {}",
                        index + 1,
                        windows.len(),
                        window.start,
                        window.end,
                        e
                    );
                    summary.failure = Some(e.error);
                    break;
                }
            }
        }

        summary.rows = file.finish()?;
        if summary.failure.is_some() {
            progress.abandon_with_message("stopped on error");
        } else {
            progress.finish_with_message("done");
        }
        info!(
            rows = summary.rows,
            windows = summary.windows_completed,
            requests = summary.api_requests,
            "Finished."
        );
        Ok(summary)
    }

    fn progress_bar(&self, windows: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(windows as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} windows {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}

/// Destination file with header de-duplication across windows.
struct HistoryFile {
    writer: BufWriter<File>,
    header: Option<String>,
    rows: u64,
}

impl HistoryFile {
    fn create(path: &Path) -> Result<Self, OutputError> {
        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
            header: None,
            rows: 0,
        })
    }

    /// Write one body line. The first line of a window is its header.
    fn write_line(&mut self, line: &str, first_in_window: bool) -> std::io::Result<()> {
        if first_in_window {
            match &self.header {
                None => {
                    let fields: Vec<&str> = line.split(',').collect();
                    if !is_history_header(&fields) {
                        warn!("Unexpected header with {} columns: {}", fields.len(), line);
                    }
                    writeln!(self.writer, "{}", line)?;
                    self.header = Some(line.to_string());
                    return Ok(());
                }
                Some(header) if header == line => return Ok(()),
                Some(_) => {
                    let fields: Vec<&str> = line.split(',').collect();
                    if is_history_header(&fields) {
                        warn!("Window header differs from the file header, skipping it: {}", line);
                        return Ok(());
                    }
                    // No header in this window; the line is data
                }
            }
        }
        writeln!(self.writer, "{}", line)?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<u64, OutputError> {
        let file = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::FlushError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| OutputError::FlushError(e.to_string()))?;
        Ok(self.rows)
    }
}
