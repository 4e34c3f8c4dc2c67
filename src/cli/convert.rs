//! Convert command implementation

use crate::cli::{parse_row_chunk_size, Cli, CliError, OutputFormat};
use crate::convert::{rewrite_file, RewriteSummary, DEFAULT_ROW_CHUNK_SIZE};
use crate::range::{resolve_timezone, ResolvedZone};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// History CSV file to rewrite in place
    #[arg(value_name = "FILENAME")]
    pub filename: PathBuf,

    /// IANA time zone name. Default: the local zone
    #[arg(short = 'z', long)]
    pub timezone: Option<String>,

    /// Keep the unconverted file as <filename>.old
    #[arg(long, default_value_t = false)]
    pub keep_original: bool,

    /// Rows converted per chunk
    #[arg(long, default_value_t = DEFAULT_ROW_CHUNK_SIZE, value_parser = parse_row_chunk_size)]
    pub row_chunk_size: usize,
}

impl ConvertArgs {
    /// Rewrite the file and report.
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let zone = resolve_timezone(self.timezone.as_deref())?;
        info!(
            "Converting {} timestamps to local time with timezone {}",
            self.filename.display(),
            zone
        );

        let summary = rewrite_in_background(
            self.filename.clone(),
            zone,
            self.keep_original,
            self.row_chunk_size,
        )
        .await?;

        match cli.output_format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "success": true,
                    "output_path": summary.path.display().to_string(),
                    "timezone": zone.name(),
                    "rows": summary.rows,
                    "chunks": summary.chunks,
                    "original_path": summary.original.as_ref().map(|p| p.display().to_string()),
                });
                println!("{}", serde_json::to_string(&output)?);
            }
            OutputFormat::Human => {
                println!("\nConversion completed successfully!");
                println!("Output: {}", summary.path.display());
                println!("Time zone: {}", zone);
                println!("Rows converted: {}", summary.rows);
                if let Some(original) = &summary.original {
                    println!("Original kept at: {}", original.display());
                }
            }
        }
        Ok(())
    }
}

/// Run the blocking CSV rewrite off the async runtime.
pub(crate) async fn rewrite_in_background(
    path: PathBuf,
    zone: ResolvedZone,
    keep_original: bool,
    chunk_size: usize,
) -> Result<RewriteSummary, CliError> {
    tokio::task::spawn_blocking(move || rewrite_file(&path, zone, keep_original, chunk_size))
        .await
        .map_err(|e| CliError::TaskError(e.to_string()))?
        .map_err(CliError::from)
}
