//! Main entry point for the location-history-downloader CLI

use clap::Parser;
use location_history_downloader::cli::{Cli, Commands};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting and log file
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("location_history_downloader=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("cannot open log file {}: {}", path.display(), e))?;
            let writer = Mutex::new(file);
            if json_format {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(writer)
                    .init();
            }
        }
        None if json_format => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments first, the log destination is one of them
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    // Execute command
    let result = match cli.command {
        Commands::History(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Range(ref args) => args.execute(&cli).map_err(|e| anyhow::anyhow!(e)),
        Commands::Convert(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
    };

    // Handle result
    if let Err(e) = result {
        error!("Command failed: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
