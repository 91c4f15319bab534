//! Signals command: ACTIVE/PAUSE status from published metrics.

use anyhow::{Context, Result};
use clap::Args;
use cotdash_core::AppConfig;
use cotdash_data::{CsvStorage, ParquetStorage};
use cotdash_metrics::build_signal_status;
use cotdash_metrics::signals::{SignalStatus, STATUS};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::{read_parquet, resolve_or, METRICS_FILE, SIGNALS_CSV_FILE, SIGNALS_FILE};

/// Arguments for the signals command.
#[derive(Args, Debug, Clone)]
pub struct SignalsArgs {
    /// Metrics Parquet file (defaults to the published metrics)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output Parquet file (defaults to signal_status.parquet in paths.output_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Also write a CSV copy next to the Parquet output
    #[arg(long)]
    pub csv: bool,
}

/// Runs the signals command.
///
/// # Errors
/// Returns an error if the metrics cannot be read, lack the required
/// columns, or the status table cannot be written.
pub fn run_signals(args: SignalsArgs, config: &AppConfig) -> Result<()> {
    let input = resolve_or(config, args.input.as_deref(), config.paths.output_path(METRICS_FILE));
    let metrics = read_parquet(&input, "metrics table")?;

    let status = build_signal_status(&metrics, &config.signals)
        .context("Failed to build signal status")?;

    let output = resolve_or(config, args.output.as_deref(), config.paths.output_path(SIGNALS_FILE));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    ParquetStorage::write_table(&output, &status)?;
    if args.csv {
        CsvStorage::write_table(output.with_file_name(SIGNALS_CSV_FILE), &status)?;
    }

    let active = status
        .texts(STATUS)?
        .iter()
        .filter(|s| s.as_deref() == Some(SignalStatus::Active.as_str()))
        .count();
    info!(
        path = %output.display(),
        rows = status.height(),
        active,
        "Wrote signal status"
    );
    Ok(())
}
