//! Compute command.
//!
//! Full pipeline: canonical Parquet in, validated metrics Parquet out. The
//! metrics are published only when every validation check passes.

use anyhow::{bail, Context, Result};
use clap::Args;
use cotdash_core::AppConfig;
use cotdash_data::{CsvStorage, ParquetStorage};
use cotdash_metrics::{run_canonical_qa, MetricsBuilder, ValidationReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{load_catalog, read_parquet, resolve_or, METRICS_CSV_FILE, METRICS_FILE};

/// Arguments for the compute command.
#[derive(Args, Debug, Clone, Default)]
pub struct ComputeArgs {
    /// Canonical Parquet input (defaults to paths.canonical)
    #[arg(long)]
    pub canonical: Option<PathBuf>,

    /// Output directory (defaults to paths.output_dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Also write metrics_weekly.csv next to the Parquet file
    #[arg(long)]
    pub csv: bool,

    /// Write the validation report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub(crate) fn write_report(path: &Path, report: &ValidationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, json)
        .with_context(|| format!("Failed to write validation report: {}", path.display()))?;
    info!(path = %path.display(), "Wrote validation report");
    Ok(())
}

/// Runs the compute command.
///
/// # Errors
/// Returns an error if inputs cannot be loaded, the builder rejects them,
/// validation finds any violation, or the outputs cannot be written.
pub fn run_compute(args: ComputeArgs, config: &AppConfig) -> Result<()> {
    let canonical_path = resolve_or(config, args.canonical.as_deref(), config.paths.canonical_path());
    let canonical = read_parquet(&canonical_path, "canonical table")?;
    let catalog = load_catalog(config)?;

    let qa = run_canonical_qa(&canonical, catalog.market_to_contract(), &config.qa);
    for violation in &qa {
        warn!("{violation}");
    }

    let metrics = MetricsBuilder::new(config.metrics.clone())
        .build(
            &canonical,
            catalog.market_to_category(),
            catalog.market_to_contract(),
        )
        .context("Failed to build weekly metrics")?;

    let report = ValidationReport::run_with(&metrics, &config.metrics);
    if let Some(path) = &args.report {
        write_report(&config.paths.resolve(path), &report)?;
    }
    if !report.passed() {
        for violation in report.violations() {
            error!("{violation}");
        }
        bail!(
            "Metrics failed validation with {} violations; nothing was written",
            report.violation_count()
        );
    }

    let output_dir = resolve_or(
        config,
        args.output_dir.as_deref(),
        config.paths.resolve(&config.paths.output_dir),
    );
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let parquet_path = output_dir.join(METRICS_FILE);
    ParquetStorage::write_table(&parquet_path, &metrics)?;
    if args.csv {
        CsvStorage::write_table(output_dir.join(METRICS_CSV_FILE), &metrics)?;
    }

    info!(
        path = %parquet_path.display(),
        rows = metrics.height(),
        columns = metrics.width(),
        markets = report.markets,
        "Published weekly metrics"
    );
    Ok(())
}
