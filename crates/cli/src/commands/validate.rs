//! Validate command.
//!
//! Re-runs every metrics check against a published file, e.g. after a
//! manual edit or a change in the checks themselves.

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use cotdash_core::AppConfig;
use cotdash_metrics::ValidationReport;
use std::path::PathBuf;

use super::compute::write_report;
use super::{read_parquet, resolve_or, METRICS_FILE};

/// Output format for validation reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Metrics Parquet file (defaults to the published metrics)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the JSON report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn to_text(report: &ValidationReport) -> String {
    let mut out = format!(
        "Metrics validation: {} rows, {} columns, {} markets\n",
        report.rows, report.columns, report.markets
    );
    for outcome in &report.checks {
        if outcome.violations.is_empty() {
            out.push_str(&format!("  [PASS] {}\n", outcome.check));
        } else {
            out.push_str(&format!(
                "  [FAIL] {} ({} violations)\n",
                outcome.check,
                outcome.violations.len()
            ));
            for violation in &outcome.violations {
                out.push_str(&format!("         {violation}\n"));
            }
        }
    }
    out
}

/// Runs the validate command.
///
/// # Errors
/// Returns an error if the file cannot be read or any check fails.
pub fn run_validate(args: ValidateArgs, config: &AppConfig) -> Result<()> {
    let path = resolve_or(config, args.input.as_deref(), config.paths.output_path(METRICS_FILE));
    let metrics = read_parquet(&path, "metrics table")?;

    let report = ValidationReport::run_with(&metrics, &config.metrics);
    match args.format {
        OutputFormat::Text => print!("{}", to_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    if let Some(report_path) = &args.report {
        write_report(&config.paths.resolve(report_path), &report)?;
    }

    if !report.passed() {
        bail!(
            "{} failed validation with {} violations",
            path.display(),
            report.violation_count()
        );
    }
    Ok(())
}
