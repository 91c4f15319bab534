//! QA command: canonical input quality gate.

use anyhow::{bail, Result};
use clap::Args;
use cotdash_core::AppConfig;
use cotdash_metrics::run_canonical_qa;
use std::path::PathBuf;

use super::{load_catalog, read_parquet, resolve_or};

/// Arguments for the qa command.
#[derive(Args, Debug, Clone)]
pub struct QaArgs {
    /// Canonical Parquet input (defaults to paths.canonical)
    #[arg(long)]
    pub canonical: Option<PathBuf>,
}

/// Runs the qa command.
///
/// # Errors
/// Returns an error if inputs cannot be loaded or any QA rule is violated.
pub fn run_qa(args: QaArgs, config: &AppConfig) -> Result<()> {
    let path = resolve_or(config, args.canonical.as_deref(), config.paths.canonical_path());
    let canonical = read_parquet(&path, "canonical table")?;
    let catalog = load_catalog(config)?;

    let violations = run_canonical_qa(&canonical, catalog.market_to_contract(), &config.qa);
    if violations.is_empty() {
        println!("Canonical QA passed: {} rows", canonical.height());
        return Ok(());
    }

    for violation in &violations {
        println!("{violation}");
    }
    bail!("Canonical QA failed with {} violations", violations.len());
}
