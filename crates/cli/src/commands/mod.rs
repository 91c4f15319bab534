//! CLI commands for the positioning metrics pipeline.

pub mod compute;
pub mod qa;
pub mod signals;
pub mod validate;

pub use compute::{run_compute, ComputeArgs};
pub use qa::{run_qa, QaArgs};
pub use signals::{run_signals, SignalsArgs};
pub use validate::{run_validate, ValidateArgs};

use anyhow::{bail, Context, Result};
use cotdash_core::{AppConfig, ConfigLoader, MarketCatalog};
use cotdash_data::{ParquetStorage, Table};
use std::path::{Path, PathBuf};

/// Published metrics file name inside the output directory.
pub const METRICS_FILE: &str = "metrics_weekly.parquet";
pub const METRICS_CSV_FILE: &str = "metrics_weekly.csv";
pub const SIGNALS_FILE: &str = "signal_status.parquet";
pub const SIGNALS_CSV_FILE: &str = "signal_status.csv";

/// Loads configuration and pins `paths.root` to `--root` when given.
///
/// # Errors
/// Returns an error if the config file exists but cannot be parsed.
pub fn load_config(root: Option<&Path>, config: &Path, profile: Option<&str>) -> Result<AppConfig> {
    let config_path = match root {
        Some(root) if config.is_relative() => root.join(config),
        _ => config.to_path_buf(),
    };

    let mut app = match profile {
        Some(profile) => ConfigLoader::load_with_profile(&config_path, profile),
        None => ConfigLoader::load(&config_path),
    }
    .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(root) = root {
        app.paths.root = root.to_path_buf();
    }
    tracing::debug!(config = %config_path.display(), root = %app.paths.root.display(), "Loaded configuration");
    Ok(app)
}

/// Resolves an optional CLI path override against the configured root.
pub(crate) fn resolve_or(config: &AppConfig, path: Option<&Path>, default: PathBuf) -> PathBuf {
    path.map_or(default, |p| config.paths.resolve(p))
}

pub(crate) fn read_parquet(path: &Path, what: &str) -> Result<Table> {
    if !path.exists() {
        bail!("{what} not found: {}", path.display());
    }
    let table = ParquetStorage::read_table(path)
        .with_context(|| format!("Failed to read {what} from {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "Loaded {what}"
    );
    Ok(table)
}

pub(crate) fn load_catalog(config: &AppConfig) -> Result<MarketCatalog> {
    let path = config.paths.markets_path();
    let catalog = MarketCatalog::load(&path)
        .with_context(|| format!("Failed to load market catalog from {}", path.display()))?;
    tracing::info!(markets = catalog.len(), path = %path.display(), "Loaded market catalog");
    Ok(catalog)
}
