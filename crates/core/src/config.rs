use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub metrics: MetricsConfig,
    pub signals: SignalsConfig,
    pub qa: QaConfig,
}

/// File locations, relative to `root` unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub root: PathBuf,
    pub canonical: PathBuf,
    pub markets: PathBuf,
    pub output_dir: PathBuf,
}

/// Window parameters for the metrics builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Trailing observations in the 5Y window (weekly cadence).
    pub window_5y: usize,
    /// Non-null observations required before a 5Y statistic is emitted.
    pub min_periods_5y: usize,
    /// Open-interest change lookbacks, in weeks.
    pub horizons: Vec<usize>,
}

/// Thresholds for the ACTIVE/PAUSE signal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalsConfig {
    /// Minimum |net flow| as a fraction of open interest.
    pub min_flow_pct_oi: f64,
    /// Minimum week-over-week open-interest change to confirm a flow.
    pub min_oi_chg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaConfig {
    /// Maximum tolerated share of nulls in a numeric canonical column.
    pub max_null_ratio: f64,
}

impl PathsConfig {
    /// Resolves a configured path against `root`.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    #[must_use]
    pub fn canonical_path(&self) -> PathBuf {
        self.resolve(&self.canonical)
    }

    #[must_use]
    pub fn markets_path(&self) -> PathBuf {
        self.resolve(&self.markets)
    }

    #[must_use]
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.resolve(&self.output_dir).join(file_name)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                root: PathBuf::from("."),
                canonical: PathBuf::from("data/canonical/cot_weekly_canonical.parquet"),
                markets: PathBuf::from("configs/markets.yaml"),
                output_dir: PathBuf::from("data/compute"),
            },
            metrics: MetricsConfig::default(),
            signals: SignalsConfig {
                min_flow_pct_oi: 0.005,
                min_oi_chg: 0.0,
            },
            qa: QaConfig {
                max_null_ratio: 0.001,
            },
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_5y: 260,
            min_periods_5y: 52,
            horizons: vec![1, 4, 13],
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        AppConfig::default().signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_windows() {
        let config = MetricsConfig::default();
        assert_eq!(config.window_5y, 260);
        assert_eq!(config.min_periods_5y, 52);
        assert_eq!(config.horizons, vec![1, 4, 13]);
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let mut paths = AppConfig::default().paths;
        paths.root = PathBuf::from("/srv/cot");
        assert_eq!(
            paths.canonical_path(),
            PathBuf::from("/srv/cot/data/canonical/cot_weekly_canonical.parquet")
        );
        assert_eq!(
            paths.output_path("metrics_weekly.parquet"),
            PathBuf::from("/srv/cot/data/compute/metrics_weekly.parquet")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut paths = AppConfig::default().paths;
        paths.markets = PathBuf::from("/etc/cot/markets.yaml");
        assert_eq!(paths.markets_path(), PathBuf::from("/etc/cot/markets.yaml"));
    }
}
