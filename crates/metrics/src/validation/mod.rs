//! Validation engine for the metrics table.
//!
//! Each check is a plain function from a table (and the window settings the
//! table was built with) to a list of violation messages. Checks are independent: a check skips columns it cannot find
//! (the shape check reports those), and never panics on malformed input.
//! Messages read `check[column]: detail`, at most one per column and rule.
//!
//! # Example
//!
//! ```ignore
//! use cotdash_metrics::validation::ValidationReport;
//!
//! let report = ValidationReport::run(&metrics);
//! if !report.passed() {
//!     for violation in report.violations() {
//!         eprintln!("{violation}");
//!     }
//! }
//! ```

mod deltas;
mod exposure;
mod flips;
mod heat;
mod net;
mod open_interest;
mod rebalance;
mod shape;
pub(crate) mod support;

pub use deltas::check_wow_deltas;
pub use exposure::check_exposure_shares;
pub use flips::check_flips;
pub use heat::{check_heat_5y, check_heat_all};
pub use net::{check_net_formulas, check_net_side_gap};
pub use open_interest::check_open_interest;
pub use rebalance::check_rebalance;
pub use shape::check_shape;

use crate::grouping::partition_by_market;
use crate::schema::{MARKET_KEY, REPORT_DATE};
use cotdash_core::MetricsConfig;
use cotdash_data::{Column, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A named metric check.
pub type Check = fn(&Table, &MetricsConfig) -> Vec<String>;

/// Every check, in execution order.
pub const CHECKS: &[(&str, Check)] = &[
    ("shape", |table, _| check_shape(table)),
    ("heat_all", |table, _| check_heat_all(table)),
    ("heat_5y", check_heat_5y),
    ("wow_deltas", |table, _| check_wow_deltas(table)),
    ("net_formulas", |table, _| check_net_formulas(table)),
    ("net_side_gap", |table, _| check_net_side_gap(table)),
    ("flips", |table, _| check_flips(table)),
    ("rebalance", |table, _| check_rebalance(table)),
    ("open_interest", |table, _| check_open_interest(table)),
    ("exposure_shares", |table, _| check_exposure_shares(table)),
];

/// Runs every check with the default window settings.
///
/// An empty result means the table is publishable.
#[must_use]
pub fn validate_metrics(table: &Table) -> Vec<String> {
    validate_metrics_with(table, &MetricsConfig::default())
}

/// Runs every check against a table built with `config`.
#[must_use]
pub fn validate_metrics_with(table: &Table, config: &MetricsConfig) -> Vec<String> {
    CHECKS.iter().flat_map(|(_, check)| check(table, config)).collect()
}

/// Violations found by one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: String,
    pub violations: Vec<String>,
}

/// Outcome of validating one metrics table, suitable for a JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rows: usize,
    pub columns: usize,
    pub markets: usize,
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    /// [`Self::run_with`] using the default window settings.
    #[must_use]
    pub fn run(table: &Table) -> Self {
        Self::run_with(table, &MetricsConfig::default())
    }

    /// Runs every check in [`CHECKS`] and logs a summary.
    #[must_use]
    pub fn run_with(table: &Table, config: &MetricsConfig) -> Self {
        let markets = match (
            table.column(MARKET_KEY).and_then(Column::as_text),
            table.column(REPORT_DATE).and_then(Column::as_date),
        ) {
            (Some(keys), Some(dates)) => partition_by_market(keys, dates).len(),
            _ => 0,
        };

        let checks: Vec<CheckOutcome> = CHECKS
            .iter()
            .map(|(name, check)| {
                let violations = check(table, config);
                debug!(check = *name, violations = violations.len(), "Ran metrics check");
                CheckOutcome {
                    check: (*name).to_string(),
                    violations,
                }
            })
            .collect();

        let report = Self {
            rows: table.height(),
            columns: table.width(),
            markets,
            checks,
        };
        if report.passed() {
            info!(rows = report.rows, markets = report.markets, "Metrics validation passed");
        } else {
            warn!(
                violations = report.violation_count(),
                rows = report.rows,
                "Metrics validation failed"
            );
        }
        report
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.violations.is_empty())
    }

    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.checks.iter().map(|c| c.violations.len()).sum()
    }

    /// All violation messages in check order.
    pub fn violations(&self) -> impl Iterator<Item = &str> {
        self.checks
            .iter()
            .flat_map(|c| c.violations.iter().map(String::as_str))
    }
}
