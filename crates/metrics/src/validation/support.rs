//! Shared plumbing for the metric checks.

use crate::grouping::{partition_by_market, MarketRows};
use crate::schema::{MARKET_KEY, REPORT_DATE};
use cotdash_data::{Column, ColumnType, Table};
use std::fmt::Display;

/// Absolute tolerance for recomputed formulas.
pub(crate) const TOLERANCE: f64 = 1e-6;
/// Slack allowed on `[0, 1]` bounds.
pub(crate) const BOUND_TOLERANCE: f64 = 1e-9;

/// Violation messages of one check, prefixed `check[column]: `.
pub(crate) struct Violations {
    check: &'static str,
    messages: Vec<String>,
}

impl Violations {
    pub fn new(check: &'static str) -> Self {
        Self {
            check,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, column: &str, detail: impl Display) {
        self.messages.push(format!("{}[{column}]: {detail}", self.check));
    }

    /// Float column lookup: silent when absent, a violation when mistyped.
    pub fn float<'a>(&mut self, table: &'a Table, name: &str) -> Option<&'a [Option<f64>]> {
        let column = table.column(name)?;
        let values = column.as_float();
        if values.is_none() {
            self.push(
                name,
                format!("expected {} column, found {}", ColumnType::Float, column.column_type()),
            );
        }
        values
    }

    /// Text column lookup with the same rules as [`Self::float`].
    pub fn text<'a>(&mut self, table: &'a Table, name: &str) -> Option<&'a [Option<String>]> {
        let column = table.column(name)?;
        let values = column.as_text();
        if values.is_none() {
            self.push(
                name,
                format!("expected {} column, found {}", ColumnType::Text, column.column_type()),
            );
        }
        values
    }

    /// Reports values outside `[lo, hi]` (with [`BOUND_TOLERANCE`]).
    pub fn bounded(&mut self, column: &str, values: &[Option<f64>], lo: f64, hi: f64) {
        let outside: Vec<f64> = values
            .iter()
            .flatten()
            .copied()
            .filter(|v| *v < lo - BOUND_TOLERANCE || *v > hi + BOUND_TOLERANCE)
            .collect();
        if let Some(first) = outside.first() {
            self.push(
                column,
                format!("{} values outside [{lo}, {hi}] (e.g. {first})", outside.len()),
            );
        }
    }

    /// Reports NaN or infinite values.
    pub fn finite(&mut self, column: &str, values: &[Option<f64>]) {
        let bad = values.iter().flatten().filter(|v| !v.is_finite()).count();
        if bad > 0 {
            self.push(column, format!("{bad} non-finite values"));
        }
    }

    /// Reports null cells.
    pub fn no_nulls(&mut self, column: &str, values: &[Option<f64>]) {
        let nulls = values.iter().filter(|v| v.is_none()).count();
        if nulls > 0 {
            self.push(column, format!("{nulls} null values"));
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.messages
    }
}

/// Rows where a stored value disagrees with a recomputed one.
#[derive(Debug, Default)]
pub(crate) struct Mismatches {
    rows: usize,
    worst: f64,
}

impl Mismatches {
    /// Compares when both sides are known; true when the row disagreed.
    pub fn compare(&mut self, actual: Option<f64>, expected: Option<f64>) -> bool {
        let Some(error) = actual.zip(expected).map(|(a, e)| (a - e).abs()) else {
            return false;
        };
        let differs = error > TOLERANCE || error.is_nan();
        if differs {
            self.rows += 1;
            self.worst = self.worst.max(error);
        }
        differs
    }

    /// Emits one message when any row disagreed.
    pub fn report(self, violations: &mut Violations, column: &str, formula: &str) {
        if self.rows > 0 {
            violations.push(
                column,
                format!(
                    "{} rows differ from {formula} by more than {TOLERANCE:e} (max error {:.6e})",
                    self.rows, self.worst
                ),
            );
        }
    }
}

/// Per-market row partitions; empty when the key columns are unusable.
pub(crate) fn markets(table: &Table) -> Vec<MarketRows> {
    let keys = table.column(MARKET_KEY).and_then(Column::as_text);
    let dates = table.column(REPORT_DATE).and_then(Column::as_date);
    match (keys, dates) {
        (Some(keys), Some(dates)) => partition_by_market(keys, dates),
        _ => Vec::new(),
    }
}

/// Calls `f(previous_row, current_row)` for consecutive rows of each market.
pub(crate) fn for_each_step(markets: &[MarketRows], mut f: impl FnMut(usize, usize)) {
    for market in markets {
        for pair in market.rows.windows(2) {
            f(pair[0], pair[1]);
        }
    }
}
