//! Quality gate for the canonical weekly table.
//!
//! Runs before the builder. Like the metric checks it reports problems as
//! messages instead of failing, leaving the caller to decide whether to stop.

use crate::grouping::duplicate_key_count;
use crate::schema::{CONTRACT_CODE, MARKET_KEY, OPEN_INTEREST, REPORT_DATE};
use crate::validation::support::Violations;
use cotdash_core::{normalize_contract_code, QaConfig};
use cotdash_data::{columns, Column, Table};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Listing cap for offending keys in one message.
const MAX_LISTED: usize = 10;

fn listed<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let items: Vec<&str> = items.into_iter().collect();
    let shown = items.iter().take(MAX_LISTED).copied().collect::<Vec<_>>().join(", ");
    if items.len() > MAX_LISTED {
        format!("{shown}, ... ({} total)", items.len())
    } else {
        shown
    }
}

/// Checks canonical rows against the market whitelist and basic hygiene rules.
///
/// `market_to_contract` supplies both the whitelisted keys and the allowed
/// contract codes.
#[must_use]
pub fn run_canonical_qa(
    canonical: &Table,
    market_to_contract: &BTreeMap<String, String>,
    config: &QaConfig,
) -> Vec<String> {
    let mut v = Violations::new("qa");

    for name in [
        MARKET_KEY,
        REPORT_DATE,
        CONTRACT_CODE,
        columns::NC_LONG,
        columns::NC_SHORT,
        columns::COMM_LONG,
        columns::COMM_SHORT,
    ] {
        if !canonical.has_column(name) {
            v.push(name, "required column is missing");
        }
    }
    if !canonical.has_column(OPEN_INTEREST) && !canonical.has_column(columns::OPEN_INTEREST_ALL) {
        v.push(OPEN_INTEREST, "required column is missing");
    }

    let keys = canonical.column(MARKET_KEY).and_then(Column::as_text);
    let dates = canonical.column(REPORT_DATE).and_then(Column::as_date);

    if let (Some(keys), Some(dates)) = (keys, dates) {
        let duplicates = duplicate_key_count(keys, dates);
        if duplicates > 0 {
            v.push("market_key, report_date", format!("{duplicates} duplicate rows"));
        }
    }

    if let Some(keys) = keys {
        let unexpected: BTreeSet<&str> = keys
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|k| !market_to_contract.contains_key(*k))
            .collect();
        if !unexpected.is_empty() {
            v.push(
                MARKET_KEY,
                format!("markets outside the whitelist: {}", listed(unexpected)),
            );
        }
    }

    if let Some(codes) = canonical.column(CONTRACT_CODE).and_then(Column::as_text) {
        let allowed: BTreeSet<String> = market_to_contract
            .values()
            .map(|c| normalize_contract_code(c))
            .collect();
        let unknown: BTreeSet<String> = codes
            .iter()
            .flatten()
            .map(|c| normalize_contract_code(c))
            .filter(|c| !allowed.contains(c))
            .collect();
        if !unknown.is_empty() {
            v.push(
                CONTRACT_CODE,
                format!("codes outside the configured set: {}", listed(unknown.iter().map(String::as_str))),
            );
        }
    }

    let height = canonical.height();
    if height > 0 {
        for (name, column) in canonical.iter() {
            if column.as_float().is_none() {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let ratio = column.null_count() as f64 / height as f64;
            if ratio > config.max_null_ratio {
                v.push(
                    name,
                    format!("null ratio {ratio:.4} exceeds {}", config.max_null_ratio),
                );
            }
        }
    }

    for name in [OPEN_INTEREST, columns::OPEN_INTEREST_ALL] {
        if let Some(oi) = canonical.column(name).and_then(Column::as_float) {
            let negative = oi.iter().flatten().filter(|x| **x < 0.0).count();
            if negative > 0 {
                v.push(name, format!("{negative} negative values"));
            }
        }
    }

    let violations = v.into_vec();
    if violations.is_empty() {
        info!(rows = height, "Canonical QA passed");
    } else {
        warn!(violations = violations.len(), rows = height, "Canonical QA found issues");
    }
    violations
}
