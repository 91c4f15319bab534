//! ACTIVE/PAUSE status per market and week.
//!
//! A market is ACTIVE when large speculators moved a meaningful share of
//! open interest and open interest confirmed the move.

use crate::error::MetricsError;
use crate::grouping::{duplicate_key_count, partition_by_market};
use crate::schema::{chg_1w, net, TraderGroup, CATEGORY, MARKET_KEY, OPEN_INTEREST, REPORT_DATE};
use crate::windows::safe_ratio;
use cotdash_core::SignalsConfig;
use cotdash_data::{Column, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const FUNDS_FLOW_PCT_OI: &str = "funds_flow_pct_oi";
pub const FLAG_BAD_OI: &str = "flag_bad_oi";
pub const FLAG_FIRST_WEEK: &str = "flag_first_week";
pub const FLAG_FLAT_FLOW: &str = "flag_flat_flow";
pub const STATUS: &str = "status";
pub const REASON_CODE: &str = "reason_code";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Active,
    Pause,
}

impl SignalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Pause => "PAUSE",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a status was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// First week of a market, or open interest missing or non-positive.
    NoHistoryOrBadOi,
    /// Flow above threshold and open interest confirmed it.
    FlowOkOiOk,
    /// Flow above threshold but open interest fell.
    FlowOkOiDown,
    /// Flow below threshold.
    FlowSmall,
}

impl ReasonCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoHistoryOrBadOi => "NO_HISTORY_OR_BAD_OI",
            Self::FlowOkOiOk => "FLOW_OK_OI_OK",
            Self::FlowOkOiDown => "FLOW_OK_OI_DOWN",
            Self::FlowSmall => "FLOW_SMALL",
        }
    }

    #[must_use]
    pub const fn status(self) -> SignalStatus {
        match self {
            Self::FlowOkOiOk => SignalStatus::Active,
            _ => SignalStatus::Pause,
        }
    }
}

/// Classifies one week.
///
/// A missing open-interest change counts as zero.
#[must_use]
pub fn classify(flow_pct_oi: Option<f64>, oi_chg_1w: Option<f64>, config: &SignalsConfig) -> ReasonCode {
    match flow_pct_oi {
        None => ReasonCode::NoHistoryOrBadOi,
        Some(flow) if flow.abs() >= config.min_flow_pct_oi => {
            if oi_chg_1w.unwrap_or(0.0) >= config.min_oi_chg {
                ReasonCode::FlowOkOiOk
            } else {
                ReasonCode::FlowOkOiDown
            }
        }
        Some(_) => ReasonCode::FlowSmall,
    }
}

/// Builds the status table from a metrics table.
///
/// One output row per metrics row, sorted by market then date.
///
/// # Errors
/// Returns an error if a required column is missing or mistyped, or if
/// keys are null or duplicated.
pub fn build_signal_status(metrics: &Table, config: &SignalsConfig) -> Result<Table, MetricsError> {
    let net_chg_name = chg_1w(&net(TraderGroup::Nc));
    let oi_chg_name = chg_1w(OPEN_INTEREST);
    let required = [
        MARKET_KEY,
        REPORT_DATE,
        OPEN_INTEREST,
        net_chg_name.as_str(),
        oi_chg_name.as_str(),
    ];
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !metrics.has_column(name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MetricsError::MissingColumns {
            missing,
            available: metrics.column_names().to_vec(),
        });
    }

    let keys = metrics.texts(MARKET_KEY)?;
    let dates = metrics.dates(REPORT_DATE)?;
    let oi = metrics.floats(OPEN_INTEREST)?;
    let net_chg = metrics.floats(&net_chg_name)?;
    let oi_chg = metrics.floats(&oi_chg_name)?;

    let duplicates = duplicate_key_count(keys, dates);
    if duplicates > 0 {
        return Err(MetricsError::DuplicateKeys { count: duplicates });
    }
    let order: Vec<usize> = partition_by_market(keys, dates)
        .into_iter()
        .flat_map(|m| m.rows)
        .collect();
    if order.len() != metrics.height() {
        return Err(MetricsError::NullKeys {
            count: metrics.height() - order.len(),
        });
    }

    let n = order.len();
    let mut flow = Vec::with_capacity(n);
    let mut bad_oi = Vec::with_capacity(n);
    let mut first_week = Vec::with_capacity(n);
    let mut flat_flow = Vec::with_capacity(n);
    let mut status = Vec::with_capacity(n);
    let mut reason = Vec::with_capacity(n);
    let mut active = 0usize;

    for &row in &order {
        let oi_ok = oi[row].is_some_and(|v| v > 0.0);
        let row_flow = if oi_ok { safe_ratio(net_chg[row], oi[row]) } else { None };
        let code = classify(row_flow, oi_chg[row], config);
        active += usize::from(code.status() == SignalStatus::Active);

        flow.push(row_flow);
        bad_oi.push(Some(!oi_ok));
        first_week.push(Some(net_chg[row].is_none()));
        flat_flow.push(Some(net_chg[row].unwrap_or(0.0) == 0.0));
        status.push(Some(code.status().as_str().to_string()));
        reason.push(Some(code.as_str().to_string()));
    }

    let mut columns = vec![
        (MARKET_KEY.to_string(), Column::Text(order.iter().map(|&r| keys[r].clone()).collect())),
    ];
    if let Some(categories) = metrics.column(CATEGORY).and_then(Column::as_text) {
        columns.push((
            CATEGORY.to_string(),
            Column::Text(order.iter().map(|&r| categories[r].clone()).collect()),
        ));
    }
    columns.extend([
        (REPORT_DATE.to_string(), Column::Date(order.iter().map(|&r| dates[r]).collect())),
        (OPEN_INTEREST.to_string(), Column::Float(order.iter().map(|&r| oi[r]).collect())),
        (net_chg_name.clone(), Column::Float(order.iter().map(|&r| net_chg[r]).collect())),
        (oi_chg_name.clone(), Column::Float(order.iter().map(|&r| oi_chg[r]).collect())),
        (FUNDS_FLOW_PCT_OI.to_string(), Column::Float(flow)),
        (FLAG_BAD_OI.to_string(), Column::Bool(bad_oi)),
        (FLAG_FIRST_WEEK.to_string(), Column::Bool(first_week)),
        (FLAG_FLAT_FLOW.to_string(), Column::Bool(flat_flow)),
        (STATUS.to_string(), Column::Text(status)),
        (REASON_CODE.to_string(), Column::Text(reason)),
    ]);
    let table = Table::from_columns(columns)?;

    info!(rows = n, active, "Built signal status");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> SignalsConfig {
        SignalsConfig {
            min_flow_pct_oi: 0.005,
            min_oi_chg: 0.0,
        }
    }

    #[test]
    fn classify_covers_every_reason() {
        let cfg = config();
        assert_eq!(classify(None, Some(10.0), &cfg), ReasonCode::NoHistoryOrBadOi);
        assert_eq!(classify(Some(0.01), Some(10.0), &cfg), ReasonCode::FlowOkOiOk);
        assert_eq!(classify(Some(-0.01), None, &cfg), ReasonCode::FlowOkOiOk);
        assert_eq!(classify(Some(0.01), Some(-1.0), &cfg), ReasonCode::FlowOkOiDown);
        assert_eq!(classify(Some(0.004), Some(10.0), &cfg), ReasonCode::FlowSmall);
    }

    #[test]
    fn only_flow_ok_oi_ok_is_active() {
        assert_eq!(ReasonCode::FlowOkOiOk.status(), SignalStatus::Active);
        for code in [ReasonCode::NoHistoryOrBadOi, ReasonCode::FlowOkOiDown, ReasonCode::FlowSmall] {
            assert_eq!(code.status(), SignalStatus::Pause);
        }
    }

    fn metrics(keys: &[&str], days: &[u32], oi: &[Option<f64>], net_chg: &[Option<f64>]) -> Table {
        let oi_chg: Vec<Option<f64>> = (0..oi.len())
            .map(|i| if i == 0 { None } else { oi[i].zip(oi[i - 1]).map(|(c, p)| c - p) })
            .collect();
        Table::from_columns(vec![
            (MARKET_KEY.into(), Column::Text(keys.iter().map(|k| Some((*k).to_string())).collect())),
            (
                REPORT_DATE.into(),
                Column::Date(days.iter().map(|d| NaiveDate::from_ymd_opt(2024, 1, *d)).collect()),
            ),
            (OPEN_INTEREST.into(), Column::Float(oi.to_vec())),
            ("nc_net_chg_1w".into(), Column::Float(net_chg.to_vec())),
            ("open_interest_chg_1w".into(), Column::Float(oi_chg)),
        ])
        .unwrap()
    }

    #[test]
    fn builds_status_rows() {
        let table = metrics(
            &["GOLD", "GOLD", "GOLD"],
            &[2, 9, 16],
            &[Some(1000.0), Some(1100.0), Some(0.0)],
            &[None, Some(20.0), Some(50.0)],
        );
        let out = build_signal_status(&table, &config()).unwrap();

        assert_eq!(out.height(), 3);
        let reasons = out.texts(REASON_CODE).unwrap();
        assert_eq!(reasons[0].as_deref(), Some("NO_HISTORY_OR_BAD_OI"));
        assert_eq!(reasons[1].as_deref(), Some("FLOW_OK_OI_OK"));
        assert_eq!(reasons[2].as_deref(), Some("NO_HISTORY_OR_BAD_OI"));

        let bad_oi = out.bools(FLAG_BAD_OI).unwrap();
        assert_eq!(bad_oi, &[Some(false), Some(false), Some(true)]);
        let first = out.bools(FLAG_FIRST_WEEK).unwrap();
        assert_eq!(first, &[Some(true), Some(false), Some(false)]);
        let flat = out.bools(FLAG_FLAT_FLOW).unwrap();
        assert_eq!(flat, &[Some(true), Some(false), Some(false)]);

        let flow = out.floats(FUNDS_FLOW_PCT_OI).unwrap();
        let expected = 20.0 / 1100.0;
        assert!((flow[1].unwrap() - expected).abs() < 1e-12, "flow was {:?}", flow[1]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let table = metrics(&["GOLD", "GOLD"], &[2, 2], &[Some(1.0), Some(1.0)], &[None, None]);
        let err = build_signal_status(&table, &config()).unwrap_err();
        assert!(matches!(err, MetricsError::DuplicateKeys { count: 1 }), "error was {err}");
    }

    #[test]
    fn reports_missing_columns() {
        let table = Table::from_columns(vec![(MARKET_KEY.into(), Column::Text(vec![]))]).unwrap();
        let err = build_signal_status(&table, &config()).unwrap_err();
        assert!(err.to_string().contains("nc_net_chg_1w"), "error was {err}");
    }
}
