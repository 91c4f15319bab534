//! Canonical weekly positioning record.
//!
//! One record per (market, report week) as produced by the normalization
//! stage. Position counts are contracts; the nonreportable group is optional
//! because not every upstream report carries it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::table::{Column, Table, TableError};

/// Identity and position columns of the canonical table.
pub mod columns {
    pub const MARKET_KEY: &str = "market_key";
    pub const REPORT_DATE: &str = "report_date";
    pub const CONTRACT_CODE: &str = "contract_code";
    pub const OPEN_INTEREST: &str = "open_interest";
    /// Name used by the normalizer's full schema.
    pub const OPEN_INTEREST_ALL: &str = "open_interest_all";
    pub const COMM_LONG: &str = "comm_long";
    pub const COMM_SHORT: &str = "comm_short";
    pub const NC_LONG: &str = "nc_long";
    pub const NC_SHORT: &str = "nc_short";
    pub const NR_LONG: &str = "nr_long";
    pub const NR_SHORT: &str = "nr_short";
}

/// A single canonical observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Configured market identifier (e.g., "GOLD")
    pub market_key: String,
    /// Tuesday "as of" date of the weekly report
    pub report_date: NaiveDate,
    /// Exchange contract code (e.g., "088691")
    pub contract_code: String,
    /// Commercial (hedger) long positions
    pub comm_long: f64,
    /// Commercial (hedger) short positions
    pub comm_short: f64,
    /// Non-commercial (large speculator) long positions
    pub nc_long: f64,
    /// Non-commercial (large speculator) short positions
    pub nc_short: f64,
    /// Total open interest
    pub open_interest: f64,
    /// Nonreportable long positions, when supplied
    pub nr_long: Option<f64>,
    /// Nonreportable short positions, when supplied
    pub nr_short: Option<f64>,
}

impl CanonicalRecord {
    /// Converts records into a canonical table.
    ///
    /// The nonreportable columns are emitted only if at least one record
    /// carries them, mirroring an upstream source that either has the group
    /// or does not.
    ///
    /// # Errors
    /// Returns an error if the assembled columns are inconsistent.
    pub fn to_table(records: &[Self]) -> Result<Table, TableError> {
        let floats = |f: fn(&Self) -> f64| Column::Float(records.iter().map(|r| Some(f(r))).collect());

        let mut table = Table::from_columns(vec![
            (
                columns::MARKET_KEY.to_string(),
                Column::Text(records.iter().map(|r| Some(r.market_key.clone())).collect()),
            ),
            (
                columns::REPORT_DATE.to_string(),
                Column::Date(records.iter().map(|r| Some(r.report_date)).collect()),
            ),
            (
                columns::CONTRACT_CODE.to_string(),
                Column::Text(records.iter().map(|r| Some(r.contract_code.clone())).collect()),
            ),
            (columns::COMM_LONG.to_string(), floats(|r| r.comm_long)),
            (columns::COMM_SHORT.to_string(), floats(|r| r.comm_short)),
            (columns::NC_LONG.to_string(), floats(|r| r.nc_long)),
            (columns::NC_SHORT.to_string(), floats(|r| r.nc_short)),
            (columns::OPEN_INTEREST.to_string(), floats(|r| r.open_interest)),
        ])?;

        if records.iter().any(|r| r.nr_long.is_some() || r.nr_short.is_some()) {
            table.push_column(
                columns::NR_LONG,
                Column::Float(records.iter().map(|r| r.nr_long).collect()),
            )?;
            table.push_column(
                columns::NR_SHORT,
                Column::Float(records.iter().map(|r| r.nr_short).collect()),
            )?;
        }

        Ok(table)
    }
}
