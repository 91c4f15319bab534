#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use cotdash_data::{CanonicalRecord, Column, Table};
use std::collections::BTreeMap;

pub const GOLD: (&str, &str, &str) = ("GOLD", "088691", "metals");
pub const WTI: (&str, &str, &str) = ("WTI", "067651", "energy");

fn first_tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 6).unwrap()
}

pub fn week(i: usize) -> NaiveDate {
    first_tuesday() + Days::new(7 * i as u64)
}

/// Deterministic, non-degenerate positions for `weeks` reports of one market.
pub fn market_records(
    (key, code, _): (&str, &str, &str),
    salt: usize,
    weeks: usize,
    with_nr: bool,
) -> Vec<CanonicalRecord> {
    (0..weeks)
        .map(|i| {
            let wobble = |a: usize, m: usize, scale: f64| ((i * a + salt) % m) as f64 * scale;
            let nc_long = 50_000.0 + wobble(37, 211, 100.0);
            let nc_short = 30_000.0 + wobble(53, 197, 120.0);
            let comm_long = 40_000.0 + wobble(29, 181, 90.0);
            let comm_short = 60_000.0 + wobble(41, 173, 110.0);
            let nr_long = 8_000.0 + wobble(17, 101, 10.0);
            let nr_short = 9_000.0 + wobble(23, 89, 10.0);
            CanonicalRecord {
                market_key: key.to_string(),
                report_date: week(i),
                contract_code: code.to_string(),
                comm_long,
                comm_short,
                nc_long,
                nc_short,
                open_interest: nc_long + comm_long + nr_long + wobble(13, 67, 50.0),
                nr_long: with_nr.then_some(nr_long),
                nr_short: with_nr.then_some(nr_short),
            }
        })
        .collect()
}

/// Two markets, rows interleaved newest-first so the builder has to sort.
pub fn canonical(weeks: usize, with_nr: bool) -> Table {
    let mut records = market_records(WTI, 3, weeks, with_nr);
    records.extend(market_records(GOLD, 0, weeks, with_nr));
    records.reverse();
    CanonicalRecord::to_table(&records).unwrap()
}

pub fn maps(markets: &[(&str, &str, &str)]) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let categories = markets
        .iter()
        .map(|(k, _, c)| ((*k).to_string(), (*c).to_string()))
        .collect();
    let contracts = markets
        .iter()
        .map(|(k, code, _)| ((*k).to_string(), (*code).to_string()))
        .collect();
    (categories, contracts)
}

/// Canonical table from explicit position series of a single market.
pub fn single_market(nc_long: &[f64], nc_short: &[f64], comm_long: &[f64], comm_short: &[f64]) -> Table {
    let records: Vec<CanonicalRecord> = (0..nc_long.len())
        .map(|i| CanonicalRecord {
            market_key: GOLD.0.to_string(),
            report_date: week(i),
            contract_code: GOLD.1.to_string(),
            comm_long: comm_long[i],
            comm_short: comm_short[i],
            nc_long: nc_long[i],
            nc_short: nc_short[i],
            open_interest: 1_000.0 + i as f64,
            nr_long: None,
            nr_short: None,
        })
        .collect();
    CanonicalRecord::to_table(&records).unwrap()
}

pub fn floats(table: &Table, name: &str) -> Vec<Option<f64>> {
    table.floats(name).unwrap().to_vec()
}

pub fn bools(table: &Table, name: &str) -> Vec<Option<bool>> {
    table.bools(name).unwrap().to_vec()
}

/// Replaces one cell of a float column.
pub fn set_float(table: &mut Table, name: &str, row: usize, value: Option<f64>) {
    match table.column_mut(name) {
        Some(Column::Float(values)) => values[row] = value,
        other => panic!("{name} is not a float column: {other:?}"),
    }
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or(f64::NAN);
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, was {actual}"
    );
}
