use super::support::{Violations, TOLERANCE};
use crate::schema::{gross_share, GroupSet};
use cotdash_data::Table;

/// Gross exposure shares are fractions and add up to one.
pub fn check_exposure_shares(table: &Table) -> Vec<String> {
    let mut v = Violations::new("exposure_shares");

    let mut shares = Vec::new();
    for &group in GroupSet::from_table(table).groups() {
        let name = gross_share(group);
        if let Some(values) = v.float(table, &name) {
            v.finite(&name, values);
            v.bounded(&name, values, 0.0, 1.0);
            shares.push(values);
        }
    }
    if shares.len() < 2 {
        return v.into_vec();
    }

    let mut off = 0usize;
    let mut worst = 0.0f64;
    for row in 0..table.height() {
        let sum: Option<f64> = shares.iter().map(|s| s[row]).sum();
        if let Some(sum) = sum {
            let error = (sum - 1.0).abs();
            if error > TOLERANCE {
                off += 1;
                worst = worst.max(error);
            }
        }
    }
    if off > 0 {
        let names: Vec<String> = GroupSet::from_table(table)
            .groups()
            .iter()
            .map(|g| gross_share(*g))
            .collect();
        v.push(
            &names.join(" + "),
            format!("{off} rows do not sum to 1 within {TOLERANCE:e} (max error {worst:.6e})"),
        );
    }

    v.into_vec()
}
