use super::support::{for_each_step, markets, Mismatches, Violations, BOUND_TOLERANCE};
use crate::schema::{
    field, gross_chg, net, net_abs_chg, rebalance_chg, rebalance_share, GroupSet, Side,
};
use cotdash_data::{Column, Table};

fn negatives(v: &mut Violations, column: &str, values: &[Option<f64>], slack: f64) {
    let count = values.iter().flatten().filter(|x| **x < -slack).count();
    if count > 0 {
        v.push(column, format!("{count} negative values"));
    }
}

fn levels<'a>(table: &'a Table, name: &str) -> Option<&'a [Option<f64>]> {
    table.column(name).and_then(Column::as_float)
}

/// Rebalance decomposition of weekly activity.
///
/// Gross and net-magnitude changes are recomputed from the position levels.
/// The rebalance part must equal their difference on rows where both agree
/// with the levels, so a bad input column is blamed once. Its share is
/// bounded and null exactly when there was no gross change.
pub fn check_rebalance(table: &Table) -> Vec<String> {
    let mut v = Violations::new("rebalance");
    let markets = markets(table);

    for &group in GroupSet::from_table(table).groups() {
        let gross_name = gross_chg(group);
        let net_abs_name = net_abs_chg(group);
        let rebalance_name = rebalance_chg(group);
        let share_name = rebalance_share(group);

        let gross = v.float(table, &gross_name);
        let net_abs = v.float(table, &net_abs_name);
        let rebalance = v.float(table, &rebalance_name);
        let share = v.float(table, &share_name);

        if let Some(gross) = gross {
            negatives(&mut v, &gross_name, gross, 0.0);
        }
        if let Some(net_abs) = net_abs {
            negatives(&mut v, &net_abs_name, net_abs, 0.0);
        }
        if let Some(rebalance) = rebalance {
            negatives(&mut v, &rebalance_name, rebalance, BOUND_TOLERANCE);
        }

        // Rows whose inputs disagree with the levels are left to those columns.
        let mut consistent = vec![true; table.height()];

        let long = levels(table, &field(group, Side::Long));
        let short = levels(table, &field(group, Side::Short));
        if let (Some(gross), Some(long), Some(short)) = (gross, long, short) {
            let mut mismatches = Mismatches::default();
            for_each_step(&markets, |prev, cur| {
                let expected = match (long[cur], long[prev], short[cur], short[prev]) {
                    (Some(l), Some(lp), Some(s), Some(sp)) => Some((l - lp).abs() + (s - sp).abs()),
                    _ => None,
                };
                if mismatches.compare(gross[cur], expected) {
                    consistent[cur] = false;
                }
            });
            mismatches.report(&mut v, &gross_name, "|long change| + |short change|");
        }

        if let (Some(net_abs), Some(net)) = (net_abs, levels(table, &net(group))) {
            let mut mismatches = Mismatches::default();
            for_each_step(&markets, |prev, cur| {
                let expected = net[cur].zip(net[prev]).map(|(c, p)| (c - p).abs());
                if mismatches.compare(net_abs[cur], expected) {
                    consistent[cur] = false;
                }
            });
            mismatches.report(&mut v, &net_abs_name, "|net change|");
        }

        if let (Some(gross), Some(net_abs), Some(rebalance)) = (gross, net_abs, rebalance) {
            let mut mismatches = Mismatches::default();
            for (row, r) in rebalance.iter().enumerate() {
                if consistent[row] {
                    mismatches.compare(*r, gross[row].zip(net_abs[row]).map(|(g, n)| g - n));
                }
            }
            mismatches.report(&mut v, &rebalance_name, "gross_chg_1w - net_abs_chg_1w");
        }

        if let (Some(gross), Some(share)) = (gross, share) {
            let misplaced_nulls = gross
                .iter()
                .zip(share)
                .filter(|(g, s)| {
                    let no_activity = g.map_or(true, |g| g == 0.0);
                    no_activity != s.is_none()
                })
                .count();
            if misplaced_nulls > 0 {
                v.push(
                    &share_name,
                    format!("{misplaced_nulls} rows where null does not match zero gross change"),
                );
            }
            v.bounded(&share_name, share, 0.0, 1.0);
        }
    }

    v.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rebalance_gets_rounding_slack() {
        let tiny = [Some(-1e-12), Some(3.0)];
        let mut v = Violations::new("rebalance");
        negatives(&mut v, "nc_gross_chg_1w", &tiny, 0.0);
        negatives(&mut v, "nc_net_abs_chg_1w", &tiny, 0.0);
        negatives(&mut v, "nc_rebalance_chg_1w", &tiny, BOUND_TOLERANCE);
        assert_eq!(
            v.into_vec(),
            vec![
                "rebalance[nc_gross_chg_1w]: 1 negative values".to_string(),
                "rebalance[nc_net_abs_chg_1w]: 1 negative values".to_string(),
            ]
        );
    }
}
