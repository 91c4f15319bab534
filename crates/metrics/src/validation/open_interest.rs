use super::support::{for_each_step, markets, Mismatches, Violations};
use crate::grouping::MarketRows;
use crate::schema::{
    chg_1w, oi_chg, oi_chg_pct, stat, OI_CHG_1W_PCT, OI_CHG_1W_PCT_ABS_POS_5Y, OPEN_INTEREST,
    POS_5Y, POS_ALL,
};
use cotdash_data::Table;

/// Open interest and its derived columns.
pub fn check_open_interest(table: &Table) -> Vec<String> {
    let mut v = Violations::new("open_interest");
    let markets = markets(table);

    let oi = v.float(table, OPEN_INTEREST);
    if let Some(oi) = oi {
        let negative = oi.iter().flatten().filter(|x| **x < 0.0).count();
        if negative > 0 {
            v.push(OPEN_INTEREST, format!("{negative} negative values"));
        }
    }

    let pos_all = stat(OPEN_INTEREST, POS_ALL);
    if let Some(values) = v.float(table, &pos_all) {
        v.no_nulls(&pos_all, values);
        v.bounded(&pos_all, values, 0.0, 1.0);
    }
    for name in [stat(OPEN_INTEREST, POS_5Y), OI_CHG_1W_PCT_ABS_POS_5Y.to_string()] {
        if let Some(values) = v.float(table, &name) {
            v.bounded(&name, values, 0.0, 1.0);
        }
    }

    let chg_name = chg_1w(OPEN_INTEREST);
    if let Some(chg) = v.float(table, &chg_name) {
        let late_nulls: usize = markets
            .iter()
            .map(|m| m.rows.iter().skip(1).filter(|&&r| chg[r].is_none()).count())
            .sum();
        if late_nulls > 0 {
            v.push(&chg_name, format!("{late_nulls} nulls after the first row of a market"));
        }
    }

    if let (Some(oi), Some(pct)) = (oi, v.float(table, OI_CHG_1W_PCT)) {
        let mut mismatches = Mismatches::default();
        for_each_step(&markets, |prev, cur| {
            let expected = match (oi[cur], oi[prev]) {
                (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p.abs()),
                _ => None,
            };
            mismatches.compare(pct[cur], expected);
        });
        mismatches.report(&mut v, OI_CHG_1W_PCT, "(current - previous) / |previous|");
    }

    if let Some(oi) = oi {
        for weeks in horizons_present(table) {
            check_horizon(&mut v, table, &markets, oi, weeks);
        }
    }

    let derived: Vec<String> = table
        .column_names()
        .iter()
        .filter(|n| n.starts_with(OPEN_INTEREST) || n.contains("_pct_oi"))
        .cloned()
        .collect();
    for name in &derived {
        if let Some(values) = table.column(name).and_then(|c| c.as_float()) {
            v.finite(name, values);
        }
    }

    v.into_vec()
}

/// Horizons above one week with an `open_interest_chg_{n}w` column in the table.
fn horizons_present(table: &Table) -> Vec<usize> {
    let prefix = format!("{OPEN_INTEREST}_chg_");
    let mut weeks: Vec<usize> = table
        .column_names()
        .iter()
        .filter_map(|name| name.strip_prefix(&prefix)?.strip_suffix('w')?.parse().ok())
        .filter(|&n| n > 1)
        .collect();
    weeks.sort_unstable();
    weeks
}

fn check_horizon(
    v: &mut Violations,
    table: &Table,
    markets: &[MarketRows],
    oi: &[Option<f64>],
    weeks: usize,
) {
    let chg_name = oi_chg(weeks);
    let pct_name = oi_chg_pct(weeks);
    let chg = v.float(table, &chg_name);
    let pct = table.column(&pct_name).and_then(|c| c.as_float());

    let mut chg_mismatches = Mismatches::default();
    let mut pct_mismatches = Mismatches::default();
    for market in markets {
        for (i, &cur) in market.rows.iter().enumerate() {
            let lag = i.checked_sub(weeks).and_then(|j| oi[market.rows[j]]);
            let now = oi[cur];
            if let Some(chg) = chg {
                chg_mismatches.compare(chg[cur], now.zip(lag).map(|(c, p)| c - p));
            }
            if let Some(pct) = pct {
                let expected = match (now, lag) {
                    (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p.abs()),
                    _ => None,
                };
                pct_mismatches.compare(pct[cur], expected);
            }
        }
    }
    chg_mismatches.report(v, &chg_name, "current - lagged");
    pct_mismatches.report(v, &pct_name, "(current - lagged) / |lagged|");
}
