use super::support::{for_each_step, markets, Mismatches, Violations};
use crate::schema::{wow_formula_pairs, GroupSet, WOW_SUFFIX};
use cotdash_data::Table;

/// Week-over-week deltas.
///
/// Every `*_chg_1w` column may be null only on a market's first row and is
/// never infinite. Level deltas must equal `current - previous` per market.
pub fn check_wow_deltas(table: &Table) -> Vec<String> {
    let mut v = Violations::new("wow_deltas");
    let markets = markets(table);

    let delta_columns: Vec<String> = table
        .column_names()
        .iter()
        .filter(|name| name.ends_with(WOW_SUFFIX))
        .cloned()
        .collect();
    for name in &delta_columns {
        let Some(values) = v.float(table, name) else {
            continue;
        };
        v.finite(name, values);
        let late_nulls: usize = markets
            .iter()
            .map(|m| m.rows.iter().skip(1).filter(|&&r| values[r].is_none()).count())
            .sum();
        if late_nulls > 0 {
            v.push(name, format!("{late_nulls} nulls after the first row of a market"));
        }
    }

    for (delta_name, level_name) in wow_formula_pairs(GroupSet::from_table(table)) {
        let (Some(delta), Some(level)) = (
            table.column(&delta_name).and_then(|c| c.as_float()),
            table.column(&level_name).and_then(|c| c.as_float()),
        ) else {
            continue;
        };
        let mut mismatches = Mismatches::default();
        for_each_step(&markets, |prev, cur| {
            let expected = level[cur].zip(level[prev]).map(|(c, p)| c - p);
            mismatches.compare(delta[cur], expected);
        });
        mismatches.report(&mut v, &delta_name, &format!("current - previous {level_name}"));
    }

    v.into_vec()
}
