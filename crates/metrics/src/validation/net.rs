use super::support::{for_each_step, markets, Mismatches, Violations, TOLERANCE};
use crate::schema::{
    chg_1w, field, net, net_side, GroupSet, NetAlignment, NetSide, Side, TraderGroup,
    NET_ALIGNMENT, NET_MAG_GAP, NET_MAG_GAP_MAX_ABS_5Y, NET_MAG_GAP_POS_5Y, SPEC_VS_HEDGE_NET,
};
use cotdash_data::Table;

/// Compares `column` row by row against `expected(row)`.
fn formula(
    v: &mut Violations,
    table: &Table,
    column: &str,
    description: &str,
    expected: impl Fn(usize) -> Option<f64>,
) {
    let Some(actual) = v.float(table, column) else {
        return;
    };
    v.no_nulls(column, actual);
    let mut mismatches = Mismatches::default();
    for (row, value) in actual.iter().enumerate() {
        mismatches.compare(*value, expected(row));
    }
    mismatches.report(v, column, description);
}

fn floats<'a>(table: &'a Table, name: &str) -> Option<&'a [Option<f64>]> {
    table.column(name).and_then(|c| c.as_float())
}

/// Net positions: `{g}_net = long - short` and the speculator/hedger spread.
pub fn check_net_formulas(table: &Table) -> Vec<String> {
    let mut v = Violations::new("net_formulas");

    for &group in GroupSet::from_table(table).groups() {
        let long = floats(table, &field(group, Side::Long));
        let short = floats(table, &field(group, Side::Short));
        let (Some(long), Some(short)) = (long, short) else {
            continue;
        };
        formula(&mut v, table, &net(group), "long - short", |r| {
            long[r].zip(short[r]).map(|(l, s)| l - s)
        });
    }

    let nc = floats(table, &net(TraderGroup::Nc));
    let comm = floats(table, &net(TraderGroup::Comm));
    if let (Some(nc), Some(comm)) = (nc, comm) {
        formula(&mut v, table, SPEC_VS_HEDGE_NET, "nc_net - comm_net", |r| {
            nc[r].zip(comm[r]).map(|(a, b)| a - b)
        });
    }

    v.into_vec()
}

fn check_labels(v: &mut Violations, table: &Table, column: &str, allowed: &[&str]) {
    let Some(labels) = v.text(table, column) else {
        return;
    };
    let invalid = labels
        .iter()
        .filter(|label| !label.as_deref().is_some_and(|l| allowed.contains(&l)))
        .count();
    if invalid > 0 {
        v.push(
            column,
            format!("{invalid} labels outside {{{}}}", allowed.join(", ")),
        );
    }
}

/// Side labels, alignment, and the net magnitude gap family.
pub fn check_net_side_gap(table: &Table) -> Vec<String> {
    let mut v = Violations::new("net_side_gap");

    for &group in GroupSet::from_table(table).groups() {
        check_labels(&mut v, table, &net_side(group), &NetSide::LABELS);
    }
    check_labels(&mut v, table, NET_ALIGNMENT, &NetAlignment::LABELS);

    let nc = floats(table, &net(TraderGroup::Nc));
    let comm = floats(table, &net(TraderGroup::Comm));
    if let (Some(nc), Some(comm)) = (nc, comm) {
        formula(&mut v, table, NET_MAG_GAP, "|nc_net| - |comm_net|", |r| {
            nc[r].zip(comm[r]).map(|(a, b)| a.abs() - b.abs())
        });
    }

    let gap = floats(table, NET_MAG_GAP);
    let gap_chg_name = chg_1w(NET_MAG_GAP);
    if let (Some(gap), Some(gap_chg)) = (gap, v.float(table, &gap_chg_name)) {
        let mut mismatches = Mismatches::default();
        for_each_step(&markets(table), |prev, cur| {
            mismatches.compare(gap_chg[cur], gap[cur].zip(gap[prev]).map(|(c, p)| c - p));
        });
        mismatches.report(&mut v, &gap_chg_name, "current - previous net_mag_gap");
    }

    if let (Some(gap), Some(max_abs)) = (gap, v.float(table, NET_MAG_GAP_MAX_ABS_5Y)) {
        let below = gap
            .iter()
            .zip(max_abs)
            .filter(|(g, m)| matches!((g, m), (Some(g), Some(m)) if *m < g.abs() - TOLERANCE))
            .count();
        if below > 0 {
            v.push(
                NET_MAG_GAP_MAX_ABS_5Y,
                format!("{below} rows below |net_mag_gap|"),
            );
        }
    }

    if let Some(pos) = v.float(table, NET_MAG_GAP_POS_5Y) {
        v.bounded(NET_MAG_GAP_POS_5Y, pos, 0.0, 1.0);
    }

    v.into_vec()
}
