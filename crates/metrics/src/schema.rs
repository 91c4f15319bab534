//! Column vocabulary of the metrics table.
//!
//! Every derived column name is produced here so the builder and the
//! validation checks agree on spelling. [`expected_columns`] is the single
//! ordered list of the output schema.

use cotdash_data::{columns as canonical, ColumnType, Table};
use std::fmt;

pub const MARKET_KEY: &str = canonical::MARKET_KEY;
pub const REPORT_DATE: &str = canonical::REPORT_DATE;
pub const CONTRACT_CODE: &str = canonical::CONTRACT_CODE;
pub const CATEGORY: &str = "category";
pub const OPEN_INTEREST: &str = canonical::OPEN_INTEREST;

pub const SPEC_VS_HEDGE_NET: &str = "spec_vs_hedge_net";
pub const NET_ALIGNMENT: &str = "net_alignment";
pub const NET_MAG_GAP: &str = "net_mag_gap";
pub const NET_MAG_GAP_MAX_ABS_5Y: &str = "net_mag_gap_max_abs_5y";
pub const NET_MAG_GAP_POS_5Y: &str = "net_mag_gap_pos_5y";
pub const OI_CHG_1W_PCT: &str = "open_interest_chg_1w_pct";
pub const OI_CHG_1W_PCT_ABS_POS_5Y: &str = "open_interest_chg_1w_pct_abs_pos_5y";

/// Suffix of week-over-week delta columns.
pub const WOW_SUFFIX: &str = "_chg_1w";
/// Suffix of sign-flip flag columns.
pub const FLIP_SUFFIX: &str = "_flip_1w";

/// Heat-range statistics, in output order.
pub const MIN_ALL: &str = "min_all";
pub const MAX_ALL: &str = "max_all";
pub const POS_ALL: &str = "pos_all";
pub const MIN_5Y: &str = "min_5y";
pub const MAX_5Y: &str = "max_5y";
pub const POS_5Y: &str = "pos_5y";
pub const HEAT_STATS: [&str; 6] = [MIN_ALL, MAX_ALL, POS_ALL, MIN_5Y, MAX_5Y, POS_5Y];

/// Trader category reported by the COT report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraderGroup {
    /// Non-commercial: large speculators ("funds").
    Nc,
    /// Commercial: hedgers.
    Comm,
    /// Nonreportable: small or unclassified traders.
    Nr,
}

impl TraderGroup {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Nc => "nc",
            Self::Comm => "comm",
            Self::Nr => "nr",
        }
    }

    /// Prefix used by exposure-share columns; the dashboard calls speculators "funds".
    #[must_use]
    pub const fn share_prefix(self) -> &'static str {
        match self {
            Self::Nc => "funds",
            Self::Comm => "comm",
            Self::Nr => "nr",
        }
    }
}

/// Position side of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
    Total,
}

impl Side {
    pub const ALL: [Self; 3] = [Self::Long, Self::Short, Self::Total];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Total => "total",
        }
    }
}

/// Which trader groups a table carries.
///
/// Resolved once from the column set: the nonreportable group is present
/// only when both of its legs are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSet {
    has_nr: bool,
}

impl GroupSet {
    const CORE: [TraderGroup; 2] = [TraderGroup::Nc, TraderGroup::Comm];
    const WITH_NR: [TraderGroup; 3] = [TraderGroup::Nc, TraderGroup::Comm, TraderGroup::Nr];

    #[must_use]
    pub const fn new(has_nr: bool) -> Self {
        Self { has_nr }
    }

    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        Self::new(
            table.has_column(&field(TraderGroup::Nr, Side::Long))
                && table.has_column(&field(TraderGroup::Nr, Side::Short)),
        )
    }

    #[must_use]
    pub const fn has_nonreportable(self) -> bool {
        self.has_nr
    }

    #[must_use]
    pub fn groups(self) -> &'static [TraderGroup] {
        if self.has_nr {
            &Self::WITH_NR
        } else {
            &Self::CORE
        }
    }
}

/// Net side classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSide {
    NetLong,
    NetShort,
    Flat,
}

impl NetSide {
    pub const LABELS: [&'static str; 3] = ["NET_LONG", "NET_SHORT", "FLAT"];

    #[must_use]
    pub fn classify(net: f64) -> Self {
        if net > 0.0 {
            Self::NetLong
        } else if net < 0.0 {
            Self::NetShort
        } else {
            Self::Flat
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetLong => "NET_LONG",
            Self::NetShort => "NET_SHORT",
            Self::Flat => "FLAT",
        }
    }
}

impl fmt::Display for NetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether speculators and hedgers sit on the same side of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetAlignment {
    SameSide,
    OppositeSide,
    Unknown,
}

impl NetAlignment {
    pub const LABELS: [&'static str; 3] = ["SAME_SIDE", "OPPOSITE_SIDE", "UNKNOWN"];

    /// A flat or missing side on either leg makes the alignment unknown.
    #[must_use]
    pub fn compare(nc: Option<NetSide>, comm: Option<NetSide>) -> Self {
        match (nc, comm) {
            (Some(a), Some(b)) if a == NetSide::Flat || b == NetSide::Flat => Self::Unknown,
            (Some(a), Some(b)) if a == b => Self::SameSide,
            (Some(_), Some(_)) => Self::OppositeSide,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SameSide => "SAME_SIDE",
            Self::OppositeSide => "OPPOSITE_SIDE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// `{group}_{side}`, e.g. `nc_long`.
#[must_use]
pub fn field(group: TraderGroup, side: Side) -> String {
    format!("{}_{}", group.prefix(), side.as_str())
}

/// `{base}_{stat}`, e.g. `nc_long_pos_5y`.
#[must_use]
pub fn stat(base: &str, stat: &str) -> String {
    format!("{base}_{stat}")
}

/// `{base}_chg_1w`.
#[must_use]
pub fn chg_1w(base: &str) -> String {
    format!("{base}{WOW_SUFFIX}")
}

#[must_use]
pub fn net(group: TraderGroup) -> String {
    format!("{}_net", group.prefix())
}

#[must_use]
pub fn net_side(group: TraderGroup) -> String {
    format!("{}_net_side", group.prefix())
}

/// `{base}_flip_1w`, e.g. `nc_net_flip_1w`.
#[must_use]
pub fn flip(base: &str) -> String {
    format!("{base}{FLIP_SUFFIX}")
}

#[must_use]
pub fn gross(group: TraderGroup) -> String {
    format!("{}_gross", group.prefix())
}

#[must_use]
pub fn gross_share(group: TraderGroup) -> String {
    format!("{}_gross_share", group.share_prefix())
}

#[must_use]
pub fn gross_share_chg_pp(group: TraderGroup) -> String {
    format!("{}_gross_share_chg_1w_pp", group.share_prefix())
}

#[must_use]
pub fn gross_chg(group: TraderGroup) -> String {
    format!("{}_gross_chg_1w", group.prefix())
}

#[must_use]
pub fn net_abs_chg(group: TraderGroup) -> String {
    format!("{}_net_abs_chg_1w", group.prefix())
}

#[must_use]
pub fn rebalance_chg(group: TraderGroup) -> String {
    format!("{}_rebalance_chg_1w", group.prefix())
}

#[must_use]
pub fn rebalance_share(group: TraderGroup) -> String {
    format!("{}_rebalance_share_1w", group.prefix())
}

#[must_use]
pub fn total_pct_oi(group: TraderGroup) -> String {
    format!("{}_total_pct_oi", group.prefix())
}

#[must_use]
pub fn total_pct_oi_chg_pp(group: TraderGroup) -> String {
    format!("{}_total_pct_oi_chg_1w_pp", group.prefix())
}

/// Flow legs normalized by open interest: the three sides plus net.
pub const FLOW_LEGS: [&str; 4] = ["long", "short", "total", "net"];

/// `{group}_{leg}_flow_pct_oi`.
#[must_use]
pub fn flow_pct_oi(group: TraderGroup, leg: &str) -> String {
    format!("{}_{leg}_flow_pct_oi", group.prefix())
}

/// `open_interest_chg_{n}w`.
#[must_use]
pub fn oi_chg(weeks: usize) -> String {
    format!("{OPEN_INTEREST}_chg_{weeks}w")
}

/// `open_interest_chg_{n}w_pct`.
#[must_use]
pub fn oi_chg_pct(weeks: usize) -> String {
    format!("{OPEN_INTEREST}_chg_{weeks}w_pct")
}

/// Every `{group}_{side}` field of the given groups.
#[must_use]
pub fn position_fields(groups: GroupSet) -> Vec<String> {
    groups
        .groups()
        .iter()
        .flat_map(|&g| Side::ALL.iter().map(move |&s| field(g, s)))
        .collect()
}

/// `(delta, level)` pairs whose delta must equal `level - previous level`.
///
/// The magnitude-gap delta is excluded; it is cross-checked with the
/// other magnitude-gap invariants.
#[must_use]
pub fn wow_formula_pairs(groups: GroupSet) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = position_fields(groups)
        .into_iter()
        .map(|f| (chg_1w(&f), f))
        .collect();
    pairs.push((chg_1w(OPEN_INTEREST), OPEN_INTEREST.to_string()));
    for &g in groups.groups() {
        pairs.push((chg_1w(&net(g)), net(g)));
    }
    pairs.push((chg_1w(SPEC_VS_HEDGE_NET), SPEC_VS_HEDGE_NET.to_string()));
    pairs
}

/// Horizons beyond one week, deduplicated and ascending.
#[must_use]
pub fn extra_horizons(horizons: &[usize]) -> Vec<usize> {
    let mut extra: Vec<usize> = horizons.iter().copied().filter(|&h| h > 1).collect();
    extra.sort_unstable();
    extra.dedup();
    extra
}

/// The ordered output schema for the given groups and horizons.
#[must_use]
pub fn expected_columns(groups: GroupSet, horizons: &[usize]) -> Vec<(String, ColumnType)> {
    use ColumnType::{Bool, Date, Float, Text};

    let gs = groups.groups();
    let mut cols: Vec<(String, ColumnType)> = vec![
        (MARKET_KEY.to_string(), Text),
        (CATEGORY.to_string(), Text),
        (CONTRACT_CODE.to_string(), Text),
        (REPORT_DATE.to_string(), Date),
        (OPEN_INTEREST.to_string(), Float),
    ];

    for &g in gs {
        for side in Side::ALL {
            cols.push((field(g, side), Float));
        }
    }

    for &g in gs {
        for side in Side::ALL {
            let base = field(g, side);
            for s in HEAT_STATS {
                cols.push((stat(&base, s), Float));
            }
            cols.push((chg_1w(&base), Float));
        }
    }

    for &g in gs {
        cols.push((net(g), Float));
        cols.push((chg_1w(&net(g)), Float));
        cols.push((net_side(g), Text));
        cols.push((flip(&net(g)), Bool));
    }
    cols.push((SPEC_VS_HEDGE_NET.to_string(), Float));
    cols.push((chg_1w(SPEC_VS_HEDGE_NET), Float));
    cols.push((flip(SPEC_VS_HEDGE_NET), Bool));
    cols.push((NET_ALIGNMENT.to_string(), Text));

    cols.push((NET_MAG_GAP.to_string(), Float));
    cols.push((chg_1w(NET_MAG_GAP), Float));
    cols.push((NET_MAG_GAP_MAX_ABS_5Y.to_string(), Float));
    cols.push((NET_MAG_GAP_POS_5Y.to_string(), Float));

    for &g in gs {
        cols.push((gross(g), Float));
        cols.push((gross_share(g), Float));
        cols.push((gross_share_chg_pp(g), Float));
    }

    for &g in gs {
        cols.push((gross_chg(g), Float));
        cols.push((net_abs_chg(g), Float));
        cols.push((rebalance_chg(g), Float));
        cols.push((rebalance_share(g), Float));
    }

    cols.push((chg_1w(OPEN_INTEREST), Float));
    cols.push((OI_CHG_1W_PCT.to_string(), Float));
    for s in HEAT_STATS {
        cols.push((stat(OPEN_INTEREST, s), Float));
    }
    cols.push((OI_CHG_1W_PCT_ABS_POS_5Y.to_string(), Float));
    for &g in gs {
        cols.push((total_pct_oi(g), Float));
        cols.push((total_pct_oi_chg_pp(g), Float));
        for leg in FLOW_LEGS {
            cols.push((flow_pct_oi(g, leg), Float));
        }
    }
    for weeks in extra_horizons(horizons) {
        cols.push((oi_chg(weeks), Float));
        cols.push((oi_chg_pct(weeks), Float));
    }

    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn group_set_without_nr() {
        let groups = GroupSet::new(false);
        assert_eq!(groups.groups(), &[TraderGroup::Nc, TraderGroup::Comm]);
    }

    #[test]
    fn group_set_requires_both_nr_legs() {
        let table = Table::from_columns(vec![(
            "nr_long".to_string(),
            cotdash_data::Column::Float(vec![]),
        )])
        .unwrap();
        assert!(!GroupSet::from_table(&table).has_nonreportable());
    }

    #[test]
    fn share_prefix_uses_funds_for_speculators() {
        assert_eq!(gross_share(TraderGroup::Nc), "funds_gross_share");
        assert_eq!(gross_share_chg_pp(TraderGroup::Comm), "comm_gross_share_chg_1w_pp");
    }

    #[test]
    fn expected_columns_are_unique() {
        for has_nr in [false, true] {
            let cols = expected_columns(GroupSet::new(has_nr), &[1, 4, 13]);
            let unique: HashSet<_> = cols.iter().map(|(n, _)| n).collect();
            assert_eq!(unique.len(), cols.len());
        }
    }

    #[test]
    fn expected_columns_include_dashboard_names() {
        let names: Vec<String> = expected_columns(GroupSet::new(true), &[1, 4, 13])
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        for required in [
            "nc_long_pos_all",
            "comm_total_pos_5y",
            "nc_net_flip_1w",
            "nc_rebalance_share_1w",
            "net_mag_gap_pos_5y",
            "open_interest_chg_1w_pct",
            "open_interest_chg_13w_pct",
            "nr_gross_share_chg_1w_pp",
            "spec_vs_hedge_net_chg_1w",
        ] {
            assert!(names.iter().any(|n| n == required), "missing {required}");
        }
        assert!(!names.iter().any(|n| n == "open_interest_chg_1w_pct_pct"));
    }

    #[test]
    fn extra_horizons_skip_one_week() {
        assert_eq!(extra_horizons(&[13, 1, 4, 4]), vec![4, 13]);
    }

    #[test]
    fn alignment_rules() {
        use NetSide::{Flat, NetLong, NetShort};
        assert_eq!(NetAlignment::compare(Some(NetLong), Some(NetLong)), NetAlignment::SameSide);
        assert_eq!(NetAlignment::compare(Some(NetLong), Some(NetShort)), NetAlignment::OppositeSide);
        assert_eq!(NetAlignment::compare(Some(Flat), Some(NetShort)), NetAlignment::Unknown);
        assert_eq!(NetAlignment::compare(None, Some(NetShort)), NetAlignment::Unknown);
    }
}
