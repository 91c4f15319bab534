//! Per-market derivation of every metric column.
//!
//! Columns are appended in the order of [`crate::schema::expected_columns`].

use super::series::{GroupLegs, MarketSeries};
use crate::schema::{
    self, chg_1w, field, flip, net, net_side, stat, NetAlignment, NetSide, Side, TraderGroup,
    CATEGORY, CONTRACT_CODE, MARKET_KEY, MAX_5Y, MAX_ALL, MIN_5Y, MIN_ALL, NET_ALIGNMENT,
    NET_MAG_GAP, NET_MAG_GAP_MAX_ABS_5Y, NET_MAG_GAP_POS_5Y, OI_CHG_1W_PCT,
    OI_CHG_1W_PCT_ABS_POS_5Y, OPEN_INTEREST, POS_5Y, POS_ALL, REPORT_DATE, SPEC_VS_HEDGE_NET,
};
use crate::windows::{
    diff, global_extrema, heat_position, lagged, map, pct_change, rolling_extrema, safe_ratios,
    sign_flips, zip_with,
};
use cotdash_core::MetricsConfig;
use cotdash_data::{Column, Table, TableError};

#[derive(Default)]
struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    fn push(&mut self, name: impl Into<String>, column: Column) {
        self.columns.push((name.into(), column));
    }

    fn float(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        self.push(name, Column::Float(values));
    }

    fn finish(self) -> Result<Table, TableError> {
        Table::from_columns(self.columns)
    }
}

/// ALL and 5Y heat-range columns for one series.
fn push_heat(frame: &mut Frame, base: &str, values: &[Option<f64>], config: &MetricsConfig) {
    let n = values.len();
    let (min_all, max_all) = global_extrema(values);
    frame.float(stat(base, MIN_ALL), vec![min_all; n]);
    frame.float(stat(base, MAX_ALL), vec![max_all; n]);
    frame.float(
        stat(base, POS_ALL),
        values.iter().map(|v| heat_position(*v, min_all, max_all)).collect(),
    );

    let rolling = rolling_extrema(values, config.window_5y, config.min_periods_5y);
    frame.float(stat(base, MIN_5Y), rolling.iter().map(|(lo, _)| *lo).collect());
    frame.float(stat(base, MAX_5Y), rolling.iter().map(|(_, hi)| *hi).collect());
    frame.float(
        stat(base, POS_5Y),
        values
            .iter()
            .zip(&rolling)
            .map(|(v, (lo, hi))| heat_position(*v, *lo, *hi))
            .collect(),
    );
}

fn side_labels(net_values: &[Option<f64>]) -> Vec<Option<NetSide>> {
    net_values.iter().map(|v| v.map(NetSide::classify)).collect()
}

fn scaled(values: &[Option<f64>], factor: f64) -> Vec<Option<f64>> {
    map(values, |v| v * factor)
}

fn net_of(legs: &GroupLegs) -> Vec<Option<f64>> {
    zip_with(&legs.long, &legs.short, |l, s| l - s)
}

/// Derives the full metrics frame of one market.
pub(crate) fn derive_market(
    series: &MarketSeries,
    category: &str,
    contract_code: &str,
    config: &MetricsConfig,
) -> Result<Table, TableError> {
    let n = series.len();
    let groups = series.groups();
    let oi = &series.open_interest;
    let mut frame = Frame::default();

    frame.push(MARKET_KEY, Column::repeat_text(&series.market_key, n));
    frame.push(CATEGORY, Column::repeat_text(category, n));
    frame.push(CONTRACT_CODE, Column::repeat_text(contract_code, n));
    frame.push(REPORT_DATE, Column::Date(series.dates.clone()));
    frame.float(OPEN_INTEREST, oi.clone());

    for (group, legs) in &groups {
        for side in Side::ALL {
            frame.float(field(*group, side), legs.side(side).to_vec());
        }
    }

    // Heat ranges and week-over-week deltas of every position field.
    for (group, legs) in &groups {
        for side in Side::ALL {
            let base = field(*group, side);
            push_heat(&mut frame, &base, legs.side(side), config);
            frame.float(chg_1w(&base), diff(legs.side(side), 1));
        }
    }

    // Net positioning.
    let nets: Vec<(TraderGroup, Vec<Option<f64>>)> =
        groups.iter().map(|(g, legs)| (*g, net_of(legs))).collect();
    for (group, values) in &nets {
        frame.float(net(*group), values.clone());
        frame.float(chg_1w(&net(*group)), diff(values, 1));
        frame.push(
            net_side(*group),
            Column::Text(
                side_labels(values)
                    .into_iter()
                    .map(|s| s.map(|s| s.as_str().to_string()))
                    .collect(),
            ),
        );
        frame.push(flip(&net(*group)), Column::Bool(sign_flips(values)));
    }

    let nc_net = net_of(&series.nc);
    let comm_net = net_of(&series.comm);
    let spec_vs_hedge = zip_with(&nc_net, &comm_net, |a, b| a - b);
    frame.float(SPEC_VS_HEDGE_NET, spec_vs_hedge.clone());
    frame.float(chg_1w(SPEC_VS_HEDGE_NET), diff(&spec_vs_hedge, 1));
    frame.push(flip(SPEC_VS_HEDGE_NET), Column::Bool(sign_flips(&spec_vs_hedge)));
    frame.push(
        NET_ALIGNMENT,
        Column::Text(
            side_labels(&nc_net)
                .into_iter()
                .zip(side_labels(&comm_net))
                .map(|(a, b)| Some(NetAlignment::compare(a, b).as_str().to_string()))
                .collect(),
        ),
    );

    // Magnitude gap between speculator and hedger nets.
    let gap = zip_with(&nc_net, &comm_net, |a, b| a.abs() - b.abs());
    frame.float(NET_MAG_GAP, gap.clone());
    let gap_abs = map(&gap, f64::abs);
    let gap_max: Vec<Option<f64>> = rolling_extrema(&gap_abs, config.window_5y, config.min_periods_5y)
        .into_iter()
        .map(|(_, hi)| hi)
        .collect();
    let gap_pos = map(&safe_ratios(&gap_abs, &gap_max), |v| v.clamp(0.0, 1.0));
    frame.float(chg_1w(NET_MAG_GAP), diff(&gap, 1));
    frame.float(NET_MAG_GAP_MAX_ABS_5Y, gap_max);
    frame.float(NET_MAG_GAP_POS_5Y, gap_pos);

    // Gross exposure and shares.
    let gross_total = groups
        .iter()
        .map(|(_, legs)| legs.total.clone())
        .reduce(|acc, g| zip_with(&acc, &g, |a, b| a + b))
        .unwrap_or_default();
    for (group, legs) in &groups {
        let share = safe_ratios(&legs.total, &gross_total);
        frame.float(schema::gross(*group), legs.total.clone());
        frame.float(schema::gross_share(*group), share.clone());
        frame.float(schema::gross_share_chg_pp(*group), scaled(&diff(&share, 1), 100.0));
    }

    // Rebalance decomposition.
    for ((group, legs), (_, values)) in groups.iter().zip(&nets) {
        let gross_chg = zip_with(&diff(&legs.long, 1), &diff(&legs.short, 1), |l, s| {
            l.abs() + s.abs()
        });
        let net_abs_chg = map(&diff(values, 1), f64::abs);
        let rebalance = zip_with(&gross_chg, &net_abs_chg, |g, na| g - na);
        let share = safe_ratios(&rebalance, &gross_chg);
        frame.float(schema::gross_chg(*group), gross_chg);
        frame.float(schema::net_abs_chg(*group), net_abs_chg);
        frame.float(schema::rebalance_chg(*group), rebalance);
        frame.float(schema::rebalance_share(*group), share);
    }

    // Open interest.
    let oi_pct = pct_change(oi, 1);
    frame.float(chg_1w(OPEN_INTEREST), diff(oi, 1));
    frame.float(OI_CHG_1W_PCT, oi_pct.clone());
    push_heat(&mut frame, OPEN_INTEREST, oi, config);
    let pct_abs = map(&oi_pct, f64::abs);
    frame.float(
        OI_CHG_1W_PCT_ABS_POS_5Y,
        pct_abs
            .iter()
            .zip(rolling_extrema(&pct_abs, config.window_5y, config.min_periods_5y))
            .map(|(v, (lo, hi))| heat_position(*v, lo, hi).map(|p| p.clamp(0.0, 1.0)))
            .collect(),
    );

    let prev_oi = lagged(oi, 1);
    for ((group, legs), (_, net_values)) in groups.iter().zip(&nets) {
        let participation = safe_ratios(&legs.total, oi);
        frame.float(schema::total_pct_oi(*group), participation.clone());
        frame.float(schema::total_pct_oi_chg_pp(*group), scaled(&diff(&participation, 1), 100.0));
        for (leg, values) in [
            ("long", legs.long.as_slice()),
            ("short", legs.short.as_slice()),
            ("total", legs.total.as_slice()),
            ("net", net_values.as_slice()),
        ] {
            frame.float(schema::flow_pct_oi(*group, leg), safe_ratios(&diff(values, 1), &prev_oi));
        }
    }

    for weeks in schema::extra_horizons(&config.horizons) {
        frame.float(schema::oi_chg(weeks), diff(oi, weeks));
        frame.float(schema::oi_chg_pct(weeks), pct_change(oi, weeks));
    }

    frame.finish()
}
