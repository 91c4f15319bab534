use super::support::{markets, Mismatches, Violations};
use crate::grouping::MarketRows;
use crate::schema::{position_fields, stat, GroupSet, MAX_5Y, MAX_ALL, MIN_5Y, MIN_ALL, POS_5Y, POS_ALL};
use cotdash_core::MetricsConfig;
use cotdash_data::{Column, Table};

/// Reference `(min, max)` per row.
type Ranges = Vec<(Option<f64>, Option<f64>)>;

struct Window<'a> {
    check: &'static str,
    min: &'static str,
    max: &'static str,
    pos: &'static str,
    /// Leading rows may lack a range.
    warm_up: bool,
    label: &'a str,
}

fn extrema(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |lo: f64| lo.min(v))),
            Some(hi.map_or(v, |hi: f64| hi.max(v))),
        )
    })
}

fn full_history(values: &[Option<f64>], markets: &[MarketRows]) -> Ranges {
    let mut ranges = vec![(None, None); values.len()];
    for market in markets {
        let range = extrema(market.rows.iter().filter_map(|&r| values[r]));
        for &row in &market.rows {
            ranges[row] = range;
        }
    }
    ranges
}

/// Rescans every trailing window of each market.
fn trailing(values: &[Option<f64>], markets: &[MarketRows], config: &MetricsConfig) -> Ranges {
    let mut ranges = vec![(None, None); values.len()];
    for market in markets {
        for (i, &row) in market.rows.iter().enumerate() {
            let start = (i + 1).saturating_sub(config.window_5y);
            let window = &market.rows[start..=i];
            let observed = window.iter().filter(|&&r| values[r].is_some()).count();
            if observed >= config.min_periods_5y.max(1) {
                ranges[row] = extrema(window.iter().filter_map(|&r| values[r]));
            }
        }
    }
    ranges
}

fn position(value: Option<f64>, (lo, hi): (Option<f64>, Option<f64>)) -> Option<f64> {
    match (value, lo, hi) {
        (Some(v), Some(lo), Some(hi)) if hi > lo => Some((v - lo) / (hi - lo)),
        _ => None,
    }
}

fn compare_column(
    v: &mut Violations,
    window: &Window<'_>,
    column: &str,
    actual: &[Option<f64>],
    expected: impl Iterator<Item = Option<f64>>,
) {
    let mut mismatches = Mismatches::default();
    let mut misplaced_nulls = 0;
    for (a, e) in actual.iter().zip(expected) {
        mismatches.compare(*a, e);
        if window.warm_up && a.is_some() != e.is_some() {
            misplaced_nulls += 1;
        }
    }
    mismatches.report(v, column, window.label);
    if misplaced_nulls > 0 {
        v.push(
            column,
            format!("{misplaced_nulls} rows whose nulls differ from the {}", window.label),
        );
    }
}

fn check_window(
    table: &Table,
    window: &Window<'_>,
    reference: impl Fn(&[Option<f64>], &[MarketRows]) -> Ranges,
) -> Vec<String> {
    let mut v = Violations::new(window.check);
    let markets = markets(table);

    for base in position_fields(GroupSet::from_table(table)) {
        let min_name = stat(&base, window.min);
        let max_name = stat(&base, window.max);
        let pos_name = stat(&base, window.pos);

        let pos = v.float(table, &pos_name);
        if let Some(pos) = pos {
            if !window.warm_up {
                v.no_nulls(&pos_name, pos);
            }
            v.bounded(&pos_name, pos, 0.0, 1.0);
        }

        let lo = v.float(table, &min_name);
        let hi = v.float(table, &max_name);
        if let (Some(lo), Some(hi)) = (lo, hi) {
            let flat = lo
                .iter()
                .zip(hi)
                .filter(|(lo, hi)| matches!((lo, hi), (Some(lo), Some(hi)) if lo == hi))
                .count();
            if flat > 0 {
                v.push(&base, format!("{flat} rows where {} equals {}", window.min, window.max));
            }
        }

        let Some(values) = table.column(&base).and_then(Column::as_float) else {
            continue;
        };
        let ranges = reference(values, &markets);
        if let Some(lo) = lo {
            compare_column(&mut v, window, &min_name, lo, ranges.iter().map(|r| r.0));
        }
        if let Some(hi) = hi {
            compare_column(&mut v, window, &max_name, hi, ranges.iter().map(|r| r.1));
        }
        if let Some(pos) = pos {
            let expected = values.iter().zip(&ranges).map(|(value, range)| position(*value, *range));
            compare_column(&mut v, window, &pos_name, pos, expected);
        }
    }
    v.into_vec()
}

/// Full-history heat ranges, recomputed per market.
///
/// Positions must be known and bounded and ranges non-degenerate.
pub fn check_heat_all(table: &Table) -> Vec<String> {
    let window = Window {
        check: "heat_all",
        min: MIN_ALL,
        max: MAX_ALL,
        pos: POS_ALL,
        warm_up: false,
        label: "full-history range",
    };
    check_window(table, &window, full_history)
}

/// Trailing 5Y heat ranges, recomputed by rescanning each window.
///
/// Warm-up rows must be null until `min_periods_5y` values are observed.
pub fn check_heat_5y(table: &Table, config: &MetricsConfig) -> Vec<String> {
    let label = format!(
        "trailing {}-row range (min {} observations)",
        config.window_5y, config.min_periods_5y
    );
    let window = Window {
        check: "heat_5y",
        min: MIN_5Y,
        max: MAX_5Y,
        pos: POS_5Y,
        warm_up: true,
        label: &label,
    };
    check_window(table, &window, |values, markets| trailing(values, markets, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn one_market(values: &[f64], stats: &[(&str, Vec<Option<f64>>)]) -> Table {
        let n = values.len();
        let start = NaiveDate::from_ymd_opt(2020, 1, 7).unwrap();
        let mut columns = vec![
            ("market_key".to_string(), Column::Text(vec![Some("GOLD".to_string()); n])),
            (
                "report_date".to_string(),
                Column::Date((0..n).map(|i| start.checked_add_days(chrono::Days::new(7 * i as u64))).collect()),
            ),
            ("nc_long".to_string(), Column::Float(values.iter().copied().map(Some).collect())),
        ];
        for (name, values) in stats {
            columns.push(((*name).to_string(), Column::Float(values.clone())));
        }
        Table::from_columns(columns).unwrap()
    }

    #[test]
    fn trailing_window_matches_hand_computed_ranges() {
        let config = MetricsConfig {
            window_5y: 3,
            min_periods_5y: 2,
            horizons: vec![1],
        };
        let table = one_market(
            &[4.0, 1.0, 3.0, 8.0],
            &[
                ("nc_long_min_5y", vec![None, Some(1.0), Some(1.0), Some(1.0)]),
                ("nc_long_max_5y", vec![None, Some(4.0), Some(4.0), Some(8.0)]),
                ("nc_long_pos_5y", vec![None, Some(0.0), Some(2.0 / 3.0), Some(1.0)]),
            ],
        );
        assert!(check_heat_5y(&table, &config).is_empty());
    }

    #[test]
    fn value_inside_bounds_but_wrong_is_flagged() {
        let config = MetricsConfig {
            window_5y: 3,
            min_periods_5y: 2,
            horizons: vec![1],
        };
        let table = one_market(
            &[4.0, 1.0, 3.0, 8.0],
            &[("nc_long_pos_5y", vec![None, Some(0.0), Some(0.5), Some(1.0)])],
        );
        let violations = check_heat_5y(&table, &config);
        assert_eq!(violations.len(), 1, "{violations:#?}");
        assert!(violations[0].starts_with("heat_5y[nc_long_pos_5y]: 1 rows differ"));
    }

    #[test]
    fn early_position_during_warm_up_is_flagged() {
        let config = MetricsConfig {
            window_5y: 3,
            min_periods_5y: 2,
            horizons: vec![1],
        };
        let table = one_market(
            &[4.0, 1.0, 3.0],
            &[("nc_long_pos_5y", vec![Some(0.5), Some(0.0), Some(2.0 / 3.0)])],
        );
        let violations = check_heat_5y(&table, &config);
        assert_eq!(violations.len(), 1, "{violations:#?}");
        assert!(violations[0].contains("rows whose nulls differ"));
    }

    #[test]
    fn all_window_uses_whole_market_history() {
        let table = one_market(
            &[2.0, 6.0, 4.0],
            &[
                ("nc_long_min_all", vec![Some(2.0); 3]),
                ("nc_long_max_all", vec![Some(6.0), Some(6.0), Some(5.0)]),
                ("nc_long_pos_all", vec![Some(0.0), Some(1.0), Some(0.5)]),
            ],
        );
        let violations = check_heat_all(&table);
        assert_eq!(violations.len(), 1, "{violations:#?}");
        assert!(violations[0].starts_with("heat_all[nc_long_max_all]"));
    }
}
