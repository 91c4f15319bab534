//! The validation engine accepts clean builder output and pinpoints defects.

mod common;

use common::{canonical, floats, maps, set_float, single_market, GOLD, WTI};
use cotdash_core::MetricsConfig;
use cotdash_data::{Column, Table};
use cotdash_metrics::validation::{
    check_exposure_shares, check_flips, check_rebalance, check_shape, check_wow_deltas,
};
use cotdash_metrics::{build_metrics_weekly, validate_metrics, ValidationReport, CHECKS};

fn clean(with_nr: bool) -> Table {
    let (categories, contracts) = maps(&[GOLD, WTI]);
    build_metrics_weekly(&canonical(300, with_nr), &categories, &contracts).unwrap()
}

fn replace_column(table: &Table, target: &str, replacement: Column) -> Table {
    Table::from_columns(
        table
            .iter()
            .map(|(name, column)| {
                let column = if name == target { replacement.clone() } else { column.clone() };
                (name.to_string(), column)
            })
            .collect(),
    )
    .unwrap()
}

// =============================================================================
// Clean output
// =============================================================================

#[test]
fn clean_output_is_publishable() {
    for with_nr in [false, true] {
        let violations = validate_metrics(&clean(with_nr));
        assert!(violations.is_empty(), "with_nr={with_nr}: {violations:#?}");
    }
}

#[test]
fn checks_are_named_and_unique() {
    let mut names: Vec<&str> = CHECKS.iter().map(|(name, _)| *name).collect();
    assert_eq!(names.len(), 10);
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 10);
}

#[test]
fn report_serializes() {
    let report = ValidationReport::run(&clean(false));
    assert!(report.passed());
    assert_eq!(report.markets, 2);
    assert_eq!(report.rows, 600);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["checks"].as_array().unwrap().len(), CHECKS.len());
    assert_eq!(json["checks"][0]["check"], "shape");
}

// =============================================================================
// Single injected defects
// =============================================================================

#[test]
fn one_cent_delta_error_yields_exactly_one_violation() {
    let table = clean(true);
    for column in [
        "nc_long_chg_1w",
        "comm_short_chg_1w",
        "nr_total_chg_1w",
        "nc_net_chg_1w",
        "spec_vs_hedge_net_chg_1w",
        "net_mag_gap_chg_1w",
        "open_interest_chg_1w",
        "nc_rebalance_chg_1w",
        "nc_gross_chg_1w",
        "comm_net_abs_chg_1w",
    ] {
        let mut broken = table.clone();
        let value = floats(&broken, column)[10].unwrap();
        set_float(&mut broken, column, 10, Some(value + 0.01));

        let violations = validate_metrics(&broken);
        assert_eq!(violations.len(), 1, "{column}: {violations:#?}");
        assert!(
            violations[0].contains(&format!("[{column}]")),
            "violation was {}",
            violations[0]
        );
    }
}

#[test]
fn heat_values_inside_bounds_are_still_recomputed() {
    let table = clean(false);
    for (column, shift) in [
        ("nc_long_pos_all", 0.3),
        ("nc_long_min_all", -500.0),
        ("comm_short_pos_5y", 0.3),
        ("nc_long_max_5y", -500.0),
    ] {
        let mut broken = table.clone();
        let value = floats(&broken, column)[120].unwrap();
        // Keep positions inside [0, 1] so only the recomputation can catch it.
        let moved = if column.contains("_pos_") && value > 0.5 { value - shift } else { value + shift };
        set_float(&mut broken, column, 120, Some(moved));

        let violations = validate_metrics(&broken);
        assert_eq!(violations.len(), 1, "{column}: {violations:#?}");
        assert!(violations[0].contains(&format!("[{column}]: 1 rows differ")), "{}", violations[0]);
    }
}

#[test]
fn multi_horizon_open_interest_errors_are_caught() {
    let table = clean(false);
    for column in ["open_interest_chg_4w", "open_interest_chg_13w_pct"] {
        let mut broken = table.clone();
        let value = floats(&broken, column)[30].unwrap();
        set_float(&mut broken, column, 30, Some(value + 0.5));

        let violations = validate_metrics(&broken);
        assert_eq!(violations.len(), 1, "{column}: {violations:#?}");
        assert!(violations[0].starts_with(&format!("open_interest[{column}]")));
    }
}

#[test]
fn report_groups_violation_by_check() {
    let mut broken = clean(false);
    set_float(&mut broken, "nc_long_chg_1w", 10, Some(12_345.0));

    let report = ValidationReport::run(&broken);
    assert!(!report.passed());
    assert_eq!(report.violation_count(), 1);
    let failing: Vec<&str> = report
        .checks
        .iter()
        .filter(|c| !c.violations.is_empty())
        .map(|c| c.check.as_str())
        .collect();
    assert_eq!(failing, vec!["wow_deltas"]);
}

#[test]
fn delta_null_after_first_row_is_flagged() {
    let mut broken = clean(false);
    set_float(&mut broken, "nc_long_chg_1w", 5, None);

    let violations = check_wow_deltas(&broken);
    assert_eq!(violations.len(), 1, "{violations:#?}");
    assert!(violations[0].contains("nulls after the first row"));
}

#[test]
fn flipped_flag_is_caught() {
    let table = clean(false);
    let mut flags = table.bools("nc_net_flip_1w").unwrap().to_vec();
    flags[20] = flags[20].map(|f| !f);
    let broken = replace_column(&table, "nc_net_flip_1w", Column::Bool(flags));

    let violations = validate_metrics(&broken);
    assert_eq!(violations.len(), 1, "{violations:#?}");
    assert!(violations[0].starts_with("flips[nc_net_flip_1w]"));
}

#[test]
fn flags_stored_as_zero_one_floats_are_accepted() {
    let table = clean(false);
    let as_floats: Vec<Option<f64>> = table
        .bools("nc_net_flip_1w")
        .unwrap()
        .iter()
        .map(|f| f.map(|f| if f { 1.0 } else { 0.0 }))
        .collect();
    let converted = replace_column(&table, "nc_net_flip_1w", Column::Float(as_floats));

    assert!(check_flips(&converted).is_empty());
    assert!(check_shape(&converted).is_empty());
}

#[test]
fn null_flag_is_rejected() {
    let table = clean(false);
    let mut flags = table.bools("comm_net_flip_1w").unwrap().to_vec();
    flags[3] = None;
    let broken = replace_column(&table, "comm_net_flip_1w", Column::Bool(flags));

    let violations = check_flips(&broken);
    assert_eq!(violations, vec!["flips[comm_net_flip_1w]: 1 null flags".to_string()]);
}

#[test]
fn rebalance_share_without_activity_is_flagged() {
    let mut broken = clean(false);
    // Row 0 has no previous week, so there is no gross change.
    set_float(&mut broken, "nc_rebalance_share_1w", 0, Some(0.5));

    let violations = check_rebalance(&broken);
    assert_eq!(violations.len(), 1, "{violations:#?}");
    assert!(violations[0].contains("nc_rebalance_share_1w"));
}

#[test]
fn shares_that_do_not_sum_to_one_are_flagged() {
    let mut broken = clean(true);
    let share = floats(&broken, "funds_gross_share")[7].unwrap();
    set_float(&mut broken, "funds_gross_share", 7, Some(share * 0.5));

    let violations = check_exposure_shares(&broken);
    assert_eq!(violations.len(), 1, "{violations:#?}");
    assert!(violations[0].contains("funds_gross_share + comm_gross_share + nr_gross_share"));
}

// =============================================================================
// Degenerate and malformed tables
// =============================================================================

#[test]
fn constant_history_is_a_defect() {
    let input = single_market(&[100.0; 3], &[50.0, 40.0, 45.0], &[10.0, 20.0, 15.0], &[30.0, 25.0, 35.0]);
    let (categories, contracts) = maps(&[GOLD]);
    let out = build_metrics_weekly(&input, &categories, &contracts).unwrap();

    let violations = validate_metrics(&out);
    assert!(
        violations.iter().any(|v| v.starts_with("heat_all[nc_long]")),
        "{violations:#?}"
    );
    assert!(violations
        .iter()
        .any(|v| v.starts_with("heat_all[nc_long_pos_all]")));
}

#[test]
fn missing_column_and_duplicates_hit_shape() {
    let table = clean(false);
    let trimmed = Table::from_columns(
        table
            .iter()
            .filter(|(name, _)| *name != "net_alignment")
            .map(|(name, column)| (name.to_string(), column.clone()))
            .collect(),
    )
    .unwrap();
    let doubled = Table::vstack(vec![trimmed.clone(), trimmed]).unwrap();

    let violations = check_shape(&doubled);
    assert!(violations.contains(&"shape[net_alignment]: required column is missing".to_string()));
    assert!(violations.iter().any(|v| v.contains("600 duplicate rows")), "{violations:#?}");
}

#[test]
fn empty_table_reports_without_panicking() {
    let violations = validate_metrics(&Table::new());
    assert!(violations.contains(&"shape[table]: metrics table has no rows".to_string()));
    for (name, check) in CHECKS {
        if *name != "shape" {
            assert!(
                check(&Table::new(), &MetricsConfig::default()).is_empty(),
                "{name} should skip absent columns"
            );
        }
    }
}

#[test]
fn mistyped_column_is_reported_not_panicked() {
    let table = clean(false);
    let broken = replace_column(
        &table,
        "nc_long_chg_1w",
        Column::Text(vec![Some("x".to_string()); table.height()]),
    );
    let violations = validate_metrics(&broken);
    assert!(violations
        .iter()
        .any(|v| v == "wow_deltas[nc_long_chg_1w]: expected float column, found text"));
}
