use super::support::Violations;
use crate::grouping::duplicate_key_count;
use crate::schema::{expected_columns, GroupSet, MARKET_KEY, REPORT_DATE};
use cotdash_data::{Column, ColumnType, Table};

/// Row count, required columns and their types, key integrity.
///
/// Multi-horizon open-interest columns depend on configuration and are not required.
pub fn check_shape(table: &Table) -> Vec<String> {
    let mut v = Violations::new("shape");

    if table.height() == 0 {
        v.push("table", "metrics table has no rows");
    }

    for (name, expected) in expected_columns(GroupSet::from_table(table), &[1]) {
        let Some(column) = table.column(&name) else {
            v.push(&name, "required column is missing");
            continue;
        };
        let actual = column.column_type();
        // Flags may arrive as 0/1 floats; the flip check owns their content.
        let flag_as_float = expected == ColumnType::Bool && actual == ColumnType::Float;
        if actual != expected && !flag_as_float {
            v.push(&name, format!("expected {expected} column, found {actual}"));
        }
    }

    let keys = table.column(MARKET_KEY).and_then(Column::as_text);
    let dates = table.column(REPORT_DATE).and_then(Column::as_date);
    if let (Some(keys), Some(dates)) = (keys, dates) {
        for (name, nulls) in [
            (MARKET_KEY, keys.iter().filter(|k| k.is_none()).count()),
            (REPORT_DATE, dates.iter().filter(|d| d.is_none()).count()),
        ] {
            if nulls > 0 {
                v.push(name, format!("{nulls} null keys"));
            }
        }
        let duplicates = duplicate_key_count(keys, dates);
        if duplicates > 0 {
            v.push(
                "market_key, report_date",
                format!("{duplicates} duplicate rows"),
            );
        }
    }

    v.into_vec()
}
