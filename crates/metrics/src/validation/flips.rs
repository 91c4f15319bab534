use super::support::{for_each_step, markets, Violations};
use crate::schema::FLIP_SUFFIX;
use crate::windows::is_sign_flip;
use cotdash_data::{Column, Table};

/// Reads a flag column stored as bools or as 0/1 floats.
fn flags(v: &mut Violations, name: &str, column: &Column) -> Option<Vec<bool>> {
    match column {
        Column::Bool(values) => {
            let nulls = values.iter().filter(|b| b.is_none()).count();
            if nulls > 0 {
                v.push(name, format!("{nulls} null flags"));
                return None;
            }
            Some(values.iter().map(|b| b.unwrap_or(false)).collect())
        }
        Column::Float(values) => {
            let invalid = values
                .iter()
                .filter(|x| !matches!(x, Some(f) if *f == 0.0 || *f == 1.0))
                .count();
            if invalid > 0 {
                v.push(name, format!("{invalid} values that are not 0/1"));
                return None;
            }
            Some(values.iter().map(|x| *x == Some(1.0)).collect())
        }
        other => {
            v.push(
                name,
                format!("expected bool flags, found {}", other.column_type()),
            );
            None
        }
    }
}

/// Sign-flip flags: boolean typed, never null, and true exactly when the
/// underlying net changed sign between two non-zero weeks.
pub fn check_flips(table: &Table) -> Vec<String> {
    let mut v = Violations::new("flips");
    let markets = markets(table);

    for (name, column) in table.iter() {
        let Some(base) = name.strip_suffix(FLIP_SUFFIX) else {
            continue;
        };
        let Some(flags) = flags(&mut v, name, column) else {
            continue;
        };
        let Some(level) = table.column(base).and_then(Column::as_float) else {
            continue;
        };

        let mut wrong = 0usize;
        for market in &markets {
            if let Some(&first) = market.rows.first() {
                wrong += usize::from(flags[first]);
            }
        }
        for_each_step(&markets, |prev, cur| {
            if flags[cur] != is_sign_flip(level[prev], level[cur]) {
                wrong += 1;
            }
        });
        if wrong > 0 {
            v.push(
                name,
                format!("{wrong} rows disagree with a sign change of {base}"),
            );
        }
    }

    v.into_vec()
}
