//! Partitioning of a long table into per-market, date-ordered row sets.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Row indices of one market, in ascending report-date order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRows {
    pub market_key: String,
    pub rows: Vec<usize>,
}

impl MarketRows {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups rows by market key and sorts each group by date.
///
/// Rows with a null key or a null date are left out. Markets come back in
/// ascending key order; ties on date keep input order.
#[must_use]
pub fn partition_by_market(keys: &[Option<String>], dates: &[Option<NaiveDate>]) -> Vec<MarketRows> {
    let mut by_market: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, (key, date)) in keys.iter().zip(dates).enumerate() {
        if let (Some(key), Some(_)) = (key, date) {
            by_market.entry(key.as_str()).or_default().push(row);
        }
    }

    by_market
        .into_iter()
        .map(|(key, mut rows)| {
            rows.sort_by_key(|&r| dates[r]);
            MarketRows {
                market_key: key.to_string(),
                rows,
            }
        })
        .collect()
}

/// Counts rows whose non-null `(key, date)` pair already appeared earlier.
#[must_use]
pub fn duplicate_key_count(keys: &[Option<String>], dates: &[Option<NaiveDate>]) -> usize {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter()
        .zip(dates)
        .filter_map(|(k, d)| Some((k.as_deref()?, (*d)?)))
        .filter(|pair| !seen.insert(*pair))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, day)
    }

    fn k(key: &str) -> Option<String> {
        Some(key.to_string())
    }

    #[test]
    fn partitions_sorted_by_key_then_date() {
        let keys = vec![k("WTI"), k("GOLD"), k("WTI"), k("GOLD")];
        let dates = vec![d(9), d(9), d(2), d(2)];
        let parts = partition_by_market(&keys, &dates);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].market_key, "GOLD");
        assert_eq!(parts[0].rows, vec![3, 1]);
        assert_eq!(parts[1].market_key, "WTI");
        assert_eq!(parts[1].rows, vec![2, 0]);
    }

    #[test]
    fn unkeyed_rows_are_skipped() {
        let keys = vec![None, k("GOLD"), k("GOLD")];
        let dates = vec![d(1), None, d(3)];
        let parts = partition_by_market(&keys, &dates);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].rows, vec![2]);
    }

    #[test]
    fn duplicates_counted_once_per_repeat() {
        let keys = vec![k("GOLD"), k("GOLD"), k("GOLD"), k("WTI")];
        let dates = vec![d(1), d(1), d(1), d(1)];
        assert_eq!(duplicate_key_count(&keys, &dates), 2);
    }
}
