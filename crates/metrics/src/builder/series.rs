//! Typed access to the canonical columns and per-market gathering.

use crate::error::MetricsError;
use crate::grouping::MarketRows;
use crate::schema::{field, GroupSet, Side, TraderGroup, MARKET_KEY, OPEN_INTEREST, REPORT_DATE};
use crate::windows::zip_with;
use chrono::NaiveDate;
use cotdash_data::{columns, Table};

/// Long, short and total positions of one trader group.
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupLegs {
    pub long: Vec<Option<f64>>,
    pub short: Vec<Option<f64>>,
    pub total: Vec<Option<f64>>,
}

impl GroupLegs {
    fn new(long: Vec<Option<f64>>, short: Vec<Option<f64>>) -> Self {
        let total = zip_with(&long, &short, |l, s| l + s);
        Self { long, short, total }
    }

    pub fn side(&self, side: Side) -> &[Option<f64>] {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
            Side::Total => &self.total,
        }
    }
}

/// One market's inputs in report-date order.
#[derive(Debug, Clone, Default)]
pub(crate) struct MarketSeries {
    pub market_key: String,
    pub dates: Vec<Option<NaiveDate>>,
    pub open_interest: Vec<Option<f64>>,
    pub nc: GroupLegs,
    pub comm: GroupLegs,
    pub nr: Option<GroupLegs>,
}

impl MarketSeries {
    /// A zero-row series carrying the given group set.
    pub fn empty(groups: GroupSet) -> Self {
        Self {
            nr: groups.has_nonreportable().then(GroupLegs::default),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn groups(&self) -> Vec<(TraderGroup, &GroupLegs)> {
        let mut out = vec![(TraderGroup::Nc, &self.nc), (TraderGroup::Comm, &self.comm)];
        if let Some(nr) = &self.nr {
            out.push((TraderGroup::Nr, nr));
        }
        out
    }
}

type Legs<'a> = (&'a [Option<f64>], &'a [Option<f64>]);

/// Borrowed, type-checked view of the canonical columns the builder reads.
pub(crate) struct CanonicalColumns<'a> {
    pub keys: &'a [Option<String>],
    pub dates: &'a [Option<NaiveDate>],
    pub groups: GroupSet,
    open_interest: &'a [Option<f64>],
    nc: Legs<'a>,
    comm: Legs<'a>,
    nr: Option<Legs<'a>>,
}

impl<'a> CanonicalColumns<'a> {
    /// Checks presence of every required column, then their types.
    ///
    /// `open_interest_all` stands in for `open_interest` when the latter is absent.
    pub fn resolve(table: &'a Table) -> Result<Self, MetricsError> {
        let oi_name = if table.has_column(OPEN_INTEREST) {
            OPEN_INTEREST
        } else {
            columns::OPEN_INTEREST_ALL
        };

        let required = [
            MARKET_KEY,
            REPORT_DATE,
            oi_name,
            columns::COMM_LONG,
            columns::COMM_SHORT,
            columns::NC_LONG,
            columns::NC_SHORT,
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|name| !table.has_column(name))
            .map(|name| {
                if *name == columns::OPEN_INTEREST_ALL {
                    format!("{OPEN_INTEREST} (or {})", columns::OPEN_INTEREST_ALL)
                } else {
                    (*name).to_string()
                }
            })
            .collect();
        if !missing.is_empty() {
            return Err(MetricsError::MissingColumns {
                missing,
                available: table.column_names().to_vec(),
            });
        }

        let groups = GroupSet::from_table(table);
        let legs = |group: TraderGroup| -> Result<Legs<'a>, MetricsError> {
            Ok((
                table.floats(&field(group, Side::Long))?,
                table.floats(&field(group, Side::Short))?,
            ))
        };

        Ok(Self {
            keys: table.texts(MARKET_KEY)?,
            dates: table.dates(REPORT_DATE)?,
            groups,
            open_interest: table.floats(oi_name)?,
            nc: legs(TraderGroup::Nc)?,
            comm: legs(TraderGroup::Comm)?,
            nr: if groups.has_nonreportable() {
                Some(legs(TraderGroup::Nr)?)
            } else {
                None
            },
        })
    }

    /// Gathers the market's rows into owned, date-ordered series.
    pub fn gather(&self, market: &MarketRows) -> MarketSeries {
        let pick = |values: &[Option<f64>]| -> Vec<Option<f64>> {
            market.rows.iter().map(|&r| values[r]).collect()
        };
        let group = |(long, short): Legs<'a>| GroupLegs::new(pick(long), pick(short));

        MarketSeries {
            market_key: market.market_key.clone(),
            dates: market.rows.iter().map(|&r| self.dates[r]).collect(),
            open_interest: pick(self.open_interest),
            nc: group(self.nc),
            comm: group(self.comm),
            nr: self.nr.map(group),
        }
    }
}
