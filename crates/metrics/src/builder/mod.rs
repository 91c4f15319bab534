//! Weekly metrics builder.
//!
//! Turns the canonical weekly table into the wide metrics table: heat
//! ranges, week-over-week deltas, net positioning, exposure shares and
//! open-interest context for every whitelisted market.

mod derive;
mod series;

use crate::error::MetricsError;
use crate::grouping::{partition_by_market, MarketRows};
use cotdash_core::MetricsConfig;
use cotdash_data::Table;
use derive::derive_market;
use series::{CanonicalColumns, MarketSeries};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Builds the metrics table from canonical rows and the market configuration.
#[derive(Debug, Clone, Default)]
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Derives every metric column for the whitelisted markets.
    ///
    /// The whitelist is the set of markets with a category. Output rows are
    /// sorted by `market_key`, then `report_date`, and each carries the
    /// contract code from `market_to_contract`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the window configuration is unusable
    /// - `market_to_category` is empty
    /// - a whitelisted market has no contract code
    /// - a required canonical column is missing or has the wrong type
    pub fn build(
        &self,
        canonical: &Table,
        market_to_category: &BTreeMap<String, String>,
        market_to_contract: &BTreeMap<String, String>,
    ) -> Result<Table, MetricsError> {
        self.check_config()?;
        let whitelist = whitelist(market_to_category, market_to_contract)?;
        let inputs = CanonicalColumns::resolve(canonical)?;

        let markets = partition_by_market(inputs.keys, inputs.dates);
        let keyed: usize = markets.iter().map(MarketRows::len).sum();
        if keyed < canonical.height() {
            warn!(
                dropped = canonical.height() - keyed,
                "Dropping canonical rows with a null market_key or report_date"
            );
        }

        let mut frames = Vec::with_capacity(whitelist.len());
        let mut skipped = Vec::new();
        for market in &markets {
            let Some(&(category, contract_code)) = whitelist.get(market.market_key.as_str()) else {
                skipped.push(market.market_key.as_str());
                continue;
            };
            let series = inputs.gather(market);
            debug!(
                market = %market.market_key,
                rows = series.len(),
                "Deriving market metrics"
            );
            frames.push(derive_market(&series, category, contract_code, &self.config)?);
        }

        if !skipped.is_empty() {
            info!(
                count = skipped.len(),
                markets = ?skipped,
                "Skipping markets outside the whitelist"
            );
        }
        let built = frames.len();
        if frames.is_empty() {
            warn!("No whitelisted market found in canonical input; metrics table is empty");
            frames.push(derive_market(
                &MarketSeries::empty(inputs.groups),
                "",
                "",
                &self.config,
            )?);
        }

        let table = Table::vstack(frames)?;
        debug!(columns = ?table.column_names(), "Metrics column inventory");
        info!(
            markets = built,
            rows = table.height(),
            columns = table.width(),
            nonreportable = inputs.groups.has_nonreportable(),
            "Built weekly metrics"
        );
        Ok(table)
    }

    fn check_config(&self) -> Result<(), MetricsError> {
        let cfg = &self.config;
        if cfg.window_5y == 0 {
            return Err(MetricsError::InvalidWindow("window_5y must be positive".into()));
        }
        if cfg.min_periods_5y == 0 || cfg.min_periods_5y > cfg.window_5y {
            return Err(MetricsError::InvalidWindow(format!(
                "min_periods_5y must be in 1..={}, got {}",
                cfg.window_5y, cfg.min_periods_5y
            )));
        }
        if cfg.horizons.contains(&0) {
            return Err(MetricsError::InvalidWindow("horizons must be positive".into()));
        }
        Ok(())
    }
}

/// Whitelisted markets mapped to `(category, contract_code)`.
fn whitelist<'a>(
    market_to_category: &'a BTreeMap<String, String>,
    market_to_contract: &'a BTreeMap<String, String>,
) -> Result<BTreeMap<&'a str, (&'a str, &'a str)>, MetricsError> {
    if market_to_category.is_empty() {
        return Err(MetricsError::EmptyMarketConfig);
    }

    let mut out = BTreeMap::new();
    let mut missing = Vec::new();
    for (market, category) in market_to_category {
        match market_to_contract.get(market) {
            Some(code) => {
                out.insert(market.as_str(), (category.as_str(), code.as_str()));
            }
            None => missing.push(market.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(MetricsError::MissingContractCodes(missing));
    }
    Ok(out)
}

/// Builds weekly metrics with the default window settings.
///
/// # Errors
/// See [`MetricsBuilder::build`].
pub fn build_metrics_weekly(
    canonical: &Table,
    market_to_category: &BTreeMap<String, String>,
    market_to_contract: &BTreeMap<String, String>,
) -> Result<Table, MetricsError> {
    MetricsBuilder::default().build(canonical, market_to_category, market_to_contract)
}
