use cotdash_data::TableError;
use thiserror::Error;

/// Errors raised while deriving metrics or signal status.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The canonical table lacks columns the builder needs.
    #[error(
        "canonical table is missing required columns: {}. Available columns: {}",
        .missing.join(", "),
        .available.join(", ")
    )]
    MissingColumns {
        /// Required columns that were not found.
        missing: Vec<String>,
        /// Columns the table does contain.
        available: Vec<String>,
    },

    /// No market is mapped to a category, so nothing can be whitelisted.
    #[error("market configuration is empty: no market has a category")]
    EmptyMarketConfig,

    /// Whitelisted markets that have no contract code.
    #[error("markets without a contract code: {}", .0.join(", "))]
    MissingContractCodes(Vec<String>),

    /// Window or horizon settings that cannot produce a series.
    #[error("invalid window configuration: {0}")]
    InvalidWindow(String),

    /// The same (market, report date) pair appears more than once.
    #[error("{count} duplicate (market_key, report_date) rows")]
    DuplicateKeys {
        /// Number of rows repeating an earlier key.
        count: usize,
    },

    /// Rows without a market key or report date.
    #[error("{count} rows have a null market_key or report_date")]
    NullKeys {
        /// Number of unkeyed rows.
        count: usize,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}
