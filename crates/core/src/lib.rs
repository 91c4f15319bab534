pub mod config;
pub mod config_loader;
pub mod contract_codes;
pub mod markets;

pub use config::{AppConfig, MetricsConfig, PathsConfig, QaConfig, SignalsConfig};
pub use config_loader::ConfigLoader;
pub use contract_codes::{is_valid_contract_code, normalize_contract_code};
pub use markets::{MarketCatalog, MarketEntry};
