//! Market catalog loaded from `markets.yaml`.
//!
//! The catalog is the whitelist of markets the dashboard tracks. Each entry
//! maps a market key to its category and exchange contract code:
//!
//! ```yaml
//! markets:
//!   - market_key: GOLD
//!     category: metals
//!     contract_code: "088691"
//! ```
//!
//! Older files use `key` instead of `market_key`; both are accepted.

use anyhow::{bail, Result};
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::contract_codes::{is_valid_contract_code, normalize_contract_code};

/// One `markets:` entry as written in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketEntry {
    #[serde(default)]
    pub market_key: Option<String>,
    /// Legacy spelling of `market_key`.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "contract_code_as_text")]
    pub contract_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl MarketEntry {
    /// The entry's market key, preferring `market_key` over `key`.
    #[must_use]
    pub fn resolved_key(&self) -> Option<&str> {
        self.market_key
            .as_deref()
            .or(self.key.as_deref())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Contract codes are sometimes written unquoted and parsed as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawContractCode {
    Text(String),
    Int(i64),
    Float(f64),
}

fn contract_code_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<RawContractCode> = Option::deserialize(deserializer)?;
    Ok(raw.map(|code| match code {
        RawContractCode::Text(s) => s,
        RawContractCode::Int(i) => i.to_string(),
        RawContractCode::Float(f) => f.to_string(),
    }))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MarketsFile {
    #[serde(default)]
    markets: Vec<MarketEntry>,
}

/// Resolved market metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketCatalog {
    categories: BTreeMap<String, String>,
    contract_codes: BTreeMap<String, String>,
}

impl MarketCatalog {
    /// Loads and resolves the catalog from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be parsed or a contract code is
    /// malformed after normalization.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("Markets config not found: {}", path.display());
        }
        let file: MarketsFile = Figment::new().merge(Yaml::file(path)).extract()?;
        Self::from_entries(&file.markets)
    }

    /// Resolves catalog entries.
    ///
    /// Entries without a key are skipped. Category and contract code are
    /// each optional; an entry contributes to whichever map it has data for.
    ///
    /// # Errors
    /// Returns an error if a contract code is malformed after normalization.
    pub fn from_entries(entries: &[MarketEntry]) -> Result<Self> {
        let mut catalog = Self::default();

        for entry in entries {
            let Some(key) = entry.resolved_key() else {
                warn!(name = ?entry.name, "skipping market entry without a key");
                continue;
            };

            if let Some(category) = entry.category.as_deref().filter(|c| !c.trim().is_empty()) {
                catalog
                    .categories
                    .insert(key.to_string(), category.trim().to_string());
            }

            if let Some(raw) = entry.contract_code.as_deref() {
                let code = normalize_contract_code(raw);
                if !is_valid_contract_code(&code) {
                    bail!("market {key}: invalid contract code {raw:?}");
                }
                catalog.contract_codes.insert(key.to_string(), code);
            }
        }

        debug!(
            categories = catalog.categories.len(),
            contract_codes = catalog.contract_codes.len(),
            "resolved market catalog"
        );
        Ok(catalog)
    }

    /// Market key → category.
    #[must_use]
    pub fn market_to_category(&self) -> &BTreeMap<String, String> {
        &self.categories
    }

    /// Market key → normalized contract code.
    #[must_use]
    pub fn market_to_contract(&self) -> &BTreeMap<String, String> {
        &self.contract_codes
    }

    /// Number of whitelisted (categorized) markets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: Option<&str>, category: Option<&str>, code: Option<&str>) -> MarketEntry {
        MarketEntry {
            market_key: key.map(str::to_string),
            category: category.map(str::to_string),
            contract_code: code.map(str::to_string),
            ..MarketEntry::default()
        }
    }

    #[test]
    fn from_entries_builds_both_maps() {
        let catalog = MarketCatalog::from_entries(&[
            entry(Some("GOLD"), Some("metals"), Some("088691")),
            entry(Some("WTI"), Some("energy"), Some("067651.0")),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.market_to_category()["GOLD"], "metals");
        assert_eq!(catalog.market_to_contract()["WTI"], "067651");
    }

    #[test]
    fn legacy_key_is_accepted() {
        let legacy = MarketEntry {
            key: Some("SILVER".to_string()),
            category: Some("metals".to_string()),
            ..MarketEntry::default()
        };
        let catalog = MarketCatalog::from_entries(&[legacy]).unwrap();
        assert!(catalog.market_to_category().contains_key("SILVER"));
        assert!(catalog.market_to_contract().is_empty());
    }

    #[test]
    fn keyless_entries_are_skipped() {
        let catalog =
            MarketCatalog::from_entries(&[entry(None, Some("metals"), Some("088691"))]).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn invalid_contract_code_is_rejected() {
        let err = MarketCatalog::from_entries(&[entry(Some("GOLD"), Some("metals"), Some("08-8691"))])
            .unwrap_err();
        assert!(err.to_string().contains("GOLD"));
    }

    #[test]
    fn load_reads_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "markets.yaml",
                r#"
markets:
  - market_key: GOLD
    category: metals
    contract_code: "088691"
  - key: EUR
    category: fx
    contract_code: 99741
"#,
            )?;
            let catalog = MarketCatalog::load("markets.yaml").expect("catalog");
            assert_eq!(catalog.len(), 2);
            assert_eq!(catalog.market_to_contract()["EUR"], "99741");
            Ok(())
        });
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(MarketCatalog::load("/nonexistent/markets.yaml").is_err());
    }
}
