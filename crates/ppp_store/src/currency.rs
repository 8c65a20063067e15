//! Currency lookup used to enrich country records after parsing.

use std::collections::HashMap;

use common::{CurrencyInfo, Error, Result};
use serde::Deserialize;

const BUILTIN_TABLE: &str = include_str!("../data/currencies.json");

/// Best-effort currency lookup keyed by ISO-3 country code.
pub trait CurrencyLookup: Send + Sync {
    fn lookup(&self, country_code: &str) -> Option<CurrencyInfo>;
}

/// Lookup that never finds anything (enrichment disabled).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCurrencyLookup;

impl CurrencyLookup for NoCurrencyLookup {
    fn lookup(&self, _country_code: &str) -> Option<CurrencyInfo> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyRow {
    code: String,
    currency: String,
    symbol: String,
}

/// In-memory table, by default the one bundled with the crate.
#[derive(Debug, Clone, Default)]
pub struct StaticCurrencyTable {
    entries: HashMap<String, CurrencyInfo>,
}

impl StaticCurrencyTable {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Parse a JSON array of `{code, currency, symbol}` rows. An empty
    /// table is rejected.
    pub fn from_json(raw: &str) -> Result<Self> {
        let rows: Vec<CurrencyRow> = serde_json::from_str(raw)?;
        let entries = rows
            .into_iter()
            .map(|row| {
                (
                    row.code.to_ascii_uppercase(),
                    CurrencyInfo {
                        name: row.currency,
                        symbol: row.symbol,
                    },
                )
            })
            .collect();
        let table = Self { entries };
        if table.is_empty() {
            return Err(Error::Config("currency table has no entries".into()));
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CurrencyLookup for StaticCurrencyTable {
    fn lookup(&self, country_code: &str) -> Option<CurrencyInfo> {
        self.entries
            .get(&country_code.trim().to_ascii_uppercase())
            .cloned()
    }
}
