//! Domain types shared across the PPP crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Country metadata ──────────────────────────────────────────────────

/// A country row from the data sheet. Identity is `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Three-letter World Bank country code (e.g. "USA").
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub currency_symbol: Option<String>,
}

/// Currency attached to a country by the enrichment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    pub name: String,
    pub symbol: String,
}

// ── PPP values ────────────────────────────────────────────────────────

/// Local currency units per unit of the reference currency in `year`.
/// Always `> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearPoint {
    pub year: i32,
    pub factor: f64,
}

/// A single PPP conversion factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PppFactor {
    pub country_code: String,
    pub year: i32,
    pub factor: f64,
}

/// year → country code → factor.
pub type YearTable = BTreeMap<i32, HashMap<String, f64>>;

/// country code → points sorted ascending by year.
pub type HistoricalSeries = HashMap<String, Vec<YearPoint>>;

/// Returns true if a raw numeric cell may be stored as a factor.
pub fn is_valid_factor(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_factor() {
        assert!(is_valid_factor(0.42));
        assert!(!is_valid_factor(0.0));
        assert!(!is_valid_factor(-3.0));
        assert!(!is_valid_factor(f64::NAN));
        assert!(!is_valid_factor(f64::INFINITY));
    }
}
