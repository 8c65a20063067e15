//! Immutable cache generations.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use common::{CountryRecord, HistoricalSeries, PppFactor, YearPoint, YearTable};
use worldbank_client::ParsedTables;

use crate::currency::CurrencyLookup;

/// One fully populated generation of PPP data. Never mutated after commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub countries: Vec<CountryRecord>,
    pub year_table: YearTable,
    pub historical: HistoricalSeries,
    pub latest_year: Option<i32>,
    /// Sheet's "Last Updated Date", or the fetch time when the sheet has none.
    pub source_timestamp: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a generation from parser output, attaching currency symbols.
    pub fn from_parsed(
        parsed: ParsedTables,
        currencies: &dyn CurrencyLookup,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let countries = parsed
            .countries
            .into_iter()
            .map(|mut country| {
                if let Some(info) = currencies.lookup(&country.code) {
                    country.currency_symbol = Some(info.symbol);
                }
                country
            })
            .collect();

        let source_timestamp = parsed
            .source_timestamp
            .or_else(|| Some(fetched_at.to_rfc3339_opts(SecondsFormat::Secs, true)));

        Self {
            countries,
            year_table: parsed.year_table,
            historical: parsed.historical,
            latest_year: parsed.latest_year,
            source_timestamp,
            fetched_at,
        }
    }

    pub fn factor(&self, country_code: &str, year: i32) -> Option<f64> {
        self.year_table.get(&year)?.get(country_code).copied()
    }

    pub fn series(&self, country_code: &str) -> &[YearPoint] {
        self.historical
            .get(country_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every stored factor, ordered by year then country code.
    pub fn factors(&self) -> Vec<PppFactor> {
        let mut out: Vec<PppFactor> = self
            .year_table
            .iter()
            .flat_map(|(year, by_country)| {
                by_country.iter().map(move |(code, factor)| PppFactor {
                    country_code: code.clone(),
                    year: *year,
                    factor: *factor,
                })
            })
            .collect();
        out.sort_by(|a, b| a.year.cmp(&b.year).then_with(|| a.country_code.cmp(&b.country_code)));
        out
    }

    pub fn country(&self, country_code: &str) -> Option<&CountryRecord> {
        self.countries.iter().find(|c| c.code == country_code)
    }
}

/// Lifecycle tag, for callers that want to observe the cache without populating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Fetching,
    Populated,
}

/// A committed generation, shared by every reader.
pub type SharedSnapshot = Arc<Snapshot>;
