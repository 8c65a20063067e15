//! Read API over the PPP cache.
//!
//! Every read populates the cache on first use. Population failures are
//! logged by the coordinator and surface here as empty/`None` results; use
//! [`PppStore::ensure_populated`] or [`PppStore::last_error`] to tell an
//! outage apart from missing data.

use std::sync::Arc;

use common::config::{AppConfig, ParserConfig};
use common::{CountryRecord, Result, YearPoint};
use worldbank_client::{source_from_config, SourceFetcher};

use crate::cache::{CacheStatus, SharedSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::coordinator::{FetchCoordinator, PopulateResult};
use crate::currency::{CurrencyLookup, NoCurrencyLookup, StaticCurrencyTable};

/// Process-wide PPP data store. Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct PppStore {
    coordinator: FetchCoordinator,
}

/// Assembles a [`PppStore`] from its collaborators.
pub struct StoreBuilder {
    fetcher: Arc<dyn SourceFetcher>,
    currencies: Arc<dyn CurrencyLookup>,
    clock: Arc<dyn Clock>,
    parser: ParserConfig,
}

impl StoreBuilder {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self {
            fetcher,
            currencies: Arc::new(NoCurrencyLookup),
            clock: Arc::new(SystemClock),
            parser: ParserConfig::default(),
        }
    }

    pub fn currencies(mut self, currencies: Arc<dyn CurrencyLookup>) -> Self {
        self.currencies = currencies;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn parser_config(mut self, parser: ParserConfig) -> Self {
        self.parser = parser;
        self
    }

    pub fn build(self) -> PppStore {
        PppStore {
            coordinator: FetchCoordinator::new(
                self.fetcher,
                self.currencies,
                self.clock,
                self.parser,
            ),
        }
    }
}

impl PppStore {
    pub fn builder(fetcher: Arc<dyn SourceFetcher>) -> StoreBuilder {
        StoreBuilder::new(fetcher)
    }

    /// Wire the configured source, currency table, and parser settings.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let currencies: Arc<dyn CurrencyLookup> = if cfg.enrichment.enabled {
            Arc::new(StaticCurrencyTable::builtin()?)
        } else {
            Arc::new(NoCurrencyLookup)
        };

        Ok(StoreBuilder::new(source_from_config(&cfg.source)?)
            .currencies(currencies)
            .parser_config(cfg.parser.clone())
            .build())
    }

    /// Populate if needed, exposing the failure instead of degrading.
    pub async fn ensure_populated(&self) -> PopulateResult {
        self.coordinator.ensure_populated().await
    }

    async fn populated(&self) -> Option<SharedSnapshot> {
        self.coordinator.ensure_populated().await.ok()
    }

    /// Countries sorted by name; empty if population failed.
    pub async fn countries(&self) -> Vec<CountryRecord> {
        self.populated()
            .await
            .map(|snap| snap.countries.clone())
            .unwrap_or_default()
    }

    pub async fn latest_available_year(&self) -> Option<i32> {
        self.populated().await?.latest_year
    }

    pub async fn source_timestamp(&self) -> Option<String> {
        self.populated().await?.source_timestamp.clone()
    }

    /// Factor for `country_code` in `year`; `None` when there is no data.
    pub async fn factor(&self, country_code: &str, year: i32) -> Option<f64> {
        self.populated().await?.factor(country_code, year)
    }

    /// Ascending-by-year series; empty for unknown countries.
    pub async fn historical_series(&self, country_code: &str) -> Vec<YearPoint> {
        self.populated()
            .await
            .map(|snap| snap.series(country_code).to_vec())
            .unwrap_or_default()
    }

    pub async fn status(&self) -> CacheStatus {
        self.coordinator.status().await
    }

    pub async fn last_error(&self) -> Option<String> {
        self.coordinator.last_error().await
    }

    /// Population attempts started by this store.
    pub fn fetch_attempts(&self) -> u64 {
        self.coordinator.attempts()
    }
}
