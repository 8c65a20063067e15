//! Configuration types.

use serde::{Deserialize, Serialize};

/// World Bank indicator PA.NUS.PPP (PPP conversion factor, GDP, LCU per international $).
pub const DEFAULT_SOURCE_URL: &str =
    "https://api.worldbank.org/v2/en/indicator/PA.NUS.PPP?downloadformat=excel";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the workbook comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Sheet/header discovery and filtering.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Currency enrichment.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Indicator download URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Read a local spreadsheet instead of downloading.
    #[serde(default)]
    pub path: Option<String>,

    /// Whole-request timeout for the download.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Year columns below this are ignored. `None` keeps every year.
    #[serde(default = "default_min_year")]
    pub min_year: Option<i32>,

    /// How many rows to search for the "Country Name" header.
    #[serde(default = "default_header_scan_rows")]
    pub header_scan_rows: usize,

    /// How many rows to search for "Last Updated Date".
    #[serde(default = "default_timestamp_scan_rows")]
    pub timestamp_scan_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Attach currency symbols to countries after parsing.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_url() -> String {
    DEFAULT_SOURCE_URL.into()
}
fn default_timeout() -> u64 {
    60
}
fn default_user_agent() -> String {
    "ppp-compare/0.1".into()
}
fn default_min_year() -> Option<i32> {
    Some(1990)
}
fn default_header_scan_rows() -> usize {
    10
}
fn default_timestamp_scan_rows() -> usize {
    5
}
fn default_true() -> bool {
    true
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            path: None,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            header_scan_rows: default_header_scan_rows(),
            timestamp_scan_rows: default_timestamp_scan_rows(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}
