//! World Bank indicator download client.
//!
//! Fetches the PPP conversion-factor workbook (over HTTP or from a local
//! file), decodes it, and parses it into lookup tables.

pub mod export;
pub mod parser;
pub mod workbook;

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::{ParserConfig, SourceConfig};
use common::{Error, Result};
use tracing::{debug, info};

pub use export::export_data_sheet_csv;
pub use parser::{parse_workbook, ParsedTables};
pub use workbook::{Cell, Sheet, Workbook};

/// Anything that can hand back the raw workbook bytes.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 500;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

// ── HTTP source ───────────────────────────────────────────────────────

/// Downloads the indicator workbook with a single GET.
#[derive(Debug, Clone)]
pub struct WorldBankClient {
    client: reqwest::Client,
    url: String,
}

impl WorldBankClient {
    pub fn new(cfg: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", format_reqwest_error(&e))))?;

        Ok(Self {
            client,
            url: cfg.url.clone(),
        })
    }
}

#[async_trait]
impl SourceFetcher for WorldBankClient {
    async fn fetch(&self) -> Result<Vec<u8>> {
        debug!("Fetching PPP workbook: {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {}: {}", self.url, format_reqwest_error(&e))))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                message: summarize_response_body(&body),
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("reading body of {}: {}", self.url, format_reqwest_error(&e))))?;

        info!("Downloaded PPP workbook ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ── File source ───────────────────────────────────────────────────────

/// Reads a previously downloaded workbook from disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceFetcher for FileSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        debug!("Reading PPP workbook from {}", self.path.display());
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// File source when `source.path` is set, otherwise the HTTP client.
pub fn source_from_config(cfg: &SourceConfig) -> Result<Arc<dyn SourceFetcher>> {
    match cfg.path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => Ok(Arc::new(FileSource::new(path))),
        _ => Ok(Arc::new(WorldBankClient::new(cfg)?)),
    }
}

/// Decode and parse raw workbook bytes.
pub fn parse_workbook_bytes(bytes: Vec<u8>, cfg: &ParserConfig) -> Result<ParsedTables> {
    let workbook = Workbook::from_bytes(bytes)?;
    Ok(parse_workbook(&workbook, cfg)?)
}
