//! Configuration loader: merges env vars, .env file, and config.toml.

use common::{AppConfig, Error};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    let has_path = config
        .source
        .path
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    if !has_path {
        let url = config.source.url.trim();
        if url.is_empty() {
            issues.push("source.url must be set when source.path is empty".into());
        } else if !url.starts_with("http://") && !url.starts_with("https://") {
            issues.push("source.url must be an http(s) URL".into());
        }
    }
    if config.source.timeout_secs == 0 {
        issues.push("source.timeout_secs must be > 0".into());
    }

    if let Some(year) = config.parser.min_year {
        if !(1000..=9999).contains(&year) {
            issues.push("parser.min_year must be a four-digit year".into());
        }
    }
    if config.parser.header_scan_rows == 0 {
        issues.push("parser.header_scan_rows must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply `PPP_*` overrides. `lookup` abstracts the environment.
fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("PPP_SOURCE_URL") {
        config.source.url = url.trim().to_string();
    }
    if let Some(path) = lookup("PPP_SOURCE_PATH") {
        let trimmed = path.trim();
        config.source.path = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(raw) = lookup("PPP_HTTP_TIMEOUT_SECS") {
        config.source.timeout_secs = parse_positive_u64(&raw, "PPP_HTTP_TIMEOUT_SECS")?;
    }
    if let Some(raw) = lookup("PPP_MIN_YEAR") {
        let trimmed = raw.trim();
        config.parser.min_year = if trimmed.is_empty() || trimmed == "0" {
            None
        } else {
            Some(trimmed.parse::<i32>().map_err(|_| {
                Error::Config("PPP_MIN_YEAR must be a year, 0, or empty".into())
            })?)
        };
    }
    if let Some(raw) = lookup("PPP_ENRICH_CURRENCY") {
        config.enrichment.enabled = parse_bool(&raw);
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<AppConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load configuration from environment and an optional config file.
///
/// An explicit `path` must exist; the default `config.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Defaults, replaced by the config file when there is one.
    let mut config = match path {
        Some(explicit) => read_config_file(explicit)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                read_config_file(default_path)?
            } else {
                AppConfig::default()
            }
        }
    };

    // 3. Environment variables have the highest priority.
    apply_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;
    Ok(config)
}
