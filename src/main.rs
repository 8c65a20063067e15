//! ppp-compare: purchasing-power comparisons from World Bank PPP factors.
//!
//! Thin CLI over the PPP store:
//! 1. Loads configuration (config.toml, .env, `PPP_*` variables)
//! 2. Populates the cache from the indicator workbook on first query
//! 3. Answers point, series, and comparison queries

mod config;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use common::{AppConfig, CountryRecord, Error};
use ppp_store::compare::{equivalent_amount, ratio_series};
use ppp_store::PppStore;
use worldbank_client::{export_data_sheet_csv, source_from_config, Workbook};

/// Compare purchasing power between countries
#[derive(Parser)]
#[command(name = "ppp-compare", about = "Compare purchasing power using World Bank PPP factors")]
struct Cli {
    /// Config file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List countries with their codes and currency symbols.
    Countries,
    /// Show data vintage and coverage.
    Info,
    /// PPP factor for one country and year.
    Factor {
        #[arg(long)]
        country: String,
        #[arg(long)]
        year: i32,
    },
    /// Every available year for one country.
    History {
        #[arg(long)]
        country: String,
    },
    /// Convert an amount between two countries at equal purchasing power.
    Compare {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: f64,
        /// Defaults to the latest year with data.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Year-by-year ratio of two countries' factors.
    Ratio {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Write the workbook's data sheet as CSV.
    ExportCsv {
        #[arg(long)]
        out: PathBuf,
    },
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

fn display_name(countries: &[CountryRecord], code: &str) -> String {
    countries
        .iter()
        .find(|c| c.code == code)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| code.to_string())
}

fn symbol_for(countries: &[CountryRecord], code: &str) -> String {
    countries
        .iter()
        .find(|c| c.code == code)
        .and_then(|c| c.currency_symbol.clone())
        .unwrap_or_default()
}

/// Turn an empty answer into an error when the cache failed to populate.
async fn no_data(store: &PppStore, what: String) -> anyhow::Error {
    match store.last_error().await {
        Some(cause) => anyhow!("PPP data unavailable: {cause}"),
        None => anyhow!(what),
    }
}

async fn require_factor(store: &PppStore, code: &str, year: i32) -> Result<f64> {
    match store.factor(code, year).await {
        Some(f) => Ok(f),
        None => Err(no_data(store, format!("No PPP factor for {code} in {year}")).await),
    }
}

async fn export_csv(cfg: &AppConfig, out: &Path) -> Result<()> {
    let source = source_from_config(&cfg.source)?;
    info!("Exporting data sheet from {}", source.describe());

    let bytes = source.fetch().await?;
    let workbook = Workbook::from_bytes(bytes)?;
    let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    let (sheet, rows) = export_data_sheet_csv(&workbook, BufWriter::new(file))?;

    println!("Wrote {rows} rows from sheet {sheet:?} to {}", out.display());
    Ok(())
}

async fn run(command: Command, cfg: AppConfig) -> Result<()> {
    if let Command::ExportCsv { out } = &command {
        return export_csv(&cfg, out).await;
    }

    let store = PppStore::from_config(&cfg)?;

    match command {
        Command::Countries => {
            let countries = store.countries().await;
            if countries.is_empty() {
                return Err(no_data(&store, Error::EmptyResult.to_string()).await);
            }
            for c in &countries {
                println!(
                    "{}  {:<45} {}",
                    c.code,
                    c.name,
                    c.currency_symbol.as_deref().unwrap_or("")
                );
            }
        }
        Command::Info => {
            let snapshot = store
                .ensure_populated()
                .await
                .map_err(|e| anyhow!("PPP data unavailable: {e}"))?;
            println!(
                "Last updated: {}",
                snapshot.source_timestamp.as_deref().unwrap_or("unknown")
            );
            println!("Fetched at:   {}", snapshot.fetched_at.to_rfc3339());
            println!("Countries:    {}", snapshot.countries.len());
            match (snapshot.year_table.keys().next(), snapshot.latest_year) {
                (Some(first), Some(latest)) => println!("Years:        {first}-{latest}"),
                _ => println!("Years:        none"),
            }
        }
        Command::Factor { country, year } => {
            let code = normalize_code(&country);
            let factor = require_factor(&store, &code, year).await?;
            println!("{code} {year}: {factor}");
        }
        Command::History { country } => {
            let code = normalize_code(&country);
            let series = store.historical_series(&code).await;
            if series.is_empty() {
                return Err(no_data(&store, format!("No PPP history for {code}")).await);
            }
            for point in series {
                println!("{}  {}", point.year, point.factor);
            }
        }
        Command::Compare {
            from,
            to,
            amount,
            year,
        } => {
            let (from, to) = (normalize_code(&from), normalize_code(&to));
            let year = match year {
                Some(y) => y,
                None => match store.latest_available_year().await {
                    Some(y) => y,
                    None => return Err(no_data(&store, "No PPP data available".into()).await),
                },
            };

            let from_factor = require_factor(&store, &from, year).await?;
            let to_factor = require_factor(&store, &to, year).await?;
            let converted = equivalent_amount(amount, from_factor, to_factor)
                .ok_or_else(|| anyhow!("Invalid PPP factor for {from} in {year}"))?;

            let countries = store.countries().await;
            println!(
                "{}{:.2} in {} buys what {}{:.2} buys in {} ({year})",
                symbol_for(&countries, &from),
                amount,
                display_name(&countries, &from),
                symbol_for(&countries, &to),
                converted,
                display_name(&countries, &to),
            );
        }
        Command::Ratio { from, to } => {
            let (from, to) = (normalize_code(&from), normalize_code(&to));
            let ratios = ratio_series(
                &store.historical_series(&from).await,
                &store.historical_series(&to).await,
            );
            if ratios.is_empty() {
                let what = format!("No overlapping years for {from} and {to}");
                return Err(no_data(&store, what).await);
            }
            for point in ratios {
                println!("{}  {:.4}", point.year, point.ratio);
            }
        }
        Command::ExportCsv { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ppp_compare=info,ppp_store=info,worldbank_client=info".into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, cfg).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
