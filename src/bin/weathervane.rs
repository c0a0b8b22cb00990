//! Weathervane CLI - fuse price, weather and news sentiment series
//!
//! Prints JSON results to stdout; logs go to stderr.
//!
//! # Usage
//! ```sh
//! MODE=mock cargo run -- analyze --ticker AAPL --location "New York" --start 2024-01-01 --end 2024-03-31
//! MODE=live cargo run -- predict --ticker AAPL --days 7
//! ```
//!
//! # Environment Variables
//! - `MODE` - `mock` (default) or `live`
//! - `METRICS_ENABLED` - Print the Prometheus registry after the command (default: false)
//! - `LOG_LEVEL` - Default log filter when `RUST_LOG` is unset (default: info)

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use tracing::info;
use tracing_subscriber::prelude::*;
use weathervane::application::fusion_service::FusionService;
use weathervane::config::Config;
use weathervane::domain::errors::EngineError;
use weathervane::infrastructure::observability::Metrics;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print the metrics registry after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, align and analyze one ticker against one location
    Analyze {
        #[arg(short, long, default_value = "AAPL")]
        ticker: String,

        /// Free-text location (defaults to DEFAULT_LOCATION)
        #[arg(short, long)]
        location: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,

        /// Write the aligned dataset to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Forecast closing prices for the next trading days
    Predict {
        #[arg(short, long, default_value = "AAPL")]
        ticker: String,

        #[arg(short, long, default_value = "7")]
        days: usize,
    },
    /// Active weather alerts for a location
    Alerts {
        #[arg(short, long)]
        location: String,
    },
    /// Score a headline
    Sentiment {
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Setup logging (stderr keeps stdout clean for JSON)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.observability.log_level)
            }),
        )
        .with(stderr_layer)
        .init();

    info!("Weathervane {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: Mode={:?}", config.mode);

    let cli = Cli::parse();
    let metrics = Metrics::new()?;
    let service = FusionService::build(&config, metrics.clone())?;

    match cli.command {
        Commands::Analyze {
            ticker,
            location,
            start,
            end,
            csv,
        } => {
            let start = parse_date(&start)?;
            let end = match end {
                Some(e) => parse_date(&e)?,
                None => Utc::now().date_naive(),
            };
            let location = location.unwrap_or_else(|| service.config().default_location.clone());

            let analysis = service
                .run_full_analysis(&ticker, &location, start, end)
                .await
                .map_err(|e| fatal(format!("Analysis of {}", ticker), e))?;

            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path))?;
                analysis.aligned.to_csv(file)?;
                info!("Aligned dataset written to {}", path);
            }
            print_json(&analysis)?;
        }
        Commands::Predict { ticker, days } => {
            let predictions = service
                .predict_future(&ticker, days)
                .await
                .map_err(|e| fatal(format!("Prediction for {}", ticker), e))?;
            print_json(&predictions)?;
        }
        Commands::Alerts { location } => {
            let alerts = service
                .get_alerts(&location)
                .await
                .map_err(|e| fatal(format!("Alerts for {}", location), e))?;
            print_json(&alerts)?;
        }
        Commands::Sentiment { text } => {
            print_json(&service.classify_headline(&text))?;
        }
    }

    if cli.metrics || config.observability.metrics_enabled {
        eprintln!("{}", metrics.render());
    }

    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("Invalid date: {}", raw))
}

/// Wrap an engine failure so the CLI output names its kind
fn fatal(action: String, err: EngineError) -> anyhow::Error {
    let kind = err.kind();
    anyhow::Error::new(err).context(format!("{} failed ({})", action, kind))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
