//! Consensus runner - headless one-shot prediction
//!
//! Loads OHLCV histories from CSV files, fuses a consensus per pair and
//! prints one line per pair (or the full records as JSON).
//!
//! # Usage
//! ```sh
//! cargo run --bin consensus -- \
//!     --history EURUSD=data/eurusd_m1.csv \
//!     --history GBPUSD=data/gbpusd_m1.csv \
//!     --price EURUSD=1.10215
//! ```
//!
//! # Environment Variables
//! Read when no `--config` file is given: `CONSENSUS_THRESHOLD`,
//! `CONFIDENCE_CAP`, `TARGET_PCT`, `STOP_LOSS_PCT`, `HIGH_RISK_CONFIDENCE`,
//! `WEIGHT_TREND` .. `WEIGHT_NEWS`, `PAIRS`, `TIMEFRAMES`.

use anyhow::{Context, Result, bail};
use clap::Parser;
use fxconsensus::application::system::MultiInstrumentSystem;
use fxconsensus::config::ConsensusConfig;
use fxconsensus::domain::market::Timeframe;
use fxconsensus::infrastructure::CsvQuoteSource;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (defaults to environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV history as PAIR=path (timestamp,open,high,low,close[,volume])
    #[arg(long = "history", value_name = "PAIR=PATH")]
    histories: Vec<String>,

    /// Current price override as PAIR=price (defaults to the last close)
    #[arg(long = "price", value_name = "PAIR=PRICE")]
    prices: Vec<String>,

    /// Timeframe of the loaded histories; agents run on this timeframe only
    #[arg(long, default_value = "M1")]
    timeframe: String,

    /// Print full consensus records as JSON
    #[arg(long)]
    json: bool,
}

fn split_assignment(raw: &str) -> Result<(String, &str)> {
    match raw.split_once('=') {
        Some((pair, value)) if !pair.trim().is_empty() && !value.trim().is_empty() => {
            Ok((pair.trim().to_uppercase(), value.trim()))
        }
        _ => bail!("Expected PAIR=VALUE, got '{}'", raw),
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    info!("fxconsensus {} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => ConsensusConfig::from_toml_file(path)?,
        None => ConsensusConfig::from_env()?,
    };
    let timeframe = Timeframe::from_str(&args.timeframe).context("Invalid --timeframe")?;

    let mut source = CsvQuoteSource::new();
    for raw in &args.histories {
        let (pair, path) = split_assignment(raw)?;
        source.load_file(&pair, timeframe, path)?;
        if !config.pairs.contains(&pair) {
            config.pairs.push(pair);
        }
    }
    for raw in &args.prices {
        let (pair, value) = split_assignment(raw)?;
        let price = Decimal::from_str(value)
            .with_context(|| format!("Invalid price for {}: '{}'", pair, value))?;
        source.set_price(&pair, price);
    }

    let configured = config.timeframes.clone();
    if config.use_single_timeframe(timeframe) {
        info!(
            "Histories are {}; running agents on {} instead of {:?}",
            timeframe, timeframe, configured
        );
    }

    let system = MultiInstrumentSystem::from_config(config)?;
    let results = system.predict_from_source(&source, timeframe);

    if results.is_empty() {
        warn!("No pair had both a price and a history; nothing to predict");
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for consensus in results.values() {
            let pct = consensus.scores.as_percentages();
            println!(
                "{}  target {:.5}  stop {:.5}  risk {:?}  agents {}  (buy {:.1}% / sell {:.1}% / hold {:.1}%)",
                consensus,
                consensus.target_price,
                consensus.stop_loss,
                consensus.risk_level,
                consensus.agents_count,
                pct.buy,
                pct.sell,
                pct.hold
            );
            for failure in &consensus.failures {
                println!("    ! {} {}: {}", failure.agent, failure.timeframe, failure.reason);
            }
        }
    }

    Ok(())
}
