//! brokerstat
//!
//! Reads a broker execution report, reconstructs round-trip trades and
//! prints PnL and performance statistics.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use broker_report::engine::{EngineConfig, TradeEngine};
use broker_report::normalizer::{self, ReportFormat};
use broker_report::report::{
    BrokerReport, FillTable, InstrumentTable, RoundTripTable, TradeCountTable, DEFAULT_TOP,
};

/// Broker report analyzer CLI.
#[derive(Parser)]
#[command(name = "brokerstat")]
#[command(about = "Reconstruct trades and PnL statistics from broker reports", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Engine configuration file (TOML)
    #[arg(short, long, env = "BROKERSTAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Broker report to analyze
    path: PathBuf,

    /// Report layout (auto, vtb, binance, canonical)
    #[arg(short, long, default_value = "auto")]
    format: String,

    /// Initial capital, overrides the configuration file
    #[arg(long, env = "BROKERSTAT_CAPITAL")]
    capital: Option<Decimal>,
}

#[derive(Subcommand)]
enum Commands {
    /// Portfolio and per-instrument summaries
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Print the whole report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Every fill with position, trade, average entry, PnL and equity
    Fills {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Closed round-trip trades
    Trades {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Per-instrument summaries and the most traded instruments
    Instruments {
        #[command(flatten)]
        input: InputArgs,

        /// Number of instruments in the trade-count ranking
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Show the effective engine configuration
    Config,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { input, json } => {
            let report = build_report(&config, &input, DEFAULT_TOP)?;

            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report);
            }
        }

        Commands::Fills { input } => {
            let report = build_report(&config, &input, DEFAULT_TOP)?;

            println!("\n{}", FillTable(&report.fills));
            println!("Fills: {}  Final equity: {:.2}", report.fills.len(), report.portfolio.final_equity);
        }

        Commands::Trades { input } => {
            let report = build_report(&config, &input, DEFAULT_TOP)?;

            if report.round_trips.is_empty() {
                println!("No closed trades in {}", input.path.display());
                return Ok(());
            }

            println!("\n{}", RoundTripTable(&report.round_trips));

            let net: Decimal = report.round_trips.iter().filter_map(|t| t.net_pnl()).sum();
            println!("Closed trades: {}  Net of fees: {:.2}", report.round_trips.len(), net);
        }

        Commands::Instruments { input, top } => {
            let report = build_report(&config, &input, top)?;

            println!("\n--- Instruments ({}) ---", report.instruments.len());
            println!("{}", InstrumentTable(&report.instruments));

            println!("--- Top {} by Trade Count ---", top);
            println!("{}", TradeCountTable(&report.top_instruments));
        }

        Commands::Config => {
            println!("\n=== Engine Configuration ===\n");
            println!("Initial Capital:      {}", config.initial_capital);
            println!("\nPoint Values:");
            for (prefix, value) in config.point_values.iter() {
                println!("  {:<20} {}", prefix, value);
            }
        }
    }

    Ok(())
}

/// Defaults, overlaid by the TOML file when one is given.
fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = EngineConfig::from_toml_str(&raw)
        .with_context(|| format!("Invalid config {}", path.display()))?;

    info!(path = %path.display(), point_values = config.point_values.len(), "Loaded engine config");
    Ok(config)
}

fn build_report(config: &EngineConfig, input: &InputArgs, top: usize) -> Result<BrokerReport> {
    let mut config = config.clone();
    if let Some(capital) = input.capital {
        config = config.with_initial_capital(capital)?;
    }

    let format = match input.format.to_lowercase().as_str() {
        "auto" => None,
        other => Some(other.parse::<ReportFormat>()?),
    };

    let content = fs::read_to_string(&input.path)
        .with_context(|| format!("Failed to read report {}", input.path.display()))?;
    let source = input.path.to_string_lossy();

    let fills = normalizer::normalize(&source, &content, format)
        .with_context(|| format!("Failed to normalize {}", input.path.display()))?;

    let ledger = TradeEngine::new(config)
        .run(&fills)
        .context("Trade reconstruction failed")?;

    Ok(BrokerReport::from_ledger(ledger, top))
}
