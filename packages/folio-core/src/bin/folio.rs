//! Folio CLI - command line interface for holdings and portfolio metrics.
//!
//! Every command prints a JSON `ApiResponse` on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use folio_core::{
    ApiResponse, Config, HoldingsStore, Pipeline, SnapshotStore, StaticPriceProvider,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio CLI - holdings, valuation and risk metrics")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $FOLIO_CONFIG or ~/.folio/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Holdings management commands
    Holdings {
        #[command(subcommand)]
        action: HoldingsAction,
    },
    /// Fetch prices, compute metrics and record a snapshot
    Refresh {
        /// JSON price document with "series" and optional "latest"
        #[arg(short, long)]
        prices: PathBuf,
        /// Override the configured lookback window, in days
        #[arg(long)]
        lookback_days: Option<u32>,
    },
    /// Rank holdings by P&L percent at the latest closes, without recording a snapshot
    Performance {
        /// JSON price document with "series" and optional "latest"
        #[arg(short, long)]
        prices: PathBuf,
    },
    /// List recorded snapshots, newest first
    History {
        /// Maximum number of snapshots to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show the most recent snapshot
    Latest,
    /// Show the market value per ticker of the most recent snapshot
    Allocation,
}

#[derive(Subcommand)]
enum HoldingsAction {
    /// List all holdings
    List,
    /// Add shares of a ticker
    Add {
        /// Stock ticker
        #[arg(short, long)]
        ticker: String,
        /// Number of shares
        #[arg(short = 'n', long)]
        quantity: u32,
        /// Purchase price per share
        #[arg(short, long)]
        price: f64,
    },
    /// Remove a ticker
    Remove {
        /// Stock ticker
        #[arg(short, long)]
        ticker: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config).and_then(|config| match cli.command {
        Commands::Holdings { action } => handle_holdings(&config, action),
        Commands::Refresh {
            prices,
            lookback_days,
        } => handle_refresh(&config, prices, lookback_days),
        Commands::Performance { prices } => handle_performance(&config, prices),
        Commands::History { limit } => handle_history(&config, limit),
        Commands::Latest => handle_latest(&config),
        Commands::Allocation => handle_allocation(&config),
    });

    let response = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => {
            tracing::error!("{}", e);
            ApiResponse::err(e.to_string())
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(output) => println!("{}", output),
        Err(e) => eprintln!("Failed to render response: {}", e),
    }
}

fn load_config(path: Option<PathBuf>) -> folio_core::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(&path),
        None => Config::load(),
    }
}

fn handle_holdings(config: &Config, action: HoldingsAction) -> folio_core::Result<Value> {
    let mut store = HoldingsStore::open(&config.holdings_file)?;

    match action {
        HoldingsAction::List => Ok(json!({
            "holdings": store.holdings(),
            "total_cost": store.total_cost(),
        })),
        HoldingsAction::Add {
            ticker,
            quantity,
            price,
        } => {
            let (holding, was_update) = store.add(&ticker, quantity, price)?;
            store.save()?;
            Ok(json!({
                "holding": holding,
                "action": if was_update { "updated" } else { "added" },
            }))
        }
        HoldingsAction::Remove { ticker } => {
            let removed = store.remove(&ticker)?;
            store.save()?;
            Ok(json!({ "removed": removed }))
        }
    }
}

fn handle_refresh(
    config: &Config,
    prices: PathBuf,
    lookback_days: Option<u32>,
) -> folio_core::Result<Value> {
    let store = HoldingsStore::open(&config.holdings_file)?;
    let provider = StaticPriceProvider::load(&prices)?;
    let lookback = lookback_days
        .map(folio_core::Lookback::days)
        .unwrap_or_else(|| config.lookback());

    let pipeline = Pipeline::new(
        provider,
        SnapshotStore::new(&config.snapshots_file),
        lookback,
    );
    let report = pipeline.run(store.holdings())?;

    Ok(json!({
        "snapshot_id": report.snapshot.id,
        "metrics": report.output.metrics,
        "rows": report.output.rows,
    }))
}

fn handle_performance(config: &Config, prices: PathBuf) -> folio_core::Result<Value> {
    let store = HoldingsStore::open(&config.holdings_file)?;
    let pipeline = Pipeline::new(
        StaticPriceProvider::load(&prices)?,
        SnapshotStore::new(&config.snapshots_file),
        config.lookback(),
    );
    let view = pipeline.performance(store.holdings())?;

    let allocation: Vec<_> = view
        .allocation
        .iter()
        .map(|(ticker, weight)| json!({ "ticker": ticker, "weight": weight }))
        .collect();

    Ok(json!({
        "rows": view.rows,
        "allocation": allocation,
        "positions_in_profit": view.positions_in_profit,
        "positions_in_loss": view.positions_in_loss,
    }))
}

fn handle_history(config: &Config, limit: Option<usize>) -> folio_core::Result<Value> {
    let history = SnapshotStore::new(&config.snapshots_file).history()?;
    let metrics: Vec<_> = history
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|s| json!({ "id": s.id, "taken_at": s.taken_at, "metrics": s.metrics }))
        .collect();

    Ok(json!({ "count": history.len(), "snapshots": metrics }))
}

fn handle_latest(config: &Config) -> folio_core::Result<Value> {
    let latest = SnapshotStore::new(&config.snapshots_file).latest()?;
    Ok(json!({ "snapshot": latest }))
}

fn handle_allocation(config: &Config) -> folio_core::Result<Value> {
    let allocation = SnapshotStore::new(&config.snapshots_file).latest_allocation()?;
    let allocation: Vec<_> = allocation
        .into_iter()
        .map(|(ticker, market_value)| json!({ "ticker": ticker, "market_value": market_value }))
        .collect();

    Ok(json!({ "allocation": allocation }))
}
