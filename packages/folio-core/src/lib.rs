//! Folio Core - portfolio valuation and risk metrics library.
//!
//! This crate turns a set of equity holdings and their price history into
//! point-in-time and annualized portfolio statistics:
//!
//! - **Valuation**: market value, cost basis, unrealized P&L per holding
//! - **Risk/return**: compounded window return, annualized volatility, Sharpe ratio
//! - **Holdings store**: one row per ticker, persisted as JSON
//! - **Snapshots**: append-only, timestamp-keyed history of every refresh
//!
//! # Example
//!
//! ```rust
//! use folio_core::{compute_metrics, CurrentPrices, Holding, PriceSeries};
//!
//! let holdings = vec![Holding::new("AAPL", 10, 150.0)];
//! let mut current = CurrentPrices::new();
//! current.insert("AAPL".to_string(), 180.0);
//!
//! let output = compute_metrics(&holdings, &current, &PriceSeries::new()).unwrap();
//! assert_eq!(output.rows[0].market_value, 1800.0);
//!
//! // No trailing series, so the risk statistics are explicitly undefined
//! assert!(!output.metrics.sharpe_ratio.is_defined());
//! ```

pub mod config;
pub mod engine;
pub mod holdings;
pub mod pipeline;
pub mod prices;
pub mod snapshots;
pub mod types;

// Re-export commonly used types
pub use types::{
    ApiResponse, Holding, PortfolioMetrics, Statistic, UndefinedReason, ValuationRow,
};

// Re-export main functionality
pub use config::Config;
pub use engine::{
    compute_metrics, compute_metrics_at, performance_view, EngineOutput, PerformanceView,
};
pub use holdings::HoldingsStore;
pub use pipeline::{Pipeline, RunReport};
pub use prices::{
    CurrentPrices, Lookback, PricePoint, PriceProvider, PriceSeries, StaticPriceProvider,
};
pub use snapshots::{HoldingSnapshot, Snapshot, SnapshotStore};

use chrono::{DateTime, Utc};

/// Error types for folio-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid holding: {0}")]
    InvalidHolding(String),

    #[error("Malformed price data: {0}")]
    MalformedPrices(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    #[error("Snapshot already recorded at {0}")]
    DuplicateSnapshot(DateTime<Utc>),
}

/// Result type for folio-core operations.
pub type Result<T> = std::result::Result<T, Error>;
