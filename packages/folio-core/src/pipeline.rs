//! Refresh run: fetch prices, compute metrics, append a snapshot.

use crate::engine::{self, EngineOutput, PerformanceView};
use crate::prices::{Lookback, PriceProvider};
use crate::snapshots::{Snapshot, SnapshotStore};
use crate::types::Holding;
use crate::Result;
use chrono::{DateTime, Utc};

/// Result of one refresh.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: EngineOutput,
    pub snapshot: Snapshot,
}

/// Drives a refresh against a price provider and a snapshot store.
#[derive(Debug)]
pub struct Pipeline<P> {
    provider: P,
    snapshots: SnapshotStore,
    lookback: Lookback,
}

impl<P: PriceProvider> Pipeline<P> {
    pub fn new(provider: P, snapshots: SnapshotStore, lookback: Lookback) -> Self {
        Self {
            provider,
            snapshots,
            lookback,
        }
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Refresh using the current wall-clock time.
    pub fn run(&self, holdings: &[Holding]) -> Result<RunReport> {
        self.run_at(holdings, Utc::now())
    }

    /// Refresh as of `timestamp`.
    ///
    /// A provider error aborts the run before anything is stored.
    pub fn run_at(&self, holdings: &[Holding], timestamp: DateTime<Utc>) -> Result<RunReport> {
        let tickers: Vec<String> = holdings.iter().map(|h| h.ticker.clone()).collect();
        tracing::info!("Refreshing {} holdings", tickers.len());

        let current = self.provider.latest_closes(&tickers)?;
        let trailing = self.provider.trailing_closes(&tickers, self.lookback)?;
        tracing::debug!(
            "Resolved {} latest closes and {} trailing series",
            current.len(),
            trailing.len()
        );

        let output = engine::compute_metrics_at(holdings, &current, &trailing, timestamp)?;
        let snapshot = Snapshot::from_output(&output);
        self.snapshots.append(&snapshot)?;

        tracing::info!(
            "Portfolio value ${:.2}, total return percent {}",
            output.metrics.total_market_value,
            output.metrics.total_return_percent
        );

        Ok(RunReport { output, snapshot })
    }

    /// Rank the holdings by P&L percent at the latest closes. Nothing is stored.
    pub fn performance(&self, holdings: &[Holding]) -> Result<PerformanceView> {
        let tickers: Vec<String> = holdings.iter().map(|h| h.ticker.clone()).collect();
        let current = self.provider.latest_closes(&tickers)?;
        engine::performance_view(holdings, &current)
    }
}
