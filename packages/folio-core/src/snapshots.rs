//! Append-only history of portfolio snapshots.
//!
//! Snapshots are stored one JSON object per line. Existing lines are never
//! rewritten; each run appends exactly one line keyed by its timestamp.

use crate::engine::EngineOutput;
use crate::types::{PortfolioMetrics, ValuationRow};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One holding as it stood when a snapshot was taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoldingSnapshot {
    pub ticker: String,
    pub quantity: u32,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    #[serde(default)]
    pub price_missing: bool,
}

impl From<&ValuationRow> for HoldingSnapshot {
    fn from(row: &ValuationRow) -> Self {
        Self {
            ticker: row.ticker.clone(),
            quantity: row.quantity,
            current_price: row.current_price,
            market_value: row.market_value,
            unrealized_pnl: row.unrealized_pnl,
            price_missing: row.price_missing,
        }
    }
}

/// Portfolio metrics and per-holding rows at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub id: Uuid,
    /// Key of the snapshot; equal to the metrics timestamp
    pub taken_at: DateTime<Utc>,
    pub metrics: PortfolioMetrics,
    /// Ordered by ticker
    pub holdings: Vec<HoldingSnapshot>,
}

impl Snapshot {
    /// Build the persisted form of an engine run.
    pub fn from_output(output: &EngineOutput) -> Self {
        let mut holdings: Vec<HoldingSnapshot> =
            output.rows.iter().map(HoldingSnapshot::from).collect();
        holdings.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        Self {
            id: Uuid::new_v4(),
            taken_at: output.metrics.timestamp,
            metrics: output.metrics.clone(),
            holdings,
        }
    }

    /// (ticker, market value) pairs for an allocation view.
    pub fn allocation(&self) -> Vec<(String, f64)> {
        self.holdings
            .iter()
            .map(|h| (h.ticker.clone(), h.market_value))
            .collect()
    }
}

/// JSON Lines snapshot history.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a snapshot. A snapshot with an already stored timestamp is rejected.
    pub fn append(&self, snapshot: &Snapshot) -> Result<()> {
        if self
            .read_all()?
            .iter()
            .any(|s| s.taken_at == snapshot.taken_at)
        {
            return Err(Error::DuplicateSnapshot(snapshot.taken_at));
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(snapshot)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::info!("Appended snapshot {} taken at {}", snapshot.id, snapshot.taken_at);
        Ok(())
    }

    /// All snapshots, newest first.
    pub fn history(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = self.read_all()?;
        snapshots.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(snapshots)
    }

    /// The most recent snapshot, if any.
    pub fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self.read_all()?.into_iter().max_by_key(|s| s.taken_at))
    }

    /// Allocation of the most recent snapshot; empty when there is none.
    pub fn latest_allocation(&self) -> Result<Vec<(String, f64)>> {
        Ok(self
            .latest()?
            .map(|s| s.allocation())
            .unwrap_or_default())
    }

    fn read_all(&self) -> Result<Vec<Snapshot>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_metrics_at;
    use crate::prices::{CurrentPrices, PriceSeries};
    use crate::types::Holding;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn output_at(timestamp: DateTime<Utc>, price: f64) -> EngineOutput {
        let holdings = vec![Holding::new("MSFT", 2, 400.0), Holding::new("AAPL", 10, 150.0)];
        let current: CurrentPrices = [("AAPL".to_string(), price), ("MSFT".to_string(), 420.0)]
            .into_iter()
            .collect();
        compute_metrics_at(&holdings, &current, &PriceSeries::new(), timestamp).unwrap()
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_snapshot_from_output() {
        let snapshot = Snapshot::from_output(&output_at(base_time(), 180.0));

        assert_eq!(snapshot.taken_at, base_time());
        assert_eq!(snapshot.holdings.len(), 2);
        assert_eq!(snapshot.holdings[0].ticker, "AAPL");
        assert_eq!(snapshot.holdings[0].market_value, 1800.0);
        assert_eq!(snapshot.holdings[0].unrealized_pnl, 300.0);
    }

    #[test]
    fn test_history_newest_first() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));

        let later = base_time() + Duration::hours(1);
        store
            .append(&Snapshot::from_output(&output_at(later, 190.0)))
            .unwrap();
        store
            .append(&Snapshot::from_output(&output_at(base_time(), 180.0)))
            .unwrap();

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].taken_at, later);
        assert_eq!(history[1].taken_at, base_time());

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.taken_at, later);
    }

    #[test]
    fn test_append_never_overwrites() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));

        let first = Snapshot::from_output(&output_at(base_time(), 180.0));
        store.append(&first).unwrap();

        let clash = Snapshot::from_output(&output_at(base_time(), 999.0));
        assert!(matches!(
            store.append(&clash),
            Err(Error::DuplicateSnapshot(_))
        ));

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[0].holdings[0].current_price, 180.0);
    }

    #[test]
    fn test_latest_allocation() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));
        assert!(store.latest_allocation().unwrap().is_empty());

        store
            .append(&Snapshot::from_output(&output_at(base_time(), 180.0)))
            .unwrap();

        let allocation = store.latest_allocation().unwrap();
        assert_eq!(
            allocation,
            vec![("AAPL".to_string(), 1800.0), ("MSFT".to_string(), 840.0)]
        );
    }

    #[test]
    fn test_statistics_survive_round_trip() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshots.jsonl"));
        let snapshot = Snapshot::from_output(&output_at(base_time(), 180.0));

        store.append(&snapshot).unwrap();
        let stored = store.latest().unwrap().unwrap();

        assert_eq!(stored.metrics.sharpe_ratio, snapshot.metrics.sharpe_ratio);
        assert!(!stored.metrics.sharpe_ratio.is_defined());
    }
}
