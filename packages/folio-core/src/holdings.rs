//! Holdings list and its JSON persistence.

use crate::types::Holding;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk form of the holdings list.
#[derive(Debug, Clone, Default, Serialize)]
struct HoldingsFile {
    holdings: Vec<Holding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Holdings file as read back, before quantities are checked.
#[derive(Debug, Deserialize)]
struct StoredHoldingsFile {
    holdings: Vec<StoredHolding>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// A holding row as written by hand; the quantity may not be a share count.
#[derive(Debug, Deserialize)]
struct StoredHolding {
    ticker: String,
    quantity: f64,
    purchase_price: f64,
}

impl TryFrom<StoredHolding> for Holding {
    type Error = Error;

    fn try_from(stored: StoredHolding) -> Result<Self> {
        let quantity = stored.quantity;
        if !quantity.is_finite()
            || quantity < 0.0
            || quantity.fract() != 0.0
            || quantity > f64::from(u32::MAX)
        {
            return Err(Error::InvalidHolding(format!(
                "{}: quantity must be a whole number of shares, got {}",
                stored.ticker, quantity
            )));
        }

        Ok(Holding {
            ticker: stored.ticker,
            quantity: quantity as u32,
            purchase_price: stored.purchase_price,
        })
    }
}

fn into_holdings(stored: Vec<StoredHolding>) -> Result<Vec<Holding>> {
    stored.into_iter().map(Holding::try_from).collect()
}

/// Holdings store that keeps one row per ticker and persists to JSON.
#[derive(Debug)]
pub struct HoldingsStore {
    /// Path to the holdings JSON file; empty for an in-memory store
    path: PathBuf,
    file: HoldingsFile,
}

impl HoldingsStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = Self::load_from_path(&path)?;
        Ok(Self { path, file })
    }

    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            file: HoldingsFile::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<HoldingsFile> {
        if path.as_os_str().is_empty() || !path.exists() {
            return Ok(HoldingsFile::default());
        }

        let content = fs::read_to_string(path)?;
        let data: serde_json::Value = serde_json::from_str(&content)?;

        // A bare array of holdings is accepted too
        let file = if data.is_array() {
            HoldingsFile {
                holdings: into_holdings(serde_json::from_value(data)?)?,
                ..Default::default()
            }
        } else {
            let stored: StoredHoldingsFile = serde_json::from_value(data)?;
            HoldingsFile {
                holdings: into_holdings(stored.holdings)?,
                created_at: stored.created_at,
                updated_at: stored.updated_at,
            }
        };

        crate::engine::validate_holdings(&file.holdings)?;
        Ok(file)
    }

    /// Write the holdings to disk.
    pub fn save(&mut self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let now = Utc::now();
        self.file.created_at.get_or_insert(now);
        self.file.updated_at = Some(now);

        let content = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, content)?;
        tracing::debug!("Saved {} holdings to {}", self.file.holdings.len(), self.path.display());
        Ok(())
    }

    /// Consistent snapshot of the current holdings.
    pub fn holdings(&self) -> &[Holding] {
        &self.file.holdings
    }

    pub fn tickers(&self) -> Vec<String> {
        self.file.holdings.iter().map(|h| h.ticker.clone()).collect()
    }

    /// Add shares of a ticker.
    ///
    /// An existing ticker is merged: quantities add up and the purchase price
    /// becomes the quantity-weighted average of both lots.
    ///
    /// Returns the resulting holding and whether an existing one was updated.
    pub fn add(&mut self, ticker: &str, quantity: u32, purchase_price: f64) -> Result<(Holding, bool)> {
        let incoming = Holding::new(ticker, quantity, purchase_price);
        incoming.validate()?;

        let Some(idx) = self
            .file
            .holdings
            .iter()
            .position(|h| h.ticker == incoming.ticker)
        else {
            self.file.holdings.push(incoming.clone());
            return Ok((incoming, false));
        };

        let existing = &self.file.holdings[idx];
        let total_quantity = existing.quantity.checked_add(quantity).ok_or_else(|| {
            Error::InvalidHolding(format!("{}: quantity overflow", incoming.ticker))
        })?;
        let avg_price =
            (existing.cost_basis() + incoming.cost_basis()) / f64::from(total_quantity);

        let merged = Holding::new(&incoming.ticker, total_quantity, avg_price);
        self.file.holdings[idx] = merged.clone();
        Ok((merged, true))
    }

    /// Remove a ticker. Returns the removed holding.
    pub fn remove(&mut self, ticker: &str) -> Result<Holding> {
        let ticker = ticker.trim().to_uppercase();

        match self.file.holdings.iter().position(|h| h.ticker == ticker) {
            Some(idx) => Ok(self.file.holdings.remove(idx)),
            None => Err(Error::HoldingNotFound(ticker)),
        }
    }

    /// Total cost basis across all holdings.
    pub fn total_cost(&self) -> f64 {
        self.file.holdings.iter().map(|h| h.cost_basis()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_add_new_holding() {
        let mut store = HoldingsStore::in_memory();
        let (holding, was_update) = store.add("aapl", 10, 150.0).unwrap();

        assert!(!was_update);
        assert_eq!(holding.ticker, "AAPL");
        assert_eq!(holding.quantity, 10);
        assert_eq!(store.holdings().len(), 1);
    }

    #[test]
    fn test_add_existing_averages_price() {
        let mut store = HoldingsStore::in_memory();
        store.add("AAPL", 10, 150.0).unwrap();

        let (holding, was_update) = store.add("AAPL", 10, 170.0).unwrap();

        assert!(was_update);
        assert_eq!(holding.quantity, 20);
        // (10 * 150 + 10 * 170) / 20
        assert_eq!(holding.purchase_price, 160.0);
        assert_eq!(store.holdings().len(), 1);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut store = HoldingsStore::in_memory();

        assert!(matches!(
            store.add("AAPL", 0, 150.0),
            Err(Error::InvalidHolding(_))
        ));
        assert!(matches!(
            store.add("AAPL", 1, -5.0),
            Err(Error::InvalidHolding(_))
        ));
        assert!(store.holdings().is_empty());
    }

    #[test]
    fn test_remove() {
        let mut store = HoldingsStore::in_memory();
        store.add("AAPL", 10, 150.0).unwrap();
        store.add("GOOGL", 5, 100.0).unwrap();

        let removed = store.remove("aapl").unwrap();

        assert_eq!(removed.ticker, "AAPL");
        assert_eq!(store.tickers(), vec!["GOOGL".to_string()]);
    }

    #[test]
    fn test_remove_not_found() {
        let mut store = HoldingsStore::in_memory();
        assert!(matches!(
            store.remove("AAPL"),
            Err(Error::HoldingNotFound(_))
        ));
    }

    #[test]
    fn test_total_cost() {
        let mut store = HoldingsStore::in_memory();
        store.add("AAPL", 10, 150.0).unwrap();
        store.add("msft", 2, 400.0).unwrap();

        assert_eq!(store.total_cost(), 2300.0);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("holdings.json");

        {
            let mut store = HoldingsStore::open(&path).unwrap();
            store.add("AAPL", 10, 150.0).unwrap();
            store.add("MSFT", 3, 410.5).unwrap();
            store.save().unwrap();
        }

        let store = HoldingsStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert_eq!(
            store.holdings(),
            &[Holding::new("AAPL", 10, 150.0), Holding::new("MSFT", 3, 410.5)]
        );
        assert!(store.file.created_at.is_some());
    }

    #[test]
    fn test_open_accepts_bare_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("holdings.json");
        fs::write(
            &path,
            r#"[{"ticker": "AAPL", "quantity": 10, "purchase_price": 150.0}]"#,
        )
        .unwrap();

        let store = HoldingsStore::open(&path).unwrap();
        assert_eq!(store.tickers(), vec!["AAPL".to_string()]);
    }

    #[test]
    fn test_open_rejects_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("holdings.json");
        fs::write(
            &path,
            r#"[{"ticker": "AAPL", "quantity": 0, "purchase_price": 150.0}]"#,
        )
        .unwrap();

        assert!(matches!(
            HoldingsStore::open(&path),
            Err(Error::InvalidHolding(_))
        ));
    }

    #[test]
    fn test_open_rejects_non_share_quantity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("holdings.json");

        for quantity in ["-3", "2.5"] {
            fs::write(
                &path,
                format!(
                    r#"{{"holdings": [{{"ticker": "AAPL", "quantity": {}, "purchase_price": 150.0}}]}}"#,
                    quantity
                ),
            )
            .unwrap();

            assert!(matches!(
                HoldingsStore::open(&path),
                Err(Error::InvalidHolding(_))
            ));
        }
    }

    #[test]
    fn test_open_rejects_ticker_with_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("holdings.json");
        fs::write(
            &path,
            r#"[{"ticker": " AAPL", "quantity": 1, "purchase_price": 1.0}]"#,
        )
        .unwrap();

        assert!(matches!(
            HoldingsStore::open(&path),
            Err(Error::InvalidHolding(_))
        ));
    }
}
