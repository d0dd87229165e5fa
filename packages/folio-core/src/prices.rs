//! Price inputs for the metrics engine.
//!
//! The engine never fetches prices itself. A [`PriceProvider`] hands it a
//! latest-close lookup and a trailing window of daily closes; absent tickers
//! are an expected state and are simply missing from the returned maps.

use crate::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Default lookback for the trailing series: one calendar year.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

/// A single daily close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Ticker → ascending daily closes.
pub type PriceSeries = BTreeMap<String, Vec<PricePoint>>;

/// Ticker → latest close.
pub type CurrentPrices = HashMap<String, f64>;

/// Trailing window used for the risk/return statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lookback {
    pub days: u32,
}

impl Lookback {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    /// First date (inclusive) of a window ending on `end`.
    ///
    /// A window reaching past the earliest representable date starts there.
    pub fn start_for(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// Capability that resolves prices for a set of tickers.
///
/// Implementations surface fetch failures as errors and omit tickers they
/// cannot resolve. They must not fabricate prices.
pub trait PriceProvider {
    /// Latest close for each resolvable ticker.
    fn latest_closes(&self, tickers: &[String]) -> Result<CurrentPrices>;

    /// Daily closes over the lookback window for each resolvable ticker.
    fn trailing_closes(&self, tickers: &[String], lookback: Lookback) -> Result<PriceSeries>;
}

/// Check the shape of a trailing series: strictly ascending unique dates and
/// finite, positive closes.
pub fn validate_series(series: &PriceSeries) -> Result<()> {
    for (ticker, points) in series {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(Error::MalformedPrices(format!(
                    "{}: dates must be strictly ascending ({} after {})",
                    ticker, pair[1].date, pair[0].date
                )));
            }
        }
        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(Error::MalformedPrices(format!(
                "{}: close on {} must be a positive number, got {}",
                ticker, bad.date, bad.close
            )));
        }
    }
    Ok(())
}

/// Check a latest-close lookup: every quote must be finite and non-negative.
pub fn validate_current(prices: &CurrentPrices) -> Result<()> {
    for (ticker, price) in prices {
        if !price.is_finite() || *price < 0.0 {
            return Err(Error::MalformedPrices(format!(
                "{}: current price must be a non-negative number, got {}",
                ticker, price
            )));
        }
    }
    Ok(())
}

/// Last close of every non-empty series.
pub fn latest_closes(series: &PriceSeries) -> CurrentPrices {
    series
        .iter()
        .filter_map(|(ticker, points)| points.last().map(|p| (ticker.clone(), p.close)))
        .collect()
}

/// Keep only the points that fall within `lookback` of `end` (inclusive).
pub fn clip_to_window(points: &[PricePoint], end: NaiveDate, lookback: Lookback) -> Vec<PricePoint> {
    let start = lookback.start_for(end);
    points
        .iter()
        .filter(|p| p.date >= start && p.date <= end)
        .copied()
        .collect()
}

/// Provider backed by price data already held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticPriceProvider {
    /// Full daily history per ticker
    #[serde(default)]
    pub series: PriceSeries,
    /// Latest quotes that take precedence over the last close of `series`
    #[serde(default)]
    pub latest: CurrentPrices,
}

impl StaticPriceProvider {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series,
            latest: CurrentPrices::new(),
        }
    }

    /// Attach an explicit latest quote for a ticker.
    pub fn with_latest(mut self, ticker: &str, price: f64) -> Self {
        self.latest.insert(ticker.to_uppercase(), price);
        self
    }

    /// Load a JSON price document of the form
    /// `{"series": {"AAPL": [{"date": "2024-01-02", "close": 185.6}]}, "latest": {"AAPL": 190.0}}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut provider: Self = serde_json::from_str(&content)?;

        // Tickers are matched against uppercase holdings
        provider.series = provider
            .series
            .into_iter()
            .map(|(ticker, points)| (ticker.to_uppercase(), points))
            .collect();
        provider.latest = provider
            .latest
            .into_iter()
            .map(|(ticker, price)| (ticker.to_uppercase(), price))
            .collect();

        validate_series(&provider.series)?;
        validate_current(&provider.latest)?;
        Ok(provider)
    }

    /// Most recent date across every series.
    fn end_date(&self) -> Option<NaiveDate> {
        self.series
            .values()
            .filter_map(|points| points.last().map(|p| p.date))
            .max()
    }
}

impl PriceProvider for StaticPriceProvider {
    fn latest_closes(&self, tickers: &[String]) -> Result<CurrentPrices> {
        let from_series = latest_closes(&self.series);
        Ok(tickers
            .iter()
            .filter_map(|ticker| {
                self.latest
                    .get(ticker)
                    .or_else(|| from_series.get(ticker))
                    .map(|price| (ticker.clone(), *price))
            })
            .collect())
    }

    fn trailing_closes(&self, tickers: &[String], lookback: Lookback) -> Result<PriceSeries> {
        let Some(end) = self.end_date() else {
            return Ok(PriceSeries::new());
        };

        Ok(tickers
            .iter()
            .filter_map(|ticker| {
                let points = clip_to_window(self.series.get(ticker)?, end, lookback);
                (!points.is_empty()).then(|| (ticker.clone(), points))
            })
            .collect())
    }
}
