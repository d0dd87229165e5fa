//! Daily return series, per ticker and for the weighted portfolio.

use super::weights::Weights;
use crate::prices::{PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Portfolio return for one trading day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyReturn {
    pub date: NaiveDate,
    /// Fractional change (0.01 = 1%)
    pub value: f64,
}

/// Day-over-day fractional change of a single ticker, keyed by the later date.
///
/// The first observation has no predecessor and yields nothing, so a series
/// with a single point produces an empty map.
pub fn ticker_returns(points: &[PricePoint]) -> BTreeMap<NaiveDate, f64> {
    points
        .windows(2)
        .filter(|pair| pair[0].close > 0.0)
        .map(|pair| (pair[1].date, pair[1].close / pair[0].close - 1.0))
        .collect()
}

/// Weighted sum of per-ticker daily returns for every date in the window
/// except the first.
///
/// The window is the union of the weighted tickers' dates. A ticker with no
/// return on a given date (its first observation, or a gap) contributes zero
/// for that date.
pub fn portfolio_returns(trailing: &PriceSeries, weights: &Weights) -> Vec<DailyReturn> {
    let weighted: Vec<(f64, &[PricePoint])> = weights
        .iter()
        .filter_map(|(ticker, weight)| {
            trailing
                .get(ticker)
                .map(|points| (*weight, points.as_slice()))
        })
        .collect();

    let dates: BTreeSet<NaiveDate> = weighted
        .iter()
        .flat_map(|(_, points)| points.iter().map(|p| p.date))
        .collect();

    let per_ticker: Vec<(f64, BTreeMap<NaiveDate, f64>)> = weighted
        .iter()
        .map(|(weight, points)| (*weight, ticker_returns(points)))
        .collect();

    dates
        .into_iter()
        .skip(1)
        .map(|date| {
            let value = per_ticker
                .iter()
                .map(|(weight, returns)| weight * returns.get(&date).copied().unwrap_or(0.0))
                .sum();
            DailyReturn { date, value }
        })
        .collect()
}
