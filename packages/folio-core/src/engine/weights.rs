//! Current-value weights for the return-series aggregation.

use crate::prices::PriceSeries;
use crate::types::Holding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized weight per ticker.
pub type Weights = BTreeMap<String, f64>;

/// Result of the weighting stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Weighting {
    pub weights: Weights,
    /// Held tickers with no trailing series; their capital is left out of
    /// the risk/return statistics.
    pub excluded: Vec<String>,
}

impl Weighting {
    /// Weight each holding by its current market value, taken as the last
    /// close of its trailing series times quantity.
    pub fn from_trailing(holdings: &[Holding], trailing: &PriceSeries) -> Self {
        let mut values = Vec::with_capacity(holdings.len());
        let mut excluded = Vec::new();

        for holding in holdings {
            match trailing.get(&holding.ticker).and_then(|points| points.last()) {
                Some(last) => values.push((
                    holding.ticker.clone(),
                    f64::from(holding.quantity) * last.close,
                )),
                None => excluded.push(holding.ticker.clone()),
            }
        }

        for ticker in &excluded {
            tracing::warn!("No trailing prices for {}, excluded from risk statistics", ticker);
        }

        let total: f64 = values.iter().map(|(_, v)| v).sum();
        if total <= 0.0 {
            return Self {
                weights: Weights::new(),
                excluded,
            };
        }

        let weights = values
            .into_iter()
            .map(|(ticker, value)| (ticker, value / total))
            .collect();

        Self { weights, excluded }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
