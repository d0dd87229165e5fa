//! Point-in-time valuation of holdings.

use crate::prices::CurrentPrices;
use crate::types::{Holding, Statistic, UndefinedReason, ValuationRow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

impl ValuationRow {
    /// Value a holding at `current_price`.
    ///
    /// A missing price is valued at zero and flagged, so that downstream
    /// consumers can tell it apart from a genuine total loss.
    pub fn from_holding(holding: &Holding, current_price: Option<f64>) -> Self {
        let price_missing = current_price.is_none();
        let current_price = current_price.unwrap_or(0.0);

        let quantity = f64::from(holding.quantity);
        let market_value = quantity * current_price;
        let cost_basis = holding.cost_basis();
        let unrealized_pnl = market_value - cost_basis;
        let unrealized_pnl_percent = if cost_basis > 0.0 {
            Some((unrealized_pnl / cost_basis) * 100.0)
        } else {
            None
        };

        Self {
            ticker: holding.ticker.clone(),
            quantity: holding.quantity,
            purchase_price: holding.purchase_price,
            current_price,
            market_value,
            cost_basis,
            unrealized_pnl,
            unrealized_pnl_percent,
            price_missing,
        }
    }
}

/// Valuation rows plus the totals derived from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    pub rows: Vec<ValuationRow>,
    pub total_market_value: f64,
    pub total_cost_basis: f64,
    pub total_unrealized_pnl: f64,
    /// Tickers that had no current price
    pub missing_prices: Vec<String>,
}

impl Valuation {
    /// Value every holding against the latest-close lookup.
    pub fn from_holdings(holdings: &[Holding], current: &CurrentPrices) -> Self {
        let rows: Vec<ValuationRow> = holdings
            .iter()
            .map(|h| ValuationRow::from_holding(h, current.get(&h.ticker).copied()))
            .collect();

        let missing_prices: Vec<String> = rows
            .iter()
            .filter(|r| r.price_missing)
            .map(|r| r.ticker.clone())
            .collect();
        for ticker in &missing_prices {
            tracing::warn!("No current price for {}, valuing at zero", ticker);
        }

        let total_market_value = rows.iter().map(|r| r.market_value).sum::<f64>();
        let total_cost_basis = rows.iter().map(|r| r.cost_basis).sum::<f64>();

        Self {
            rows,
            total_market_value,
            total_cost_basis,
            total_unrealized_pnl: total_market_value - total_cost_basis,
            missing_prices,
        }
    }

    /// Unrealized P&L relative to total cost basis, in percent.
    pub fn total_return_percent(&self) -> Statistic {
        if self.total_cost_basis > 0.0 {
            Statistic::from_value((self.total_unrealized_pnl / self.total_cost_basis) * 100.0)
        } else {
            Statistic::Undefined(UndefinedReason::ZeroCostBasis)
        }
    }

    pub fn positions_in_profit(&self) -> usize {
        self.rows.iter().filter(|r| r.unrealized_pnl > 0.0).count()
    }

    /// Holdings with a missing price are not counted as losses.
    pub fn positions_in_loss(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !r.price_missing && r.unrealized_pnl < 0.0)
            .count()
    }

    /// Rows ordered from best to worst P&L percent; rows without a percent go last.
    pub fn ranked_by_return(&self) -> Vec<&ValuationRow> {
        let mut ranked: Vec<&ValuationRow> = self.rows.iter().collect();
        ranked.sort_by(|a, b| match (a.unrealized_pnl_percent, b.unrealized_pnl_percent) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        ranked
    }

    /// Share of total market value held in each ticker.
    pub fn allocation(&self) -> Vec<(String, f64)> {
        if self.total_market_value <= 0.0 {
            return Vec::new();
        }

        self.rows
            .iter()
            .map(|r| (r.ticker.clone(), r.market_value / self.total_market_value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prices(entries: &[(&str, f64)]) -> CurrentPrices {
        entries
            .iter()
            .map(|(t, p)| (t.to_string(), *p))
            .collect()
    }

    #[test]
    fn test_row_from_holding() {
        let row = ValuationRow::from_holding(&Holding::new("AAPL", 10, 150.0), Some(180.0));

        assert_relative_eq!(row.market_value, 1800.0);
        assert_relative_eq!(row.cost_basis, 1500.0);
        assert_relative_eq!(row.unrealized_pnl, 300.0);
        assert_relative_eq!(row.unrealized_pnl_percent.unwrap(), 20.0);
        assert!(!row.price_missing);
    }

    #[test]
    fn test_row_zero_cost_basis_has_no_percent() {
        let row = ValuationRow::from_holding(&Holding::new("GIFT", 5, 0.0), Some(12.0));

        assert_relative_eq!(row.market_value, 60.0);
        assert_eq!(row.unrealized_pnl_percent, None);
    }

    #[test]
    fn test_missing_price_is_flagged() {
        let row = ValuationRow::from_holding(&Holding::new("GONE", 4, 25.0), None);

        assert!(row.price_missing);
        assert_eq!(row.current_price, 0.0);
        assert_eq!(row.market_value, 0.0);
        assert_relative_eq!(row.unrealized_pnl, -100.0);
    }

    #[test]
    fn test_totals_are_row_sums() {
        let holdings = vec![
            Holding::new("AAPL", 10, 150.0),
            Holding::new("GOOGL", 5, 100.0),
            Holding::new("GONE", 2, 10.0),
        ];
        let valuation =
            Valuation::from_holdings(&holdings, &prices(&[("AAPL", 175.0), ("GOOGL", 90.0)]));

        let row_mv: f64 = valuation.rows.iter().map(|r| r.market_value).sum();
        let row_cost: f64 = valuation.rows.iter().map(|r| r.cost_basis).sum();

        assert_relative_eq!(valuation.total_market_value, row_mv);
        assert_relative_eq!(valuation.total_cost_basis, row_cost);
        assert_relative_eq!(valuation.total_market_value, 2200.0); // 1750 + 450
        assert_relative_eq!(valuation.total_cost_basis, 2020.0);
        assert_eq!(valuation.missing_prices, vec!["GONE".to_string()]);
        assert_eq!(valuation.positions_in_profit(), 1);
        assert_eq!(valuation.positions_in_loss(), 1);
    }

    #[test]
    fn test_total_return_zero_cost_basis() {
        let valuation =
            Valuation::from_holdings(&[Holding::new("GIFT", 1, 0.0)], &prices(&[("GIFT", 3.0)]));

        assert_eq!(
            valuation.total_return_percent(),
            Statistic::Undefined(UndefinedReason::ZeroCostBasis)
        );
    }

    #[test]
    fn test_ranked_by_return() {
        let holdings = vec![
            Holding::new("LOSS", 1, 100.0),
            Holding::new("GIFT", 1, 0.0),
            Holding::new("WIN", 1, 100.0),
        ];
        let valuation = Valuation::from_holdings(
            &holdings,
            &prices(&[("LOSS", 80.0), ("GIFT", 5.0), ("WIN", 130.0)]),
        );

        let order: Vec<&str> = valuation
            .ranked_by_return()
            .iter()
            .map(|r| r.ticker.as_str())
            .collect();
        assert_eq!(order, vec!["WIN", "LOSS", "GIFT"]);
    }

    #[test]
    fn test_allocation() {
        let holdings = vec![Holding::new("AAPL", 10, 100.0), Holding::new("GOOGL", 10, 100.0)];
        let valuation =
            Valuation::from_holdings(&holdings, &prices(&[("AAPL", 100.0), ("GOOGL", 100.0)]));

        let allocation = valuation.allocation();

        assert_eq!(allocation.len(), 2);
        assert_relative_eq!(allocation[0].1, 0.5);
        assert_relative_eq!(allocation[1].1, 0.5);
    }
}
