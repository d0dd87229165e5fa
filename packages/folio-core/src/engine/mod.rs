//! Portfolio metrics engine.
//!
//! A single stateless pass over in-memory data:
//!
//! - **Valuation**: one [`ValuationRow`] per holding at the latest close
//! - **Weighting**: current-value weights over the trailing series
//! - **Returns**: weighted daily portfolio returns over the lookback window
//! - **Statistics**: compounded/annualized return, volatility, Sharpe ratio
//!
//! Point-in-time figures (market value, cost basis, total return percent)
//! cover every holding. The risk/return statistics only cover holdings that
//! have a trailing series, so the two can be computed over different sets of
//! tickers; [`PortfolioMetrics::unweighted_tickers`] names the difference.
//!
//! [`performance_view`] runs the valuation stage alone and ranks the holdings
//! by P&L percent.

mod returns;
mod stats;
mod valuation;
mod weights;

pub use returns::{portfolio_returns, ticker_returns, DailyReturn};
pub use stats::{
    annualize_return, compounded_return, mean, sample_std, RiskReturn, TRADING_DAYS_PER_YEAR,
    ZERO_VOLATILITY_EPSILON,
};
pub use valuation::Valuation;
pub use weights::{Weighting, Weights};

use crate::prices::{self, CurrentPrices, PriceSeries};
use crate::types::{Holding, PortfolioMetrics, ValuationRow};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything one engine run produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineOutput {
    pub rows: Vec<ValuationRow>,
    pub metrics: PortfolioMetrics,
}

/// Compute valuation rows and portfolio metrics, stamped with the current time.
pub fn compute_metrics(
    holdings: &[Holding],
    current: &CurrentPrices,
    trailing: &PriceSeries,
) -> Result<EngineOutput> {
    compute_metrics_at(holdings, current, trailing, Utc::now())
}

/// Compute valuation rows and portfolio metrics as of `timestamp`.
///
/// Identical inputs always give identical output.
pub fn compute_metrics_at(
    holdings: &[Holding],
    current: &CurrentPrices,
    trailing: &PriceSeries,
    timestamp: DateTime<Utc>,
) -> Result<EngineOutput> {
    validate_holdings(holdings)?;
    prices::validate_current(current)?;
    prices::validate_series(trailing)?;

    let valuation = Valuation::from_holdings(holdings, current);
    let weighting = Weighting::from_trailing(holdings, trailing);
    if weighting.is_empty() && !holdings.is_empty() {
        tracing::warn!("No holding has a usable trailing series, risk statistics are undefined");
    }
    let daily: Vec<f64> = portfolio_returns(trailing, &weighting.weights)
        .into_iter()
        .map(|r| r.value)
        .collect();
    let stats = RiskReturn::from_returns(&daily);

    tracing::debug!(
        "Valued {} holdings, {} weighted, {} daily returns",
        holdings.len(),
        weighting.weights.len(),
        stats.observations
    );

    let metrics = PortfolioMetrics {
        timestamp,
        total_market_value: valuation.total_market_value,
        total_cost_basis: valuation.total_cost_basis,
        total_unrealized_pnl: valuation.total_unrealized_pnl,
        total_return_percent: valuation.total_return_percent(),
        window_return_percent: stats.window_return_percent,
        annualized_return_percent: stats.annualized_return_percent,
        annualized_volatility_percent: stats.volatility_percent,
        sharpe_ratio: stats.sharpe_ratio,
        return_observations: stats.observations,
        holding_count: valuation.rows.len(),
        positions_in_profit: valuation.positions_in_profit(),
        positions_in_loss: valuation.positions_in_loss(),
        missing_prices: valuation.missing_prices,
        unweighted_tickers: weighting.excluded,
    };

    Ok(EngineOutput {
        rows: valuation.rows,
        metrics,
    })
}

/// Holdings ranked by unrealized P&L percent, with their share of market value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceView {
    /// Best to worst P&L percent; rows without a percent go last
    pub rows: Vec<ValuationRow>,
    /// (ticker, fraction of total market value); empty when nothing has value
    pub allocation: Vec<(String, f64)>,
    pub positions_in_profit: usize,
    pub positions_in_loss: usize,
}

/// Value the holdings at the latest closes and rank them by P&L percent.
pub fn performance_view(holdings: &[Holding], current: &CurrentPrices) -> Result<PerformanceView> {
    validate_holdings(holdings)?;
    prices::validate_current(current)?;

    let valuation = Valuation::from_holdings(holdings, current);
    Ok(PerformanceView {
        rows: valuation.ranked_by_return().into_iter().cloned().collect(),
        allocation: valuation.allocation(),
        positions_in_profit: valuation.positions_in_profit(),
        positions_in_loss: valuation.positions_in_loss(),
    })
}

/// Reject holdings that break the input contract, including duplicate tickers.
pub fn validate_holdings(holdings: &[Holding]) -> Result<()> {
    let mut seen = HashSet::with_capacity(holdings.len());
    for holding in holdings {
        holding.validate()?;
        if !seen.insert(holding.ticker.as_str()) {
            return Err(Error::InvalidHolding(format!(
                "{} appears more than once",
                holding.ticker
            )));
        }
    }
    Ok(())
}
