//! Core data types for the Folio metrics engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A recorded quantity of one ticker acquired at a recorded purchase price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Stock ticker symbol (uppercase)
    pub ticker: String,
    /// Number of shares held
    pub quantity: u32,
    /// Price paid per share
    pub purchase_price: f64,
}

impl Holding {
    /// Create a new holding. The ticker is normalised to uppercase.
    pub fn new(ticker: &str, quantity: u32, purchase_price: f64) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
            quantity,
            purchase_price,
        }
    }

    /// Quantity × purchase price.
    pub fn cost_basis(&self) -> f64 {
        f64::from(self.quantity) * self.purchase_price
    }

    /// Check the input constraints a holding must satisfy before valuation.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(Error::InvalidHolding("ticker must not be empty".to_string()));
        }
        if self.ticker != self.ticker.trim() {
            return Err(Error::InvalidHolding(format!(
                "ticker {:?} has surrounding whitespace",
                self.ticker
            )));
        }
        if self.ticker != self.ticker.to_uppercase() {
            return Err(Error::InvalidHolding(format!(
                "ticker {} must be uppercase",
                self.ticker
            )));
        }
        if self.quantity == 0 {
            return Err(Error::InvalidHolding(format!(
                "{}: quantity must be positive",
                self.ticker
            )));
        }
        if !self.purchase_price.is_finite() || self.purchase_price < 0.0 {
            return Err(Error::InvalidHolding(format!(
                "{}: purchase price must be a non-negative number, got {}",
                self.ticker, self.purchase_price
            )));
        }
        Ok(())
    }
}

/// Why a statistic could not be computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Too few return observations in the lookback window
    InsufficientData,
    /// Daily returns have zero dispersion, so a ratio over volatility has no value
    ZeroVolatility,
    /// Nothing was invested, so a cost-relative return has no value
    ZeroCostBasis,
    /// The arithmetic produced NaN or infinity
    NonFinite,
}

impl std::fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InsufficientData => "insufficient data",
            Self::ZeroVolatility => "zero volatility",
            Self::ZeroCostBasis => "zero cost basis",
            Self::NonFinite => "non-finite result",
        };
        f.write_str(label)
    }
}

/// A derived figure that is either a number or an explicit "undefined" marker.
///
/// Serialized as `{"status": "defined", "value": 1.5}` or
/// `{"status": "undefined", "value": "insufficient_data"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Statistic {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Statistic {
    /// Wrap a computed value, demoting NaN and infinities to `Undefined(NonFinite)`.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined(UndefinedReason::NonFinite)
        }
    }

    /// The value, if defined.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined(_) => None,
        }
    }

    /// The reason, if undefined.
    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Self::Defined(_) => None,
            Self::Undefined(reason) => Some(*reason),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{:.2}", v),
            Self::Undefined(reason) => write!(f, "n/a ({})", reason),
        }
    }
}

/// Point-in-time valuation of a single holding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValuationRow {
    pub ticker: String,
    pub quantity: u32,
    pub purchase_price: f64,
    /// Latest close, or 0.0 when no price was available
    pub current_price: f64,
    /// quantity × current_price
    pub market_value: f64,
    /// quantity × purchase_price
    pub cost_basis: f64,
    /// market_value − cost_basis
    pub unrealized_pnl: f64,
    /// Unrealized P&L as a percentage of cost basis; `None` when cost basis is zero
    pub unrealized_pnl_percent: Option<f64>,
    /// Set when the current price was substituted with zero
    #[serde(default)]
    pub price_missing: bool,
}

/// Portfolio-level metrics for one engine run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioMetrics {
    /// Wall-clock time of the computation
    pub timestamp: DateTime<Utc>,
    pub total_market_value: f64,
    pub total_cost_basis: f64,
    pub total_unrealized_pnl: f64,
    /// Point-in-time return relative to cost basis, in percent
    pub total_return_percent: Statistic,
    /// Compounded portfolio return over the lookback window, in percent
    pub window_return_percent: Statistic,
    /// Window return scaled to a 252-trading-day year, in percent
    pub annualized_return_percent: Statistic,
    /// Sample standard deviation of daily returns × √252, in percent
    pub annualized_volatility_percent: Statistic,
    /// Annualized mean return over annualized volatility, risk-free rate zero
    pub sharpe_ratio: Statistic,
    /// Number of daily portfolio returns the statistics were computed from
    pub return_observations: usize,
    pub holding_count: usize,
    pub positions_in_profit: usize,
    pub positions_in_loss: usize,
    /// Tickers valued at zero because no current price was available
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_prices: Vec<String>,
    /// Held tickers left out of the risk statistics for lack of a trailing series
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unweighted_tickers: Vec<String>,
}

/// API response wrapper for the CLI's JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
