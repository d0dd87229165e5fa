//! Risk/return statistics over a daily portfolio return series.
//!
//! Every figure is a [`Statistic`]: series too short to support a figure, or
//! a zero-variance series under a ratio, yield `Undefined` rather than NaN.

use crate::types::{Statistic, UndefinedReason};
use serde::{Deserialize, Serialize};

/// Canonical number of trading days in a year.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations at or below this are treated as exactly zero.
pub const ZERO_VOLATILITY_EPSILON: f64 = 1e-12;

/// Statistics derived from the portfolio's daily returns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskReturn {
    /// Compounded return over the window, in percent
    pub window_return_percent: Statistic,
    /// Window return annualized over 252 trading days, in percent
    pub annualized_return_percent: Statistic,
    /// Annualized volatility, in percent
    pub volatility_percent: Statistic,
    /// Sharpe ratio with a zero risk-free rate
    pub sharpe_ratio: Statistic,
    /// Number of daily returns used
    pub observations: usize,
}

impl RiskReturn {
    /// Compute all statistics from daily fractional returns.
    pub fn from_returns(returns: &[f64]) -> Self {
        let observations = returns.len();

        let window_return_percent = match compounded_return(returns) {
            Some(r) => Statistic::from_value(r * 100.0),
            None => Statistic::Undefined(UndefinedReason::InsufficientData),
        };

        let annualized_return_percent = match window_return_percent {
            Statistic::Defined(pct) => {
                annualize_return(pct, observations, TRADING_DAYS_PER_YEAR)
            }
            undefined => undefined,
        };

        let (volatility_percent, sharpe_ratio) = match (mean(returns), sample_std(returns)) {
            (Some(_), Some(std)) if std <= ZERO_VOLATILITY_EPSILON => (
                Statistic::Defined(0.0),
                Statistic::Undefined(UndefinedReason::ZeroVolatility),
            ),
            (Some(mean), Some(std)) => {
                let annual_vol = std * TRADING_DAYS_PER_YEAR.sqrt();
                (
                    Statistic::from_value(annual_vol * 100.0),
                    Statistic::from_value(mean * TRADING_DAYS_PER_YEAR / annual_vol),
                )
            }
            _ => (
                Statistic::Undefined(UndefinedReason::InsufficientData),
                Statistic::Undefined(UndefinedReason::InsufficientData),
            ),
        };

        Self {
            window_return_percent,
            annualized_return_percent,
            volatility_percent,
            sharpe_ratio,
            observations,
        }
    }
}

/// Product of (1 + r) over the series, minus one. `None` for an empty series.
pub fn compounded_return(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    Some(returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0)
}

/// Arithmetic mean. `None` for an empty series.
pub fn mean(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    Some(returns.iter().sum::<f64>() / returns.len() as f64)
}

/// Sample standard deviation (n − 1 denominator). `None` below two observations.
pub fn sample_std(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }

    let mean = mean(returns)?;
    let n = returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Some(variance.sqrt())
}

/// Annualize a percent return earned over `periods` periods.
pub fn annualize_return(return_pct: f64, periods: usize, periods_per_year: f64) -> Statistic {
    if periods == 0 {
        return Statistic::Undefined(UndefinedReason::InsufficientData);
    }

    let years = periods as f64 / periods_per_year;
    let growth = 1.0 + (return_pct / 100.0);
    if growth < 0.0 {
        return Statistic::Undefined(UndefinedReason::NonFinite);
    }

    Statistic::from_value((growth.powf(1.0 / years) - 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compounding_law() {
        let returns = [0.01, -0.02, 0.03];
        let expected = 1.01 * 0.98 * 1.03 - 1.0;

        assert_relative_eq!(compounded_return(&returns).unwrap(), expected);

        let stats = RiskReturn::from_returns(&returns);
        assert_relative_eq!(
            stats.window_return_percent.value().unwrap(),
            1.9494,
            epsilon = 1e-9
        );
        assert_eq!(stats.observations, 3);
    }

    #[test]
    fn test_sample_std() {
        // mean 0.5, squared deviations 0.25 + 0.25, / (2 - 1)
        assert_relative_eq!(sample_std(&[0.0, 1.0]).unwrap(), 0.5_f64.sqrt());
        assert_eq!(sample_std(&[0.3]), None);
    }

    #[test]
    fn test_volatility_and_sharpe() {
        let returns = [0.01, -0.005, 0.008, -0.003, 0.012, -0.007];
        let stats = RiskReturn::from_returns(&returns);

        let std = sample_std(&returns).unwrap();
        let mean = mean(&returns).unwrap();
        let expected_vol = std * 252.0_f64.sqrt();

        assert_relative_eq!(
            stats.volatility_percent.value().unwrap(),
            expected_vol * 100.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            stats.sharpe_ratio.value().unwrap(),
            mean * 252.0 / expected_vol,
            epsilon = 1e-9
        );
        assert!(stats.sharpe_ratio.value().unwrap() > 0.0);
    }

    #[test]
    fn test_zero_variance_sharpe_undefined() {
        let stats = RiskReturn::from_returns(&[0.0, 0.0, 0.0]);

        assert_eq!(stats.volatility_percent, Statistic::Defined(0.0));
        assert_eq!(
            stats.sharpe_ratio,
            Statistic::Undefined(UndefinedReason::ZeroVolatility)
        );
        assert_eq!(stats.window_return_percent, Statistic::Defined(0.0));
    }

    #[test]
    fn test_constant_positive_returns_sharpe_undefined() {
        let stats = RiskReturn::from_returns(&[0.001; 20]);

        assert_eq!(
            stats.sharpe_ratio.reason(),
            Some(UndefinedReason::ZeroVolatility)
        );
        assert!(stats.window_return_percent.value().unwrap() > 0.0);
    }

    #[test]
    fn test_empty_series_insufficient_data() {
        let stats = RiskReturn::from_returns(&[]);
        let insufficient = Statistic::Undefined(UndefinedReason::InsufficientData);

        assert_eq!(stats.window_return_percent, insufficient);
        assert_eq!(stats.annualized_return_percent, insufficient);
        assert_eq!(stats.volatility_percent, insufficient);
        assert_eq!(stats.sharpe_ratio, insufficient);
        assert_eq!(stats.observations, 0);
    }

    #[test]
    fn test_single_return_has_no_volatility() {
        let stats = RiskReturn::from_returns(&[0.02]);

        assert_relative_eq!(stats.window_return_percent.value().unwrap(), 2.0, epsilon = 1e-9);
        assert!(stats.annualized_return_percent.is_defined());
        assert_eq!(
            stats.volatility_percent.reason(),
            Some(UndefinedReason::InsufficientData)
        );
        assert_eq!(
            stats.sharpe_ratio.reason(),
            Some(UndefinedReason::InsufficientData)
        );
    }

    #[test]
    fn test_annualize_return() {
        // 10% over half a year compounds to 21%
        let annualized = annualize_return(10.0, 126, 252.0);
        assert_relative_eq!(annualized.value().unwrap(), 21.0, epsilon = 1e-9);

        // A full year is unchanged
        let full_year = annualize_return(7.5, 252, 252.0);
        assert_relative_eq!(full_year.value().unwrap(), 7.5, epsilon = 1e-9);

        assert_eq!(
            annualize_return(5.0, 0, 252.0),
            Statistic::Undefined(UndefinedReason::InsufficientData)
        );
    }
}
