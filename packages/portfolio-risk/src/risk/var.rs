//! Value at Risk estimators.
//!
//! VaR is reported as a return quantile: a negative number is a loss
//! threshold. `confidence` is the tail probability, so 0.05 is 95% VaR.

use crate::series::ReturnSeries;
use crate::stats;
use crate::types::nullable;
use crate::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Outcome of walking a historical VaR forecast through the series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VarBacktest {
    /// violations / total_forecasts
    #[serde(deserialize_with = "nullable::number")]
    pub violation_rate: f64,
    /// The tail probability the model was built for
    #[serde(deserialize_with = "nullable::number")]
    pub expected_rate: f64,
    /// Periods where the realized return was at or below the forecast
    pub violations: usize,
    /// Number of forecasts made
    pub total_forecasts: usize,
}

/// VaR figures at the standard 95% and 99% levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VarMetrics {
    #[serde(deserialize_with = "nullable::number")]
    pub historical_var_95: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub historical_var_99: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub parametric_var_95: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub parametric_var_99: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub monte_carlo_var_95: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub cvar_95: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub cvar_99: f64,
}

/// Tail-risk estimates for one return series.
#[derive(Debug, Clone)]
pub struct VarEngine {
    returns: Vec<f64>,
}

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence > 0.0 && confidence < 1.0 {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "VaR confidence must be in (0, 1), got {}",
            confidence
        )))
    }
}

impl VarEngine {
    /// Create an engine over the series' returns.
    pub fn new(series: &ReturnSeries) -> Self {
        Self::from_returns(series.values().to_vec())
    }

    /// Create an engine over raw returns.
    pub fn from_returns(returns: Vec<f64>) -> Self {
        tracing::debug!(observations = returns.len(), "VaR engine initialized");
        Self { returns }
    }

    /// Historical VaR: the `confidence` quantile of the observed returns.
    pub fn historical_var(&self, confidence: f64) -> Result<f64> {
        check_confidence(confidence)?;
        Ok(stats::quantile(&self.returns, confidence))
    }

    /// Parametric (normal) VaR: mean + z(confidence) × std.
    pub fn parametric_var(&self, confidence: f64) -> Result<f64> {
        check_confidence(confidence)?;
        let z = stats::norm_ppf(confidence);
        Ok(stats::mean(&self.returns) + z * stats::std_dev(&self.returns))
    }

    /// Monte Carlo VaR from `n_simulations` draws of a fitted normal.
    ///
    /// Deterministic for a seeded `rng`. `NaN` when the series has no
    /// defined standard deviation.
    pub fn monte_carlo_var<R: Rng + ?Sized>(
        &self,
        confidence: f64,
        n_simulations: usize,
        rng: &mut R,
    ) -> Result<f64> {
        check_confidence(confidence)?;
        if n_simulations == 0 {
            return Err(Error::Validation(
                "n_simulations must be positive".to_string(),
            ));
        }

        let mean = stats::mean(&self.returns);
        let std = stats::std_dev(&self.returns);
        let Ok(normal) = Normal::new(mean, std) else {
            return Ok(f64::NAN);
        };

        let mut simulated: Vec<f64> = (0..n_simulations).map(|_| normal.sample(rng)).collect();
        simulated.sort_by(f64::total_cmp);
        Ok(stats::quantile_sorted(&simulated, confidence))
    }

    /// Expected shortfall: mean of the returns at or below historical VaR.
    pub fn conditional_var(&self, confidence: f64) -> Result<f64> {
        let threshold = self.historical_var(confidence)?;
        let tail: Vec<f64> = self
            .returns
            .iter()
            .copied()
            .filter(|&r| r <= threshold)
            .collect();
        Ok(stats::mean(&tail))
    }

    /// Backtest historical VaR with a trailing window of `window` periods.
    ///
    /// Each forecast uses the window ending just before the period it predicts.
    pub fn var_backtesting(&self, confidence: f64, window: usize) -> Result<VarBacktest> {
        check_confidence(confidence)?;
        if window == 0 {
            return Err(Error::Validation(
                "Backtest window must be positive".to_string(),
            ));
        }
        if self.returns.len() <= window {
            return Err(Error::InsufficientData(format!(
                "VaR backtesting needs more than {} observations, got {}",
                window,
                self.returns.len()
            )));
        }

        let mut violations = 0;
        let mut total_forecasts = 0;
        for i in window..self.returns.len() {
            let forecast = stats::quantile(&self.returns[i - window..i], confidence);
            if self.returns[i] <= forecast {
                violations += 1;
            }
            total_forecasts += 1;
        }

        Ok(VarBacktest {
            violation_rate: violations as f64 / total_forecasts as f64,
            expected_rate: confidence,
            violations,
            total_forecasts,
        })
    }

    /// The standard VaR set at 95% and 99%.
    pub fn var_metrics<R: Rng + ?Sized>(
        &self,
        n_simulations: usize,
        rng: &mut R,
    ) -> Result<VarMetrics> {
        Ok(VarMetrics {
            historical_var_95: self.historical_var(0.05)?,
            historical_var_99: self.historical_var(0.01)?,
            parametric_var_95: self.parametric_var(0.05)?,
            parametric_var_99: self.parametric_var(0.01)?,
            monte_carlo_var_95: self.monte_carlo_var(0.05, n_simulations, rng)?,
            cvar_95: self.conditional_var(0.05)?,
            cvar_99: self.conditional_var(0.01)?,
        })
    }
}
