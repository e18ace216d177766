//! Portfolio versus benchmark comparison.

use super::calculator::{annualized_mean, capm_alpha, information_ratio, volatility};
use crate::config::AnalyticsConfig;
use crate::series::ReturnSeries;
use crate::stats;
use crate::types::nullable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Distribution of the per-period excess returns (portfolio minus benchmark).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RelativePerformance {
    /// Sum of excess returns
    #[serde(deserialize_with = "nullable::number")]
    pub total_excess_return: f64,
    /// Mean excess return × factor
    #[serde(deserialize_with = "nullable::number")]
    pub annualized_excess_return: f64,
    /// Sample std of excess returns × sqrt(factor)
    #[serde(deserialize_with = "nullable::number")]
    pub excess_volatility: f64,
    /// Fraction of periods with positive excess return
    #[serde(deserialize_with = "nullable::number")]
    pub win_rate: f64,
    /// Mean positive excess return (NaN if none)
    #[serde(deserialize_with = "nullable::number")]
    pub average_win: f64,
    /// Mean negative excess return (NaN if none)
    #[serde(deserialize_with = "nullable::number")]
    pub average_loss: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub best_relative_period: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub worst_relative_period: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub up_capture_ratio: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub down_capture_ratio: f64,
    /// annualized_excess_return / excess_volatility (NaN when volatility is 0)
    #[serde(deserialize_with = "nullable::number")]
    pub information_ratio: f64,
}

/// Named comparison figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkComparison {
    #[serde(deserialize_with = "nullable::number")]
    pub tracking_error: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub information_ratio: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub beta: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub alpha: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub up_capture: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub down_capture: f64,
    /// Total return of the portfolio minus that of the benchmark
    #[serde(deserialize_with = "nullable::number")]
    pub relative_return: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub r_squared: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub treynor_ratio: f64,
    /// Shared observations the figures were computed over
    pub aligned_periods: usize,
}

/// Compares a portfolio to a benchmark over their shared dates.
#[derive(Debug, Clone)]
pub struct BenchmarkComparator {
    dates: Vec<NaiveDate>,
    portfolio: Vec<f64>,
    benchmark: Vec<f64>,
    risk_free_rate: f64,
    factor: f64,
}

/// mean(p | mask) / mean(b | mask), 0.0 for an empty subset or zero benchmark mean.
fn capture_ratio<F>(portfolio: &[f64], benchmark: &[f64], mask: F) -> f64
where
    F: Fn(f64) -> bool,
{
    let (p, b): (Vec<f64>, Vec<f64>) = portfolio
        .iter()
        .zip(benchmark)
        .filter(|(_, &b)| mask(b))
        .map(|(&p, &b)| (p, b))
        .unzip();

    if p.is_empty() {
        return 0.0;
    }
    let benchmark_mean = stats::mean(&b);
    if benchmark_mean == 0.0 {
        return 0.0;
    }
    stats::mean(&p) / benchmark_mean
}

impl BenchmarkComparator {
    /// Align `portfolio` and `benchmark` on shared dates.
    pub fn new(portfolio: &ReturnSeries, benchmark: &ReturnSeries, config: &AnalyticsConfig) -> Self {
        let (dates, portfolio, benchmark) = portfolio.align(benchmark);
        if dates.is_empty() {
            tracing::warn!("Portfolio and benchmark share no dates");
        } else {
            tracing::debug!(aligned = dates.len(), "Benchmark comparator initialized");
        }

        Self {
            dates,
            portfolio,
            benchmark,
            risk_free_rate: config.risk_free_rate,
            factor: config.factor(),
        }
    }

    /// Shared dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of shared observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when the two series share no dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    fn excess(&self) -> Vec<f64> {
        self.portfolio
            .iter()
            .zip(&self.benchmark)
            .map(|(p, b)| p - b)
            .collect()
    }

    /// Annualized std of the excess returns.
    pub fn tracking_error(&self) -> f64 {
        volatility(&self.excess(), self.factor)
    }

    pub fn information_ratio(&self) -> f64 {
        information_ratio(&self.portfolio, &self.benchmark, self.factor)
    }

    pub fn beta(&self) -> f64 {
        stats::beta(&self.portfolio, &self.benchmark)
    }

    pub fn alpha(&self) -> f64 {
        capm_alpha(
            &self.portfolio,
            &self.benchmark,
            self.risk_free_rate,
            self.factor,
        )
    }

    /// Pearson correlation.
    pub fn correlation(&self) -> f64 {
        stats::pearson(&self.portfolio, &self.benchmark)
    }

    /// Squared correlation.
    pub fn r_squared(&self) -> f64 {
        self.correlation().powi(2)
    }

    pub fn up_capture_ratio(&self) -> f64 {
        capture_ratio(&self.portfolio, &self.benchmark, |b| b > 0.0)
    }

    pub fn down_capture_ratio(&self) -> f64 {
        capture_ratio(&self.portfolio, &self.benchmark, |b| b < 0.0)
    }

    /// Portfolio total return minus benchmark total return.
    pub fn relative_performance(&self) -> f64 {
        stats::total_return(&self.portfolio) - stats::total_return(&self.benchmark)
    }

    /// Annualized mean return per unit of beta. `NaN` when beta is 0 or undefined.
    pub fn treynor_ratio(&self) -> f64 {
        let beta = self.beta();
        if beta == 0.0 || beta.is_nan() {
            return f64::NAN;
        }
        annualized_mean(&self.portfolio, self.factor) / beta
    }

    /// Excess-return distribution. `None` when no dates are shared.
    pub fn relative_performance_analysis(&self) -> Option<RelativePerformance> {
        if self.is_empty() {
            return None;
        }

        let excess = self.excess();
        let wins: Vec<f64> = excess.iter().copied().filter(|&e| e > 0.0).collect();
        let losses: Vec<f64> = excess.iter().copied().filter(|&e| e < 0.0).collect();

        let annualized_excess_return = annualized_mean(&excess, self.factor);
        let excess_volatility = volatility(&excess, self.factor);
        let information_ratio = if excess_volatility > 0.0 {
            annualized_excess_return / excess_volatility
        } else {
            f64::NAN
        };

        Some(RelativePerformance {
            total_excess_return: excess.iter().sum(),
            annualized_excess_return,
            excess_volatility,
            win_rate: wins.len() as f64 / excess.len() as f64,
            average_win: stats::mean(&wins),
            average_loss: stats::mean(&losses),
            best_relative_period: excess.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_relative_period: excess.iter().copied().fold(f64::INFINITY, f64::min),
            up_capture_ratio: self.up_capture_ratio(),
            down_capture_ratio: self.down_capture_ratio(),
            information_ratio,
        })
    }

    /// All comparison figures in one struct.
    pub fn compare(&self) -> BenchmarkComparison {
        BenchmarkComparison {
            tracking_error: self.tracking_error(),
            information_ratio: self.information_ratio(),
            beta: self.beta(),
            alpha: self.alpha(),
            correlation: self.correlation(),
            up_capture: self.up_capture_ratio(),
            down_capture: self.down_capture_ratio(),
            relative_return: self.relative_performance(),
            r_squared: self.r_squared(),
            treynor_ratio: self.treynor_ratio(),
            aligned_periods: self.len(),
        }
    }
}
