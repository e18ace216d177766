//! Full-series risk and return statistics.
//!
//! Provides Sharpe, Sortino and Calmar ratios, volatility, drawdown,
//! higher moments, and CAPM beta/alpha against an optional benchmark.
//!
//! Ratios use the simple annualized mean (mean × factor) in the numerator;
//! [`RiskCalculator::annualized_return`] is the compounded figure.
//! Degenerate inputs never error: zero dispersion yields 0.0 for ratios
//! and `NaN` for quantities that are undefined.

use super::performance::{annualize_return, DrawdownAnalysis};
use crate::config::AnalyticsConfig;
use crate::series::ReturnSeries;
use crate::stats;
use crate::types::{PerformanceMetrics, RiskMetricsBundle};

/// Annualized mean return (mean × factor).
pub fn annualized_mean(returns: &[f64], factor: f64) -> f64 {
    stats::mean(returns) * factor
}

/// Annualized volatility (sample std × sqrt(factor)).
pub fn volatility(returns: &[f64], factor: f64) -> f64 {
    stats::std_dev(returns) * factor.sqrt()
}

/// Annualized Sharpe ratio. 0.0 when volatility is zero or undefined.
///
/// # Arguments
///
/// * `returns` - Periodic returns
/// * `risk_free_rate` - Annual risk-free rate
/// * `factor` - Periods per year
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, factor: f64) -> f64 {
    let vol = volatility(returns, factor);
    if !(vol > 0.0) {
        return 0.0;
    }
    (annualized_mean(returns, factor) - risk_free_rate) / vol
}

/// Annualized deviation of the returns that fall below the per-period risk-free rate.
///
/// 0.0 when fewer than two returns fall below the threshold.
pub fn downside_deviation(returns: &[f64], risk_free_rate: f64, factor: f64) -> f64 {
    let threshold = risk_free_rate / factor;
    let below: Vec<f64> = returns.iter().copied().filter(|&r| r < threshold).collect();
    if below.len() < 2 {
        return 0.0;
    }
    stats::std_dev(&below) * factor.sqrt()
}

/// Annualized Sortino ratio. 0.0 when downside deviation is zero.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, factor: f64) -> f64 {
    let downside = downside_deviation(returns, risk_free_rate, factor);
    if !(downside > 0.0) {
        return 0.0;
    }
    (annualized_mean(returns, factor) - risk_free_rate) / downside
}

/// Calmar ratio: annualized mean / |max drawdown|. `NaN` when there was no drawdown.
pub fn calmar_ratio(returns: &[f64], factor: f64) -> f64 {
    let mdd = stats::max_drawdown(returns);
    if mdd == 0.0 {
        return f64::NAN;
    }
    annualized_mean(returns, factor) / mdd.abs()
}

/// CAPM alpha of aligned `returns` over `benchmark`.
///
/// alpha = mean(R)·f − (rf + β·(mean(B)·f − rf)); `NaN` when beta is undefined.
pub fn capm_alpha(returns: &[f64], benchmark: &[f64], risk_free_rate: f64, factor: f64) -> f64 {
    let beta = stats::beta(returns, benchmark);
    if beta.is_nan() {
        return f64::NAN;
    }
    annualized_mean(returns, factor)
        - (risk_free_rate + beta * (annualized_mean(benchmark, factor) - risk_free_rate))
}

/// Annualized information ratio of aligned `returns` over `benchmark`.
///
/// 0.0 when the excess returns have zero or undefined dispersion.
pub fn information_ratio(returns: &[f64], benchmark: &[f64], factor: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().zip(benchmark).map(|(r, b)| r - b).collect();
    let sd = stats::std_dev(&excess);
    if !(sd > 0.0) {
        return 0.0;
    }
    stats::mean(&excess) / sd * factor.sqrt()
}

/// Risk statistics over one return series and an optional benchmark.
#[derive(Debug, Clone)]
pub struct RiskCalculator {
    returns: ReturnSeries,
    benchmark: Option<ReturnSeries>,
    risk_free_rate: f64,
    factor: f64,
}

impl RiskCalculator {
    /// Create a calculator using the config's risk-free rate and annualization factor.
    pub fn new(returns: ReturnSeries, config: &AnalyticsConfig) -> Self {
        tracing::debug!(observations = returns.len(), "Risk calculator initialized");
        Self {
            returns,
            benchmark: None,
            risk_free_rate: config.risk_free_rate,
            factor: config.factor(),
        }
    }

    /// Attach a benchmark for beta, alpha and information ratio.
    pub fn with_benchmark(mut self, benchmark: ReturnSeries) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    /// The analyzed series.
    pub fn returns(&self) -> &ReturnSeries {
        &self.returns
    }

    /// The benchmark, if any.
    pub fn benchmark(&self) -> Option<&ReturnSeries> {
        self.benchmark.as_ref()
    }

    /// Simple annualized mean return.
    pub fn annualized_mean(&self) -> f64 {
        annualized_mean(self.returns.values(), self.factor)
    }

    /// Annualized volatility.
    pub fn volatility(&self) -> f64 {
        volatility(self.returns.values(), self.factor)
    }

    /// Annualized Sharpe ratio.
    pub fn sharpe_ratio(&self) -> f64 {
        sharpe_ratio(self.returns.values(), self.risk_free_rate, self.factor)
    }

    /// Maximum drawdown (<= 0).
    pub fn max_drawdown(&self) -> f64 {
        stats::max_drawdown(self.returns.values())
    }

    /// Calmar ratio (`NaN` without a drawdown).
    pub fn calmar_ratio(&self) -> f64 {
        calmar_ratio(self.returns.values(), self.factor)
    }

    /// Annualized downside deviation below the per-period risk-free rate.
    pub fn downside_deviation(&self) -> f64 {
        downside_deviation(self.returns.values(), self.risk_free_rate, self.factor)
    }

    /// Annualized Sortino ratio.
    pub fn sortino_ratio(&self) -> f64 {
        sortino_ratio(self.returns.values(), self.risk_free_rate, self.factor)
    }

    /// Beta against the benchmark on shared dates. `None` without a benchmark.
    pub fn beta(&self) -> Option<f64> {
        let benchmark = self.benchmark.as_ref()?;
        let (_, r, b) = self.returns.align(benchmark);
        Some(stats::beta(&r, &b))
    }

    /// CAPM alpha against the benchmark on shared dates. `None` without a benchmark.
    pub fn alpha(&self) -> Option<f64> {
        let benchmark = self.benchmark.as_ref()?;
        let (_, r, b) = self.returns.align(benchmark);
        Some(capm_alpha(&r, &b, self.risk_free_rate, self.factor))
    }

    /// Information ratio against the benchmark on shared dates. `None` without a benchmark.
    pub fn information_ratio(&self) -> Option<f64> {
        let benchmark = self.benchmark.as_ref()?;
        let (_, r, b) = self.returns.align(benchmark);
        Some(information_ratio(&r, &b, self.factor))
    }

    /// Population skewness.
    pub fn skewness(&self) -> f64 {
        stats::skewness(self.returns.values())
    }

    /// Excess kurtosis.
    pub fn kurtosis(&self) -> f64 {
        stats::kurtosis(self.returns.values())
    }

    /// Compounded total return.
    pub fn total_return(&self) -> f64 {
        stats::total_return(self.returns.values())
    }

    /// Compounded annualized return: (1 + total)^(factor / n) - 1.
    pub fn annualized_return(&self) -> f64 {
        annualize_return(self.total_return(), self.returns.len(), self.factor)
    }

    /// Number of periods with a positive return.
    pub fn positive_periods(&self) -> usize {
        self.returns.values().iter().filter(|&&r| r > 0.0).count()
    }

    /// Number of periods with a negative return.
    pub fn negative_periods(&self) -> usize {
        self.returns.values().iter().filter(|&&r| r < 0.0).count()
    }

    /// Peak, trough and recovery details of the deepest drawdown.
    pub fn drawdown_analysis(&self) -> DrawdownAnalysis {
        DrawdownAnalysis::from_returns(self.returns.dates(), self.returns.values())
    }

    /// Return-side figures in one struct.
    pub fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            total_return: self.total_return(),
            annualized_return: self.annualized_return(),
            annualized_volatility: self.volatility(),
            skewness: self.skewness(),
            kurtosis: self.kurtosis(),
            positive_periods: self.positive_periods(),
            negative_periods: self.negative_periods(),
        }
    }

    /// Headline metrics; VaR figures come from the VaR engine.
    pub fn metrics_bundle(&self, var_95: f64, cvar_95: f64) -> RiskMetricsBundle {
        RiskMetricsBundle {
            sharpe_ratio: self.sharpe_ratio(),
            beta: self.beta(),
            volatility: self.volatility(),
            max_drawdown: self.max_drawdown(),
            var_95,
            cvar_95,
            calmar_ratio: self.calmar_ratio(),
            sortino_ratio: self.sortino_ratio(),
            information_ratio: self.information_ratio(),
            alpha: self.alpha(),
        }
    }
}
