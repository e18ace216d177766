//! Sliding-window risk metrics.
//!
//! Each output point is the metric over the `window` observations ending at
//! that date. Partial windows are never emitted, so a series shorter than
//! the window yields an empty result.

use super::calculator::{capm_alpha, sharpe_ratio, sortino_ratio, volatility};
use crate::config::AnalyticsConfig;
use crate::series::ReturnSeries;
use crate::stats;
use crate::types::{MetricPoint, RollingMetric, RollingMetricSeries, RollingMetricsSummary};
use crate::{Error, Result};
use chrono::NaiveDate;

/// Computes rolling metrics over a return series and optional benchmark.
#[derive(Debug, Clone)]
pub struct RollingMetricsEngine {
    returns: ReturnSeries,
    benchmark: Option<ReturnSeries>,
    window: usize,
    risk_free_rate: f64,
    factor: f64,
}

/// Apply `f` to every full window of `values`, dating each result at the window end.
fn roll<F>(dates: &[NaiveDate], values: &[f64], window: usize, f: F) -> Vec<MetricPoint>
where
    F: Fn(&[f64]) -> f64,
{
    if values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .zip(&dates[window - 1..])
        .map(|(slice, &date)| MetricPoint {
            date,
            value: f(slice),
        })
        .collect()
}

/// Paired variant of [`roll`] for two aligned value vectors.
fn roll_pair<F>(
    dates: &[NaiveDate],
    left: &[f64],
    right: &[f64],
    window: usize,
    f: F,
) -> Vec<MetricPoint>
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    if left.len() < window {
        return Vec::new();
    }
    (window - 1..left.len())
        .map(|end| {
            let start = end + 1 - window;
            MetricPoint {
                date: dates[end],
                value: f(&left[start..=end], &right[start..=end]),
            }
        })
        .collect()
}

impl RollingMetricsEngine {
    /// Create an engine with the given window length (at least 2).
    pub fn new(returns: ReturnSeries, window: usize, config: &AnalyticsConfig) -> Result<Self> {
        if window < 2 {
            return Err(Error::Validation(format!(
                "Rolling window must be at least 2, got {}",
                window
            )));
        }
        if returns.len() < window {
            tracing::warn!(
                observations = returns.len(),
                window,
                "Series shorter than rolling window; rolling metrics will be empty"
            );
        }

        Ok(Self {
            returns,
            benchmark: None,
            window,
            risk_free_rate: config.risk_free_rate,
            factor: config.factor(),
        })
    }

    /// Attach a benchmark for rolling beta, alpha and correlation.
    pub fn with_benchmark(mut self, benchmark: ReturnSeries) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    /// Window length in periods.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Fails with `InsufficientData` when no full window exists.
    pub fn require_full_window(&self) -> Result<()> {
        if self.returns.len() < self.window {
            return Err(Error::InsufficientData(format!(
                "Rolling window of {} exceeds {} observations",
                self.window,
                self.returns.len()
            )));
        }
        Ok(())
    }

    fn single<F>(&self, metric: RollingMetric, f: F) -> RollingMetricSeries
    where
        F: Fn(&[f64]) -> f64,
    {
        RollingMetricSeries {
            metric,
            window: self.window,
            points: roll(self.returns.dates(), self.returns.values(), self.window, f),
        }
    }

    fn paired<F>(&self, metric: RollingMetric, f: F) -> Option<RollingMetricSeries>
    where
        F: Fn(&[f64], &[f64]) -> f64,
    {
        let benchmark = self.benchmark.as_ref()?;
        let (dates, r, b) = self.returns.align(benchmark);
        Some(RollingMetricSeries {
            metric,
            window: self.window,
            points: roll_pair(&dates, &r, &b, self.window, f),
        })
    }

    pub fn rolling_sharpe(&self) -> RollingMetricSeries {
        let (rf, factor) = (self.risk_free_rate, self.factor);
        self.single(RollingMetric::Sharpe, |w| sharpe_ratio(w, rf, factor))
    }

    pub fn rolling_sortino(&self) -> RollingMetricSeries {
        let (rf, factor) = (self.risk_free_rate, self.factor);
        self.single(RollingMetric::Sortino, |w| sortino_ratio(w, rf, factor))
    }

    pub fn rolling_volatility(&self) -> RollingMetricSeries {
        let factor = self.factor;
        self.single(RollingMetric::Volatility, |w| volatility(w, factor))
    }

    /// Max drawdown within each window, measured from the window's own start.
    pub fn rolling_max_drawdown(&self) -> RollingMetricSeries {
        self.single(RollingMetric::MaxDrawdown, stats::max_drawdown)
    }

    /// Historical VaR quantile of each window.
    pub fn rolling_var(&self, confidence: f64) -> Result<RollingMetricSeries> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(Error::Validation(format!(
                "VaR confidence must be in (0, 1), got {}",
                confidence
            )));
        }
        Ok(self.single(RollingMetric::Var, |w| stats::quantile(w, confidence)))
    }

    /// Rolling beta over dates shared with the benchmark. `None` without a benchmark.
    pub fn rolling_beta(&self) -> Option<RollingMetricSeries> {
        self.paired(RollingMetric::Beta, stats::beta)
    }

    /// Rolling CAPM alpha over dates shared with the benchmark.
    pub fn rolling_alpha(&self) -> Option<RollingMetricSeries> {
        let (rf, factor) = (self.risk_free_rate, self.factor);
        self.paired(RollingMetric::Alpha, |r, b| capm_alpha(r, b, rf, factor))
    }

    /// Rolling Pearson correlation with the benchmark.
    pub fn rolling_correlation(&self) -> Option<RollingMetricSeries> {
        self.paired(RollingMetric::Correlation, stats::pearson)
    }

    /// Named rolling value vectors for the comprehensive bundle.
    pub fn summary(&self, var_confidence: f64) -> Result<RollingMetricsSummary> {
        Ok(RollingMetricsSummary {
            rolling_sharpe: self.rolling_sharpe().values(),
            rolling_volatility: self.rolling_volatility().values(),
            rolling_max_drawdown: self.rolling_max_drawdown().values(),
            rolling_var: self.rolling_var(var_confidence)?.values(),
            rolling_beta: self.rolling_beta().map(|s| s.values()),
            rolling_alpha: self.rolling_alpha().map(|s| s.values()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn engine(values: &[f64], window: usize) -> RollingMetricsEngine {
        let series = ReturnSeries::from_values(start(), values).unwrap();
        RollingMetricsEngine::new(series, window, &AnalyticsConfig::default()).unwrap()
    }

    #[test]
    fn test_rolling_sharpe_trailing_windows() {
        let values = [0.01, -0.02, 0.015, 0.005, -0.01];
        let rolling = engine(&values, 3).rolling_sharpe();

        assert_eq!(rolling.len(), 3);
        assert_eq!(rolling.window, 3);
        for (i, point) in rolling.points.iter().enumerate() {
            let expected = sharpe_ratio(&values[i..i + 3], 0.02, 252.0);
            assert_relative_eq!(point.value, expected, max_relative = 1e-12);
            assert_eq!(point.date, start() + Duration::days(i as i64 + 2));
        }
    }

    #[test]
    fn test_rolling_sortino_trailing_windows() {
        let values = [0.01, -0.02, 0.015, -0.005, -0.01, 0.02, -0.03];
        let rolling = engine(&values, 4).rolling_sortino();

        assert_eq!(rolling.len(), 4);
        assert_eq!(rolling.metric, RollingMetric::Sortino);
        for (i, point) in rolling.points.iter().enumerate() {
            let expected = sortino_ratio(&values[i..i + 4], 0.02, 252.0);
            assert_relative_eq!(point.value, expected, max_relative = 1e-12);
            assert_eq!(point.date, start() + Duration::days(i as i64 + 3));
        }
    }

    #[test]
    fn test_rolling_alpha_on_aligned_dates() {
        let portfolio_values = [0.012, -0.018, 0.02, 0.004, -0.007, 0.025, 0.001];
        let benchmark_values = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02, -0.004];
        let portfolio = ReturnSeries::from_values(start(), &portfolio_values).unwrap();
        // Benchmark starts one day later, so six dates are shared
        let benchmark =
            ReturnSeries::from_values(start() + Duration::days(1), &benchmark_values[1..]).unwrap();

        let e = RollingMetricsEngine::new(portfolio, 3, &AnalyticsConfig::default())
            .unwrap()
            .with_benchmark(benchmark);
        let alpha = e.rolling_alpha().unwrap();

        let r = &portfolio_values[1..];
        let b = &benchmark_values[1..];
        assert_eq!(alpha.len(), 4);
        for (i, point) in alpha.points.iter().enumerate() {
            let expected = capm_alpha(&r[i..i + 3], &b[i..i + 3], 0.02, 252.0);
            assert_relative_eq!(point.value, expected, max_relative = 1e-12);
            assert_eq!(point.date, start() + Duration::days(i as i64 + 3));
        }

        let summary = e.summary(0.05).unwrap();
        assert_eq!(summary.rolling_alpha, Some(alpha.values()));
    }

    #[test]
    fn test_window_longer_than_series() {
        let e = engine(&[0.01, 0.02], 5);
        assert!(e.rolling_volatility().is_empty());
        assert!(e.rolling_var(0.05).unwrap().is_empty());
        assert!(matches!(
            e.require_full_window(),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_window_validation() {
        let series = ReturnSeries::from_values(start(), &[0.01, 0.02, 0.03]).unwrap();
        let result = RollingMetricsEngine::new(series, 1, &AnalyticsConfig::default());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_rolling_max_drawdown_per_window() {
        let values = [0.10, -0.10, 0.05, 0.05];
        let rolling = engine(&values, 2).rolling_max_drawdown();
        let got = rolling.values();

        assert_eq!(got.len(), 3);
        assert_relative_eq!(got[0], -0.10, max_relative = 1e-12);
        // Peak is the first wealth point inside the window
        assert_eq!(got[1], 0.0);
        assert_eq!(got[2], 0.0);
    }

    #[test]
    fn test_rolling_var_quantile() {
        let values = [0.01, -0.03, 0.02, -0.01, 0.00];
        let rolling = engine(&values, 4).rolling_var(0.05).unwrap();
        let got = rolling.values();
        assert_eq!(got.len(), 2);
        assert_relative_eq!(got[0], stats::quantile(&values[0..4], 0.05));
        assert_relative_eq!(got[1], stats::quantile(&values[1..5], 0.05));
    }

    #[test]
    fn test_benchmark_metrics_require_benchmark() {
        let e = engine(&[0.01, -0.02, 0.015, 0.005], 2);
        assert!(e.rolling_beta().is_none());
        assert!(e.rolling_alpha().is_none());
        assert!(e.rolling_correlation().is_none());

        let summary = e.summary(0.05).unwrap();
        assert!(summary.rolling_beta.is_none());
        assert_eq!(summary.rolling_sharpe.len(), 3);
    }

    #[test]
    fn test_rolling_beta_on_aligned_dates() {
        let benchmark_values = [0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let portfolio_values: Vec<f64> = benchmark_values.iter().map(|b| 1.5 * b).collect();
        let portfolio = ReturnSeries::from_values(start(), &portfolio_values).unwrap();
        // Benchmark lags by one day, so five dates are shared
        let benchmark =
            ReturnSeries::from_values(start() + Duration::days(1), &benchmark_values[1..]).unwrap();

        let e = RollingMetricsEngine::new(portfolio, 3, &AnalyticsConfig::default())
            .unwrap()
            .with_benchmark(benchmark);
        let beta = e.rolling_beta().unwrap();

        assert_eq!(beta.len(), 3);
        for value in beta.values() {
            assert_relative_eq!(value, 1.5, max_relative = 1e-9);
        }
        for value in e.rolling_correlation().unwrap().values() {
            assert_relative_eq!(value, 1.0, max_relative = 1e-9);
        }
    }
}
