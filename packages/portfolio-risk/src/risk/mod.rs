//! Risk analytics for a single return series.
//!
//! Provides full-series risk statistics, VaR estimation, rolling-window
//! metrics, and comparison against a benchmark.

mod benchmark;
mod calculator;
mod performance;
mod rolling;
mod var;

pub use benchmark::{BenchmarkComparator, BenchmarkComparison, RelativePerformance};
pub use calculator::{
    annualized_mean, calmar_ratio, capm_alpha, downside_deviation, information_ratio,
    sharpe_ratio, sortino_ratio, volatility, RiskCalculator,
};
pub use performance::{annualize_return, DrawdownAnalysis};
pub use rolling::RollingMetricsEngine;
pub use var::{VarBacktest, VarEngine, VarMetrics};
