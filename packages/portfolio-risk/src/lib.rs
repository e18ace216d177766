//! Portfolio Risk - risk/return analytics for portfolio return series.
//!
//! This crate computes the analytics behind portfolio risk dashboards:
//!
//! - **Return series**: validated, date-indexed periodic returns with inner-join alignment
//! - **Risk metrics**: Sharpe, Sortino, Calmar, volatility, drawdowns, skew/kurtosis, beta/alpha
//! - **Value at Risk**: historical, parametric, Monte Carlo, conditional VaR and backtesting
//! - **Rolling metrics**: sliding-window variants of the above
//! - **Benchmark comparison**: tracking error, information ratio, capture ratios
//! - **Correlation analysis**: matrices, pair detection, diversification ratio, clustering
//! - **Risk reports**: a comprehensive bundle with a risk-level verdict and recommendations
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use portfolio_risk::{AnalyticsConfig, ReturnSeries, RiskCalculator};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = ReturnSeries::from_values(start, &[0.01, -0.02, 0.015, 0.005, -0.01]).unwrap();
//!
//! let calc = RiskCalculator::new(series, &AnalyticsConfig::default());
//! println!("volatility: {:.4}", calc.volatility());
//! println!("max drawdown: {:.4}", calc.max_drawdown());
//! ```

pub mod config;
pub mod correlation;
pub mod report;
pub mod risk;
pub mod series;
pub mod stats;
pub mod types;

pub use config::AnalyticsConfig;
pub use correlation::{
    AssetClusters, CorrelationAnalysis, CorrelationEngine, CorrelationExtremes, CorrelationMatrix,
    CorrelationMethod, CorrelationPair, CorrelationStatistics,
};
pub use report::{AssemblerState, ExecutiveSummary, ReportPeriod, RiskReport, RiskReportAssembler};
pub use risk::{
    BenchmarkComparator, BenchmarkComparison, DrawdownAnalysis, RelativePerformance,
    RiskCalculator, RollingMetricsEngine, VarBacktest, VarEngine, VarMetrics,
};
pub use series::{MultiAssetReturnSeries, ReturnPoint, ReturnSeries};
pub use types::{
    ApiResponse, ComprehensiveRiskMetrics, MetricPoint, PerformanceMetrics, RiskLevel,
    RiskMetricsBundle, RollingMetric, RollingMetricSeries, RollingMetricsSummary,
};

/// Error types for portfolio-risk operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),
}

impl Error {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::TomlDe(_) => "config",
            Error::Validation(_) => "validation",
            Error::InsufficientData(_) => "insufficient_data",
            Error::State(_) => "state",
            Error::UnknownAsset(_) => "unknown_asset",
        }
    }
}

/// Result type for portfolio-risk operations.
pub type Result<T> = std::result::Result<T, Error>;
