//! Result types produced by the analytics engines.
//!
//! Non-finite values (`NaN`) mark degenerate results and serialize as JSON `null`.

use crate::correlation::CorrelationAnalysis;
use crate::risk::{BenchmarkComparison, DrawdownAnalysis, VarMetrics};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Headline risk metrics for a return series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RiskMetricsBundle {
    /// Annualized Sharpe ratio
    #[serde(deserialize_with = "nullable::number")]
    pub sharpe_ratio: f64,
    /// Beta against the benchmark (absent without a benchmark)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    /// Annualized volatility
    #[serde(deserialize_with = "nullable::number")]
    pub volatility: f64,
    /// Maximum drawdown (<= 0)
    #[serde(deserialize_with = "nullable::number")]
    pub max_drawdown: f64,
    /// Historical VaR at 95% confidence (5% quantile)
    #[serde(deserialize_with = "nullable::number")]
    pub var_95: f64,
    /// Conditional VaR at 95% confidence
    #[serde(deserialize_with = "nullable::number")]
    pub cvar_95: f64,
    /// Calmar ratio (NaN when there was no drawdown)
    #[serde(deserialize_with = "nullable::number")]
    pub calmar_ratio: f64,
    /// Annualized Sortino ratio
    #[serde(deserialize_with = "nullable::number")]
    pub sortino_ratio: f64,
    /// Information ratio against the benchmark
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_ratio: Option<f64>,
    /// CAPM alpha against the benchmark
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

/// Return-side performance figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// Compounded total return over the period
    #[serde(deserialize_with = "nullable::number")]
    pub total_return: f64,
    /// Compounded annualized return
    #[serde(deserialize_with = "nullable::number")]
    pub annualized_return: f64,
    /// Annualized volatility
    #[serde(deserialize_with = "nullable::number")]
    pub annualized_volatility: f64,
    /// Population skewness
    #[serde(deserialize_with = "nullable::number")]
    pub skewness: f64,
    /// Excess kurtosis
    #[serde(deserialize_with = "nullable::number")]
    pub kurtosis: f64,
    /// Periods with a positive return
    pub positive_periods: usize,
    /// Periods with a negative return
    pub negative_periods: usize,
}

/// Metrics available as rolling series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RollingMetric {
    Sharpe,
    Sortino,
    Volatility,
    MaxDrawdown,
    Var,
    Beta,
    Alpha,
    Correlation,
}

impl fmt::Display for RollingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollingMetric::Sharpe => "sharpe",
            RollingMetric::Sortino => "sortino",
            RollingMetric::Volatility => "volatility",
            RollingMetric::MaxDrawdown => "max_drawdown",
            RollingMetric::Var => "var",
            RollingMetric::Beta => "beta",
            RollingMetric::Alpha => "alpha",
            RollingMetric::Correlation => "correlation",
        };
        f.write_str(name)
    }
}

/// One value of a rolling metric, dated at the end of its window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricPoint {
    pub date: NaiveDate,
    #[serde(deserialize_with = "nullable::number")]
    pub value: f64,
}

/// A metric evaluated over every full window of a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RollingMetricSeries {
    /// Which metric the values hold
    pub metric: RollingMetric,
    /// Window length in periods
    pub window: usize,
    /// One point per full window, in date order
    pub points: Vec<MetricPoint>,
}

impl RollingMetricSeries {
    /// Number of window positions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the input was shorter than the window.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Metric values without their dates.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Rolling metric values keyed by name, as embedded in the comprehensive bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RollingMetricsSummary {
    #[serde(deserialize_with = "nullable::numbers")]
    pub rolling_sharpe: Vec<f64>,
    #[serde(deserialize_with = "nullable::numbers")]
    pub rolling_volatility: Vec<f64>,
    #[serde(deserialize_with = "nullable::numbers")]
    pub rolling_max_drawdown: Vec<f64>,
    #[serde(deserialize_with = "nullable::numbers")]
    pub rolling_var: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default, deserialize_with = "nullable::optional_numbers")]
    pub rolling_beta: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default, deserialize_with = "nullable::optional_numbers")]
    pub rolling_alpha: Option<Vec<f64>>,
}

/// Everything the risk engines compute for one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveRiskMetrics {
    pub basic_metrics: RiskMetricsBundle,
    pub performance_metrics: PerformanceMetrics,
    pub rolling_metrics: RollingMetricsSummary,
    pub var_metrics: VarMetrics,
    pub drawdown: DrawdownAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark_comparison: Option<BenchmarkComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_analysis: Option<CorrelationAnalysis>,
    pub calculation_date: DateTime<Utc>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub data_points: usize,
}

/// Qualitative risk verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(name)
    }
}

/// Response envelope for JSON consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind, e.g. `insufficient_data`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            kind: None,
        }
    }

    /// Create an error response carrying the error kind.
    pub fn from_error(error: &crate::Error) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind().to_string()),
        }
    }
}

/// Deserializers that read JSON `null` back as `NaN`.
pub(crate) mod nullable {
    use serde::{Deserialize, Deserializer};

    fn or_nan(value: Option<f64>) -> f64 {
        value.unwrap_or(f64::NAN)
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Option::<f64>::deserialize(deserializer).map(or_nan)
    }

    pub fn numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(or_nan).collect())
    }

    pub fn optional_numbers<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f64>>, D::Error> {
        let values = Option::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(values.map(|v| v.into_iter().map(or_nan).collect()))
    }

    pub fn matrix<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<f64>>, D::Error> {
        let rows = Vec::<Vec<Option<f64>>>::deserialize(deserializer)?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(or_nan).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"HIGH\"");
        assert_eq!(RiskLevel::Medium.to_string(), "MEDIUM");
        assert!(RiskLevel::Low < RiskLevel::High);
    }

    #[test]
    fn test_bundle_skips_absent_benchmark_fields() {
        let bundle = RiskMetricsBundle {
            sharpe_ratio: 1.0,
            beta: None,
            volatility: 0.2,
            max_drawdown: -0.1,
            var_95: -0.02,
            cvar_95: -0.03,
            calmar_ratio: f64::NAN,
            sortino_ratio: 1.5,
            information_ratio: None,
            alpha: None,
        };
        let json = serde_json::to_value(bundle).unwrap();
        assert!(json.get("beta").is_none());
        assert!(json.get("alpha").is_none());
        // NaN becomes null on the wire
        assert!(json["calmar_ratio"].is_null());
    }

    #[test]
    fn test_null_reads_back_as_nan() {
        let json = r#"{"sharpe_ratio":0.5,"volatility":0.1,"max_drawdown":0.0,
            "var_95":-0.01,"cvar_95":-0.02,"calmar_ratio":null,"sortino_ratio":0.7}"#;
        let bundle: RiskMetricsBundle = serde_json::from_str(json).unwrap();
        assert!(bundle.calmar_ratio.is_nan());
        assert_eq!(bundle.sharpe_ratio, 0.5);
        assert!(bundle.beta.is_none());

        let summary: RollingMetricsSummary = serde_json::from_str(
            r#"{"rolling_sharpe":[1.0,null],"rolling_volatility":[],
            "rolling_max_drawdown":[],"rolling_var":[],"rolling_alpha":[null]}"#,
        )
        .unwrap();
        assert_eq!(summary.rolling_sharpe[0], 1.0);
        assert!(summary.rolling_sharpe[1].is_nan());
        assert!(summary.rolling_beta.is_none());
        assert!(summary.rolling_alpha.unwrap()[0].is_nan());
    }

    #[test]
    fn test_api_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("test".to_string()));

        let err = crate::Error::State("service not initialized".to_string());
        let err_response: ApiResponse<String> = ApiResponse::from_error(&err);
        assert!(!err_response.ok);
        assert_eq!(err_response.kind.as_deref(), Some("state"));
        assert_eq!(
            err_response.error.as_deref(),
            Some("State error: service not initialized")
        );
    }

    #[test]
    fn test_rolling_series_values() {
        let series = RollingMetricSeries {
            metric: RollingMetric::Volatility,
            window: 3,
            points: vec![MetricPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                value: 0.2,
            }],
        };
        assert_eq!(series.values(), vec![0.2]);
        assert_eq!(series.metric.to_string(), "volatility");
    }
}
