//! Orchestrates the engines into one metrics bundle and a narrative report.

use super::rules;
use crate::config::AnalyticsConfig;
use crate::correlation::CorrelationEngine;
use crate::risk::{BenchmarkComparator, RiskCalculator, RollingMetricsEngine, VarEngine};
use crate::series::{MultiAssetReturnSeries, ReturnSeries};
use crate::types::{nullable, ComprehensiveRiskMetrics, RiskLevel};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lifecycle of a [`RiskReportAssembler`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblerState {
    Uninitialized,
    Initialized,
    MetricsComputed,
    ReportGenerated,
}

/// Bounds of the analyzed data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub data_points: usize,
}

/// Headline figures for the report's first section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    #[serde(deserialize_with = "nullable::number")]
    pub annualized_return: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub volatility: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub sharpe_ratio: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub max_drawdown: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub var_95: f64,
}

/// Complete risk report for one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub portfolio_name: String,
    pub report_date: DateTime<Utc>,
    pub period: ReportPeriod,
    pub executive_summary: ExecutiveSummary,
    pub detailed_metrics: ComprehensiveRiskMetrics,
    pub risk_assessment: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Engines built by `initialize`.
#[derive(Debug)]
struct Engines {
    data: MultiAssetReturnSeries,
    calculator: RiskCalculator,
    rolling: RollingMetricsEngine,
    var: VarEngine,
    benchmark: Option<BenchmarkComparator>,
    correlation: Option<CorrelationEngine>,
}

/// Builds comprehensive metrics and reports from return data.
///
/// Call [`initialize`](Self::initialize) first; every other operation
/// fails with [`Error::State`] until then.
#[derive(Debug)]
pub struct RiskReportAssembler {
    config: AnalyticsConfig,
    state: AssemblerState,
    engines: Option<Engines>,
}

impl Default for RiskReportAssembler {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}

impl RiskReportAssembler {
    /// Create an uninitialized assembler.
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            state: AssemblerState::Uninitialized,
            engines: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Load data and build the engines.
    ///
    /// The first column of `returns` is the portfolio. Correlation analysis
    /// is prepared only when there are two or more columns. May be called
    /// again to replace the data.
    pub fn initialize(
        &mut self,
        returns: MultiAssetReturnSeries,
        benchmark: Option<ReturnSeries>,
        risk_free_rate: f64,
    ) -> Result<()> {
        let mut config = self.config.clone();
        config.risk_free_rate = risk_free_rate;
        config.validate()?;

        let primary = returns.primary();
        let calculator = RiskCalculator::new(primary.clone(), &config);
        let rolling = RollingMetricsEngine::new(primary.clone(), config.rolling_window, &config)?;
        let var = VarEngine::new(&primary);

        let (calculator, rolling, benchmark) = match benchmark {
            Some(b) => (
                calculator.with_benchmark(b.clone()),
                rolling.with_benchmark(b.clone()),
                Some(BenchmarkComparator::new(&primary, &b, &config)),
            ),
            None => (calculator, rolling, None),
        };

        let correlation = if returns.asset_count() >= 2 {
            Some(CorrelationEngine::new(returns.clone(), &config)?)
        } else {
            None
        };

        tracing::info!(
            portfolio = returns.primary_asset(),
            assets = returns.asset_count(),
            observations = returns.len(),
            benchmark = benchmark.is_some(),
            "Risk report assembler initialized"
        );

        self.config = config;
        self.engines = Some(Engines {
            data: returns,
            calculator,
            rolling,
            var,
            benchmark,
            correlation,
        });
        self.state = AssemblerState::Initialized;
        Ok(())
    }

    fn engines(&self) -> Result<&Engines> {
        self.engines
            .as_ref()
            .ok_or_else(|| Error::State("service not initialized".to_string()))
    }

    /// Run every engine and bundle the results.
    pub fn calculate_comprehensive_risk_metrics<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<ComprehensiveRiskMetrics> {
        let engines = self.engines()?;
        let config = &self.config;

        let var_metrics = engines.var.var_metrics(config.monte_carlo_simulations, rng)?;
        let var_95 = engines.var.historical_var(0.05)?;
        let cvar_95 = engines.var.conditional_var(0.05)?;

        let benchmark_comparison = if config.include_benchmark {
            engines.benchmark.as_ref().map(BenchmarkComparator::compare)
        } else {
            None
        };

        let correlation_analysis = match &engines.correlation {
            Some(engine) if config.include_correlation => Some(engine.analysis(
                config.correlation_threshold,
                config.n_clusters,
                rng,
            )?),
            _ => None,
        };

        let data = &engines.data;
        let metrics = ComprehensiveRiskMetrics {
            basic_metrics: engines.calculator.metrics_bundle(var_95, cvar_95),
            performance_metrics: engines.calculator.performance_metrics(),
            rolling_metrics: engines.rolling.summary(config.var_confidence)?,
            var_metrics,
            drawdown: engines.calculator.drawdown_analysis(),
            benchmark_comparison,
            correlation_analysis,
            calculation_date: Utc::now(),
            period_start: data.dates()[0],
            period_end: data.dates()[data.len() - 1],
            data_points: data.len(),
        };

        tracing::info!(
            data_points = metrics.data_points,
            sharpe = metrics.basic_metrics.sharpe_ratio,
            volatility = metrics.basic_metrics.volatility,
            "Comprehensive risk metrics calculated"
        );

        self.state = AssemblerState::MetricsComputed;
        Ok(metrics)
    }

    /// Compute fresh metrics and wrap them in a report.
    pub fn generate_risk_report<R: Rng + ?Sized>(
        &mut self,
        portfolio_name: &str,
        rng: &mut R,
    ) -> Result<RiskReport> {
        let metrics = self.calculate_comprehensive_risk_metrics(rng)?;

        for factor in rules::RISK_FACTORS {
            tracing::debug!(factor = factor.name, score = factor.score(&metrics), "Risk factor");
        }
        let risk_assessment = rules::assess_risk_level(&metrics);
        let recommendations = rules::recommendations(&metrics);

        let report = RiskReport {
            portfolio_name: portfolio_name.to_string(),
            report_date: Utc::now(),
            period: ReportPeriod {
                start: metrics.period_start,
                end: metrics.period_end,
                data_points: metrics.data_points,
            },
            executive_summary: ExecutiveSummary {
                annualized_return: metrics.performance_metrics.annualized_return,
                volatility: metrics.basic_metrics.volatility,
                sharpe_ratio: metrics.basic_metrics.sharpe_ratio,
                max_drawdown: metrics.basic_metrics.max_drawdown,
                var_95: metrics.basic_metrics.var_95,
            },
            detailed_metrics: metrics,
            risk_assessment,
            recommendations,
        };

        tracing::info!(
            portfolio = portfolio_name,
            risk = %report.risk_assessment,
            recommendations = report.recommendations.len(),
            "Risk report generated"
        );

        self.state = AssemblerState::ReportGenerated;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
    }

    fn random_series(n: usize, mean: f64, std: f64, seed: u64) -> ReturnSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(mean, std).unwrap();
        let values: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
        ReturnSeries::from_values(start(), &values).unwrap()
    }

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            rolling_window: 20,
            monte_carlo_simulations: 1_000,
            ..AnalyticsConfig::default()
        }
    }

    #[test]
    fn test_requires_initialize() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(assembler.state(), AssemblerState::Uninitialized);
        let err = assembler
            .calculate_comprehensive_risk_metrics(&mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::State(ref msg) if msg == "service not initialized"));
        assert!(matches!(
            assembler.generate_risk_report("Test", &mut rng),
            Err(Error::State(_))
        ));
        assert_eq!(assembler.state(), AssemblerState::Uninitialized);
    }

    #[test]
    fn test_state_transitions() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(2);
        let data = MultiAssetReturnSeries::single("PORT", random_series(100, 0.0005, 0.01, 3));

        assembler.initialize(data.clone(), None, 0.02).unwrap();
        assert_eq!(assembler.state(), AssemblerState::Initialized);

        assembler.calculate_comprehensive_risk_metrics(&mut rng).unwrap();
        assert_eq!(assembler.state(), AssemblerState::MetricsComputed);

        assembler.generate_risk_report("Test", &mut rng).unwrap();
        assert_eq!(assembler.state(), AssemblerState::ReportGenerated);

        // Re-initialization resets the lifecycle
        assembler.initialize(data, None, 0.03).unwrap();
        assert_eq!(assembler.state(), AssemblerState::Initialized);
        assert_eq!(assembler.config().risk_free_rate, 0.03);
    }

    #[test]
    fn test_single_asset_without_benchmark() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(4);
        let data = MultiAssetReturnSeries::single("PORT", random_series(60, 0.0005, 0.01, 5));
        assembler.initialize(data, None, 0.02).unwrap();

        let metrics = assembler.calculate_comprehensive_risk_metrics(&mut rng).unwrap();
        assert!(metrics.benchmark_comparison.is_none());
        assert!(metrics.correlation_analysis.is_none());
        assert!(metrics.basic_metrics.beta.is_none());
        assert_eq!(metrics.data_points, 60);
        assert_eq!(metrics.rolling_metrics.rolling_sharpe.len(), 60 - 19);
        assert_eq!(metrics.period_start, start());
    }

    #[test]
    fn test_benchmark_and_correlation_sections() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(6);
        let data = MultiAssetReturnSeries::new(vec![
            ("PORT".to_string(), random_series(80, 0.0005, 0.01, 7)),
            ("BOND".to_string(), random_series(80, 0.0002, 0.003, 8)),
        ])
        .unwrap();
        let benchmark = random_series(80, 0.0004, 0.009, 9);
        assembler.initialize(data, Some(benchmark), 0.02).unwrap();

        let metrics = assembler.calculate_comprehensive_risk_metrics(&mut rng).unwrap();
        assert!(metrics.basic_metrics.beta.is_some());
        assert!(metrics.rolling_metrics.rolling_beta.is_some());
        let comparison = metrics.benchmark_comparison.unwrap();
        assert_eq!(comparison.aligned_periods, 80);

        let correlation = metrics.correlation_analysis.unwrap();
        assert_eq!(correlation.correlation_matrix.assets, vec!["PORT", "BOND"]);
        // Three requested clusters are capped at two assets
        assert!(correlation.asset_clusters.len() <= 2);
    }

    #[test]
    fn test_include_flags() {
        let mut assembler = RiskReportAssembler::new(AnalyticsConfig {
            include_benchmark: false,
            include_correlation: false,
            ..config()
        });
        let mut rng = StdRng::seed_from_u64(10);
        let data = MultiAssetReturnSeries::new(vec![
            ("PORT".to_string(), random_series(50, 0.0005, 0.01, 11)),
            ("ALT".to_string(), random_series(50, 0.0005, 0.01, 12)),
        ])
        .unwrap();
        assembler
            .initialize(data, Some(random_series(50, 0.0, 0.01, 13)), 0.02)
            .unwrap();

        let metrics = assembler.calculate_comprehensive_risk_metrics(&mut rng).unwrap();
        assert!(metrics.benchmark_comparison.is_none());
        assert!(metrics.correlation_analysis.is_none());
    }

    #[test]
    fn test_report_contents() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(14);
        // High volatility and negative drift
        let data = MultiAssetReturnSeries::single("PORT", random_series(120, -0.003, 0.03, 15));
        assembler.initialize(data, None, 0.02).unwrap();

        let report = assembler.generate_risk_report("Aggressive", &mut rng).unwrap();
        assert_eq!(report.portfolio_name, "Aggressive");
        assert_eq!(report.period.data_points, 120);
        assert_eq!(report.risk_assessment, RiskLevel::High);
        assert_eq!(
            report.recommendations[0],
            "Consider improving risk-adjusted returns through better asset selection"
        );
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.starts_with("High volatility")));
        assert_eq!(
            report.executive_summary.volatility,
            report.detailed_metrics.basic_metrics.volatility
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["risk_assessment"], "HIGH");
        assert!(json["detailed_metrics"]["basic_metrics"].get("beta").is_none());
    }

    #[test]
    fn test_report_json_reads_back_without_drawdown() {
        let mut assembler = RiskReportAssembler::new(config());
        let mut rng = StdRng::seed_from_u64(17);
        let values: Vec<f64> = (0..40).map(|i| 0.001 + 0.0005 * (i % 3) as f64).collect();
        let series = ReturnSeries::from_values(start(), &values).unwrap();
        assembler
            .initialize(MultiAssetReturnSeries::single("UP", series), None, 0.02)
            .unwrap();

        let report = assembler.generate_risk_report("Steady", &mut rng).unwrap();
        assert!(report.detailed_metrics.basic_metrics.calmar_ratio.is_nan());

        let json = serde_json::to_string(&report).unwrap();
        let restored: RiskReport = serde_json::from_str(&json).unwrap();
        let basic = &restored.detailed_metrics.basic_metrics;
        assert!(basic.calmar_ratio.is_nan());
        assert!(restored.detailed_metrics.drawdown.avg_drawdown.is_nan());
        assert_relative_eq!(
            basic.sharpe_ratio,
            report.detailed_metrics.basic_metrics.sharpe_ratio,
            max_relative = 1e-12
        );
        assert_eq!(restored.risk_assessment, report.risk_assessment);
        assert_eq!(restored.recommendations, report.recommendations);
        assert_eq!(
            restored.detailed_metrics.rolling_metrics.rolling_max_drawdown,
            report.detailed_metrics.rolling_metrics.rolling_max_drawdown
        );
    }

    #[test]
    fn test_invalid_risk_free_rate_keeps_state() {
        let mut assembler = RiskReportAssembler::new(config());
        let data = MultiAssetReturnSeries::single("PORT", random_series(30, 0.0, 0.01, 16));
        let result = assembler.initialize(data, None, f64::NAN);
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(assembler.state(), AssemblerState::Uninitialized);
    }
}
