//! Static scoring and recommendation tables.

use crate::types::{ComprehensiveRiskMetrics, RiskLevel};

/// Score one metric: thresholds are checked in order, first match wins,
/// otherwise `base` applies.
pub struct RiskFactor {
    pub name: &'static str,
    pub value: fn(&ComprehensiveRiskMetrics) -> f64,
    pub bands: &'static [(Band, u32)],
    pub base: u32,
}

/// A threshold comparison.
#[derive(Debug, Clone, Copy)]
pub enum Band {
    Above(f64),
    Below(f64),
}

impl Band {
    fn contains(self, value: f64) -> bool {
        match self {
            Band::Above(limit) => value > limit,
            Band::Below(limit) => value < limit,
        }
    }
}

impl RiskFactor {
    /// Score for this factor; `NaN` matches no band and scores `base`.
    pub fn score(&self, metrics: &ComprehensiveRiskMetrics) -> u32 {
        let value = (self.value)(metrics);
        self.bands
            .iter()
            .find(|(band, _)| band.contains(value))
            .map(|&(_, points)| points)
            .unwrap_or(self.base)
    }
}

pub static RISK_FACTORS: &[RiskFactor] = &[
    RiskFactor {
        name: "volatility",
        value: |m| m.basic_metrics.volatility,
        bands: &[(Band::Above(0.25), 3), (Band::Above(0.15), 2)],
        base: 1,
    },
    RiskFactor {
        name: "max_drawdown",
        value: |m| m.basic_metrics.max_drawdown.abs(),
        bands: &[(Band::Above(0.30), 3), (Band::Above(0.20), 2)],
        base: 1,
    },
    RiskFactor {
        name: "sharpe_ratio",
        value: |m| m.basic_metrics.sharpe_ratio,
        bands: &[(Band::Below(0.5), 3), (Band::Below(1.0), 2)],
        base: 1,
    },
];

/// Total score at or above which each level applies, highest first.
static LEVEL_THRESHOLDS: &[(u32, RiskLevel)] = &[(7, RiskLevel::High), (5, RiskLevel::Medium)];

/// Sum of factor scores.
pub fn risk_score(metrics: &ComprehensiveRiskMetrics) -> u32 {
    RISK_FACTORS.iter().map(|f| f.score(metrics)).sum()
}

/// Qualitative level for the summed factor scores.
pub fn assess_risk_level(metrics: &ComprehensiveRiskMetrics) -> RiskLevel {
    let score = risk_score(metrics);
    LEVEL_THRESHOLDS
        .iter()
        .find(|&&(min, _)| score >= min)
        .map(|&(_, level)| level)
        .unwrap_or(RiskLevel::Low)
}

/// A message emitted when its predicate holds.
pub struct RecommendationRule {
    pub applies: fn(&ComprehensiveRiskMetrics) -> bool,
    pub message: &'static str,
}

pub static RECOMMENDATION_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        applies: |m| m.basic_metrics.sharpe_ratio < 0.5,
        message: "Consider improving risk-adjusted returns through better asset selection",
    },
    RecommendationRule {
        applies: |m| m.basic_metrics.max_drawdown.abs() > 0.25,
        message: "High drawdown detected - consider implementing stop-loss strategies",
    },
    RecommendationRule {
        applies: |m| m.basic_metrics.volatility > 0.20,
        message: "High volatility - consider diversification or hedging strategies",
    },
    RecommendationRule {
        applies: |m| {
            m.correlation_analysis
                .as_ref()
                .is_some_and(|c| c.diversification_ratio < 1.5)
        },
        message: "Low diversification - consider adding uncorrelated assets",
    },
    RecommendationRule {
        applies: |m| {
            m.benchmark_comparison
                .as_ref()
                .is_some_and(|b| b.information_ratio < 0.0)
        },
        message: "Underperforming benchmark - review investment strategy",
    },
];

/// Messages of every rule that applies, in table order.
pub fn recommendations(metrics: &ComprehensiveRiskMetrics) -> Vec<String> {
    RECOMMENDATION_RULES
        .iter()
        .filter(|rule| (rule.applies)(metrics))
        .map(|rule| rule.message.to_string())
        .collect()
}
