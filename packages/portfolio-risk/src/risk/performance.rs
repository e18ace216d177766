//! Return and drawdown analytics.

use crate::stats;
use crate::types::nullable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Peak-to-trough drawdown details for a return series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawdownAnalysis {
    /// Deepest decline from a running peak (<= 0)
    #[serde(deserialize_with = "nullable::number")]
    pub max_drawdown: f64,
    /// Date of the trough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drawdown_date: Option<NaiveDate>,
    /// Date of the peak preceding the trough
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_date: Option<NaiveDate>,
    /// First date after the trough where wealth regained the peak
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_date: Option<NaiveDate>,
    /// Calendar days from peak to recovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawdown_duration: Option<i64>,
    /// Mean of all negative drawdown readings (NaN if never under water)
    #[serde(deserialize_with = "nullable::number")]
    pub avg_drawdown: f64,
    /// Number of periods spent under water
    pub drawdown_periods: usize,
}

impl DrawdownAnalysis {
    /// Analyze the wealth curve implied by `returns`, labelled with `dates`.
    ///
    /// `dates` and `returns` must have equal length.
    pub fn from_returns(dates: &[NaiveDate], returns: &[f64]) -> Self {
        let wealth = stats::wealth_curve(returns);
        let drawdowns = stats::drawdowns(returns);

        let under_water: Vec<f64> = drawdowns.iter().copied().filter(|&d| d < 0.0).collect();
        let avg_drawdown = stats::mean(&under_water);
        let drawdown_periods = under_water.len();

        // First index of the deepest drawdown
        let trough = drawdowns
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &d)| match best {
                Some((_, min)) if d >= min => best,
                _ => Some((i, d)),
            });

        let Some((trough_idx, max_drawdown)) = trough.filter(|&(_, d)| d < 0.0) else {
            return Self {
                max_drawdown: 0.0,
                max_drawdown_date: None,
                peak_date: None,
                recovery_date: None,
                drawdown_duration: None,
                avg_drawdown,
                drawdown_periods,
            };
        };

        let peak_value = wealth[..=trough_idx]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let peak_idx = wealth[..=trough_idx]
            .iter()
            .position(|&w| w == peak_value)
            .unwrap_or(0);
        let recovery_idx = wealth[trough_idx..]
            .iter()
            .position(|&w| w >= peak_value)
            .map(|offset| trough_idx + offset);

        let peak_date = dates.get(peak_idx).copied();
        let recovery_date = recovery_idx.and_then(|i| dates.get(i).copied());
        let drawdown_duration = match (peak_date, recovery_date) {
            (Some(peak), Some(recovery)) => Some((recovery - peak).num_days()),
            _ => None,
        };

        Self {
            max_drawdown,
            max_drawdown_date: dates.get(trough_idx).copied(),
            peak_date,
            recovery_date,
            drawdown_duration,
            avg_drawdown,
            drawdown_periods,
        }
    }
}

/// Annualize a fractional total return earned over `periods` periods.
///
/// Compounding form: (1 + total)^(periods_per_year / periods) - 1.
pub fn annualize_return(total_return: f64, periods: usize, periods_per_year: f64) -> f64 {
    if periods == 0 {
        return 0.0;
    }

    let years = periods as f64 / periods_per_year;
    (1.0 + total_return).powf(1.0 / years) - 1.0
}
