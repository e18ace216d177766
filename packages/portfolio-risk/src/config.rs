//! Analytics configuration.
//!
//! Defaults match daily equity data (252 periods per year, 2% risk-free
//! rate, one-year rolling window, 95% VaR). A TOML file can override any
//! field; missing fields keep their defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Trading days per year.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Default annual risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Parameters shared by every engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate (0.02 = 2%/yr)
    pub risk_free_rate: f64,
    /// Periods per year used for annualization
    pub annualization_factor: u32,
    /// Window length for rolling metrics
    pub rolling_window: usize,
    /// Tail probability for VaR (0.05 = 95% VaR)
    pub var_confidence: f64,
    /// Number of draws for Monte Carlo VaR
    pub monte_carlo_simulations: usize,
    /// Minimum |correlation| reported as a high-correlation pair
    pub correlation_threshold: f64,
    /// Number of clusters for correlation clustering
    pub n_clusters: usize,
    /// Include benchmark comparison when a benchmark is supplied
    pub include_benchmark: bool,
    /// Include correlation analysis when two or more assets are supplied
    pub include_correlation: bool,
    /// Seed for the random number generator (None = entropy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            annualization_factor: TRADING_DAYS_PER_YEAR,
            rolling_window: 252,
            var_confidence: 0.05,
            monte_carlo_simulations: 10_000,
            correlation_threshold: 0.7,
            n_clusters: 3,
            include_benchmark: true,
            include_correlation: true,
            seed: None,
        }
    }
}

impl AnalyticsConfig {
    /// Get the default config file path.
    ///
    /// Can be overridden with the `PORTFOLIO_RISK_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("PORTFOLIO_RISK_CONFIG") {
            return PathBuf::from(path);
        }

        directories::ProjectDirs::from("", "", "portfolio-risk")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("portfolio-risk.toml"))
    }

    /// Load from the default path, falling back to defaults if the file is absent.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load and validate a config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-period risk-free rate.
    pub fn periodic_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.annualization_factor as f64
    }

    /// Annualization factor as a float.
    pub fn factor(&self) -> f64 {
        self.annualization_factor as f64
    }

    /// Reject values no engine can work with.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(Error::Validation(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        if self.annualization_factor == 0 {
            return Err(Error::Validation(
                "annualization_factor must be positive".to_string(),
            ));
        }
        if self.rolling_window < 2 {
            return Err(Error::Validation(
                "rolling_window must be at least 2".to_string(),
            ));
        }
        if !(self.var_confidence > 0.0 && self.var_confidence < 1.0) {
            return Err(Error::Validation(format!(
                "var_confidence must be in (0, 1), got {}",
                self.var_confidence
            )));
        }
        if self.monte_carlo_simulations == 0 {
            return Err(Error::Validation(
                "monte_carlo_simulations must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(Error::Validation(format!(
                "correlation_threshold must be in [0, 1], got {}",
                self.correlation_threshold
            )));
        }
        if self.n_clusters == 0 {
            return Err(Error::Validation(
                "n_clusters must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.annualization_factor, 252);
        assert_eq!(config.rolling_window, 252);
        assert!((config.periodic_risk_free_rate() - 0.02 / 252.0).abs() < 1e-15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "risk_free_rate = 0.04\nrolling_window = 63\nseed = 7").unwrap();

        let config = AnalyticsConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.risk_free_rate, 0.04);
        assert_eq!(config.rolling_window, 63);
        assert_eq!(config.seed, Some(7));
        // Untouched fields keep defaults
        assert_eq!(config.annualization_factor, 252);
        assert_eq!(config.n_clusters, 3);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalyticsConfig::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AnalyticsConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "var_confidence = 1.5").unwrap();

        let result = AnalyticsConfig::load_from_path(file.path());
        assert!(matches!(result, Err(Error::Validation(_))));

        let config = AnalyticsConfig {
            rolling_window: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "risk_free_rate = \"high\"").unwrap();

        let result = AnalyticsConfig::load_from_path(file.path());
        assert!(matches!(result, Err(Error::TomlDe(_))));
    }
}
