//! Cross-asset correlation analysis.
//!
//! Works on a [`MultiAssetReturnSeries`] whose columns are already aligned
//! on common dates. Matrices, pair screens, summary statistics, the
//! diversification ratio and correlation-based clustering all live here.

mod clustering;

pub use clustering::AssetClusters;
use clustering::kmeans;

use crate::config::AnalyticsConfig;
use crate::series::MultiAssetReturnSeries;
use crate::stats;
use crate::types::{nullable, MetricPoint, RollingMetric, RollingMetricSeries};
use crate::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Correlation coefficients available for the matrix.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    fn coefficient(self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            CorrelationMethod::Pearson => stats::pearson(x, y),
            CorrelationMethod::Spearman => stats::spearman(x, y),
        }
    }
}

/// Symmetric N×N correlation matrix over named assets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    /// Row-major values; `NaN` where an asset has zero variance
    #[serde(deserialize_with = "nullable::matrix")]
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Value at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i)?.get(j).copied()
    }

    /// Value for a pair of assets by name.
    pub fn get_by_name(&self, asset1: &str, asset2: &str) -> Result<f64> {
        let index = |name: &str| {
            self.assets
                .iter()
                .position(|a| a == name)
                .ok_or_else(|| Error::UnknownAsset(name.to_string()))
        };
        let (i, j) = (index(asset1)?, index(asset2)?);
        Ok(self.values[i][j])
    }

    /// Off-diagonal upper-triangle entries as pairs, in row order.
    fn upper_pairs(&self) -> Vec<CorrelationPair> {
        let n = self.assets.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                pairs.push(CorrelationPair {
                    asset1: self.assets[i].clone(),
                    asset2: self.assets[j].clone(),
                    correlation: self.values[i][j],
                });
            }
        }
        pairs
    }
}

/// Two assets and their correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationPair {
    pub asset1: String,
    pub asset2: String,
    #[serde(deserialize_with = "nullable::number")]
    pub correlation: f64,
}

/// Most and least correlated pairs by absolute correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationExtremes {
    /// Highest |correlation| first
    pub most_correlated_pairs: Vec<CorrelationPair>,
    /// Lowest |correlation| first
    pub least_correlated_pairs: Vec<CorrelationPair>,
}

/// Summary of the off-diagonal correlation values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CorrelationStatistics {
    #[serde(deserialize_with = "nullable::number")]
    pub mean_correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub median_correlation: f64,
    /// Population std of the values
    #[serde(deserialize_with = "nullable::number")]
    pub std_correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub min_correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub max_correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub q25_correlation: f64,
    #[serde(deserialize_with = "nullable::number")]
    pub q75_correlation: f64,
    pub negative_correlations: usize,
    /// Count above 0.7
    pub high_correlations: usize,
    /// Count below 0.3
    pub low_correlations: usize,
}

/// Correlation bundle embedded in the comprehensive metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationAnalysis {
    pub correlation_matrix: CorrelationMatrix,
    pub high_correlation_pairs: Vec<CorrelationPair>,
    pub correlation_statistics: CorrelationStatistics,
    #[serde(deserialize_with = "nullable::number")]
    pub diversification_ratio: f64,
    pub asset_clusters: AssetClusters,
}

/// Correlation analytics over two or more aligned assets.
#[derive(Debug, Clone)]
pub struct CorrelationEngine {
    data: MultiAssetReturnSeries,
    factor: f64,
}

impl CorrelationEngine {
    /// Create an engine. Needs at least two assets.
    pub fn new(data: MultiAssetReturnSeries, config: &AnalyticsConfig) -> Result<Self> {
        if data.asset_count() < 2 {
            return Err(Error::InsufficientData(format!(
                "Correlation analysis needs at least 2 assets, got {}",
                data.asset_count()
            )));
        }
        tracing::debug!(
            assets = data.asset_count(),
            observations = data.len(),
            "Correlation engine initialized"
        );
        Ok(Self {
            data,
            factor: config.factor(),
        })
    }

    /// Asset names in column order.
    pub fn assets(&self) -> &[String] {
        self.data.assets()
    }

    /// Pairwise correlation matrix with unit diagonal.
    pub fn correlation_matrix(&self, method: CorrelationMethod) -> CorrelationMatrix {
        let columns = self.data.columns();
        let n = columns.len();
        let mut values = vec![vec![0.0; n]; n];

        for i in 0..n {
            values[i][i] = if stats::std_dev(&columns[i]) > 0.0 {
                1.0
            } else {
                f64::NAN
            };
            for j in i + 1..n {
                let corr = method.coefficient(&columns[i], &columns[j]);
                values[i][j] = corr;
                values[j][i] = corr;
            }
        }

        CorrelationMatrix {
            assets: self.data.assets().to_vec(),
            values,
        }
    }

    /// Pairs whose correlation reaches `threshold`, strongest first.
    ///
    /// With `absolute`, |corr| is compared; otherwise the signed value.
    pub fn find_correlation_pairs(&self, threshold: f64, absolute: bool) -> Vec<CorrelationPair> {
        let matrix = self.correlation_matrix(CorrelationMethod::Pearson);
        let mut pairs: Vec<CorrelationPair> = matrix
            .upper_pairs()
            .into_iter()
            .filter(|p| {
                let c = if absolute { p.correlation.abs() } else { p.correlation };
                c >= threshold
            })
            .collect();
        pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
        pairs
    }

    /// The `n_pairs` most and least correlated pairs.
    pub fn correlation_extremes(&self, n_pairs: usize) -> CorrelationExtremes {
        let matrix = self.correlation_matrix(CorrelationMethod::Pearson);
        let mut pairs: Vec<CorrelationPair> = matrix
            .upper_pairs()
            .into_iter()
            .filter(|p| !p.correlation.is_nan())
            .collect();
        pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));

        let most_correlated_pairs = pairs.iter().take(n_pairs).cloned().collect();
        let least_correlated_pairs = pairs.iter().rev().take(n_pairs).cloned().collect();

        CorrelationExtremes {
            most_correlated_pairs,
            least_correlated_pairs,
        }
    }

    /// Statistics over the N(N-1)/2 off-diagonal values, ignoring `NaN`.
    pub fn correlation_statistics(&self) -> CorrelationStatistics {
        let matrix = self.correlation_matrix(CorrelationMethod::Pearson);
        let values: Vec<f64> = matrix
            .upper_pairs()
            .into_iter()
            .map(|p| p.correlation)
            .filter(|c| !c.is_nan())
            .collect();

        let (min, max) = if values.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            (
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };

        CorrelationStatistics {
            mean_correlation: stats::mean(&values),
            median_correlation: stats::median(&values),
            std_correlation: stats::population_std_dev(&values),
            min_correlation: min,
            max_correlation: max,
            q25_correlation: stats::quantile(&values, 0.25),
            q75_correlation: stats::quantile(&values, 0.75),
            negative_correlations: values.iter().filter(|&&c| c < 0.0).count(),
            high_correlations: values.iter().filter(|&&c| c > 0.7).count(),
            low_correlations: values.iter().filter(|&&c| c < 0.3).count(),
        }
    }

    /// Weighted average volatility over portfolio volatility (annualized).
    ///
    /// Weights default to equal. `NaN` when portfolio volatility is zero.
    pub fn diversification_ratio(&self, weights: Option<&[f64]>) -> Result<f64> {
        let columns = self.data.columns();
        let n = columns.len();

        let weights: Vec<f64> = match weights {
            Some(w) if w.len() != n => {
                return Err(Error::Validation(format!(
                    "Expected {} weights, got {}",
                    n,
                    w.len()
                )));
            }
            Some(w) => w.to_vec(),
            None => vec![1.0 / n as f64; n],
        };

        let vols: Vec<f64> = columns
            .iter()
            .map(|c| stats::std_dev(c) * self.factor.sqrt())
            .collect();
        let weighted_vol: f64 = weights.iter().zip(&vols).map(|(w, v)| w * v).sum();

        let mut portfolio_var = 0.0;
        for i in 0..n {
            for j in 0..n {
                let cov = stats::covariance(&columns[i], &columns[j]) * self.factor;
                portfolio_var += weights[i] * weights[j] * cov;
            }
        }
        let portfolio_vol = portfolio_var.sqrt();

        if !(portfolio_vol > 0.0) {
            return Ok(f64::NAN);
        }
        Ok(weighted_vol / portfolio_vol)
    }

    /// Group assets with k-means on rows of the distance matrix 1 - |corr|.
    ///
    /// An undefined correlation counts as distance 1.
    pub fn correlation_clustering<R: Rng + ?Sized>(
        &self,
        n_clusters: usize,
        rng: &mut R,
    ) -> Result<AssetClusters> {
        let n = self.data.asset_count();
        if n_clusters == 0 || n_clusters > n {
            return Err(Error::Validation(format!(
                "n_clusters must be between 1 and {}, got {}",
                n, n_clusters
            )));
        }

        let matrix = self.correlation_matrix(CorrelationMethod::Pearson);
        let distances: Vec<Vec<f64>> = matrix
            .values
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&c| if c.is_nan() { 1.0 } else { 1.0 - c.abs() })
                    .collect()
            })
            .collect();

        let labels = kmeans(&distances, n_clusters, rng);
        Ok(AssetClusters::from_labels(self.data.assets(), &labels))
    }

    /// Rolling Pearson correlation between two named assets.
    pub fn rolling_correlation(
        &self,
        asset1: &str,
        asset2: &str,
        window: usize,
    ) -> Result<RollingMetricSeries> {
        if window < 2 {
            return Err(Error::Validation(format!(
                "Rolling window must be at least 2, got {}",
                window
            )));
        }
        let x = self.data.column_by_name(asset1)?;
        let y = self.data.column_by_name(asset2)?;
        let dates = self.data.dates();

        let points = if x.len() < window {
            Vec::new()
        } else {
            (window - 1..x.len())
                .map(|end| {
                    let start = end + 1 - window;
                    MetricPoint {
                        date: dates[end],
                        value: stats::pearson(&x[start..=end], &y[start..=end]),
                    }
                })
                .collect()
        };

        Ok(RollingMetricSeries {
            metric: RollingMetric::Correlation,
            window,
            points,
        })
    }

    /// Matrix, high pairs, statistics, diversification ratio and clusters.
    ///
    /// `n_clusters` is capped at the number of assets.
    pub fn analysis<R: Rng + ?Sized>(
        &self,
        threshold: f64,
        n_clusters: usize,
        rng: &mut R,
    ) -> Result<CorrelationAnalysis> {
        let k = n_clusters.min(self.data.asset_count());
        if k < n_clusters {
            tracing::debug!(requested = n_clusters, used = k, "Capped cluster count");
        }

        Ok(CorrelationAnalysis {
            correlation_matrix: self.correlation_matrix(CorrelationMethod::Pearson),
            high_correlation_pairs: self.find_correlation_pairs(threshold, true),
            correlation_statistics: self.correlation_statistics(),
            diversification_ratio: self.diversification_ratio(None)?,
            asset_clusters: self.correlation_clustering(k, rng)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ReturnSeries;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn series(values: &[f64]) -> ReturnSeries {
        ReturnSeries::from_values(start(), values).unwrap()
    }

    /// Four assets: A and B move together, C is independent, D mirrors A.
    fn engine() -> CorrelationEngine {
        let mut rng = StdRng::seed_from_u64(17);
        let normal = Normal::new(0.0, 0.01).unwrap();
        let n = 120;
        let base: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
        let noise: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng) * 0.2).collect();
        let independent: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();

        let a = base.clone();
        let b: Vec<f64> = base.iter().zip(&noise).map(|(x, e)| x + e).collect();
        let d: Vec<f64> = base.iter().map(|x| -x).collect();

        let data = MultiAssetReturnSeries::new(vec![
            ("A".to_string(), series(&a)),
            ("B".to_string(), series(&b)),
            ("C".to_string(), series(&independent)),
            ("D".to_string(), series(&d)),
        ])
        .unwrap();
        CorrelationEngine::new(data, &AnalyticsConfig::default()).unwrap()
    }

    #[test]
    fn test_requires_two_assets() {
        let data = MultiAssetReturnSeries::single("A", series(&[0.01, 0.02]));
        let result = CorrelationEngine::new(data, &AnalyticsConfig::default());
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_matrix_symmetric_with_unit_diagonal() {
        let e = engine();
        for method in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            let m = e.correlation_matrix(method);
            for i in 0..4 {
                assert_eq!(m.get(i, i), Some(1.0));
                for j in 0..4 {
                    assert_eq!(m.values[i][j], m.values[j][i]);
                    assert!(m.values[i][j].abs() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_zero_variance_asset_gives_nan() {
        let data = MultiAssetReturnSeries::new(vec![
            ("A".to_string(), series(&[0.01, -0.02, 0.03])),
            ("FLAT".to_string(), series(&[0.0, 0.0, 0.0])),
        ])
        .unwrap();
        let e = CorrelationEngine::new(data, &AnalyticsConfig::default()).unwrap();
        let m = e.correlation_matrix(CorrelationMethod::Pearson);

        assert!(m.get(1, 1).unwrap().is_nan());
        assert!(m.get_by_name("A", "FLAT").unwrap().is_nan());
        assert!(matches!(m.get_by_name("A", "X"), Err(Error::UnknownAsset(_))));

        let stats = e.correlation_statistics();
        assert!(stats.mean_correlation.is_nan());
        assert_eq!(stats.negative_correlations, 0);
    }

    #[test]
    fn test_find_pairs() {
        let e = engine();
        let absolute = e.find_correlation_pairs(0.7, true);
        // A-B, A-D and B-D are strongly related
        assert_eq!(absolute.len(), 3);
        assert_relative_eq!(absolute[0].correlation, -1.0, max_relative = 1e-12);
        assert!(absolute
            .windows(2)
            .all(|w| w[0].correlation.abs() >= w[1].correlation.abs()));

        let signed = e.find_correlation_pairs(0.7, false);
        assert_eq!(signed.len(), 1);
        assert_eq!((signed[0].asset1.as_str(), signed[0].asset2.as_str()), ("A", "B"));
    }

    #[test]
    fn test_extremes() {
        let e = engine();
        let extremes = e.correlation_extremes(2);
        assert_eq!(extremes.most_correlated_pairs.len(), 2);
        assert_eq!(extremes.least_correlated_pairs.len(), 2);
        assert_eq!(extremes.most_correlated_pairs[0].asset2, "D");
        assert!(
            extremes.least_correlated_pairs[0].correlation.abs()
                <= extremes.least_correlated_pairs[1].correlation.abs()
        );
    }

    #[test]
    fn test_statistics_counts() {
        let stats = engine().correlation_statistics();
        // Six pairs: A-D and B-D negative; A-B and the C pairs low or high
        assert!(stats.negative_correlations >= 2);
        assert_eq!(stats.high_correlations, 1);
        assert!(stats.min_correlation >= -1.0 && stats.max_correlation <= 1.0);
        assert!(stats.q25_correlation <= stats.median_correlation);
        assert!(stats.median_correlation <= stats.q75_correlation);
        assert!(stats.std_correlation > 0.0);
    }

    #[test]
    fn test_diversification_ratio_at_least_one() {
        let e = engine();
        let equal = e.diversification_ratio(None).unwrap();
        assert!(equal >= 1.0 - 1e-12);

        let weights = [0.4, 0.3, 0.2, 0.1];
        assert!(e.diversification_ratio(Some(&weights)).unwrap() >= 1.0 - 1e-12);

        let bad = e.diversification_ratio(Some(&[0.5, 0.5]));
        assert!(matches!(bad, Err(Error::Validation(_))));
    }

    #[test]
    fn test_diversification_ratio_zero_volatility() {
        // A and its mirror cancel exactly under equal weights
        let values = [0.01, -0.02, 0.015, 0.005];
        let mirror: Vec<f64> = values.iter().map(|v| -v).collect();
        let data = MultiAssetReturnSeries::new(vec![
            ("A".to_string(), series(&values)),
            ("B".to_string(), series(&mirror)),
        ])
        .unwrap();
        let e = CorrelationEngine::new(data, &AnalyticsConfig::default()).unwrap();
        assert!(e.diversification_ratio(None).unwrap().is_nan());
    }

    #[test]
    fn test_clusters_partition_assets() {
        let e = engine();
        for k in 1..=4 {
            let mut rng = StdRng::seed_from_u64(42);
            let clusters = e.correlation_clustering(k, &mut rng).unwrap();

            let mut members: Vec<&str> = clusters
                .iter()
                .flat_map(|(_, assets)| assets.iter().map(String::as_str))
                .collect();
            members.sort_unstable();
            assert_eq!(members, vec!["A", "B", "C", "D"]);
            assert!(clusters.len() <= k);
            assert_eq!(clusters.cluster_of("A"), Some(0));
        }
    }

    #[test]
    fn test_clustering_is_seeded() {
        let e = engine();
        let a = e.correlation_clustering(2, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = e.correlation_clustering(2, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);

        let mut rng = StdRng::seed_from_u64(5);
        assert!(matches!(
            e.correlation_clustering(0, &mut rng),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            e.correlation_clustering(5, &mut rng),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_rolling_correlation() {
        let e = engine();
        let rolling = e.rolling_correlation("A", "D", 10).unwrap();
        assert_eq!(rolling.len(), 120 - 9);
        for value in rolling.values() {
            assert_relative_eq!(value, -1.0, max_relative = 1e-9);
        }

        assert!(matches!(
            e.rolling_correlation("A", "Z", 10),
            Err(Error::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_analysis_caps_clusters() {
        let e = engine();
        let mut rng = StdRng::seed_from_u64(3);
        let analysis = e.analysis(0.7, 10, &mut rng).unwrap();
        assert_eq!(analysis.high_correlation_pairs.len(), 3);
        assert!(analysis.asset_clusters.len() <= 4);
        assert!(analysis.diversification_ratio >= 1.0 - 1e-12);
    }
}
