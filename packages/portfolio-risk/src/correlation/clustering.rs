//! K-means over rows of a correlation distance matrix.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_ITERATIONS: usize = 300;

/// Cluster id to member assets. Ids are numbered 0.. in order of each
/// cluster's first member.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AssetClusters(BTreeMap<usize, Vec<String>>);

impl AssetClusters {
    /// Group `assets` by their cluster `labels`, renumbering ids by first appearance.
    pub fn from_labels(assets: &[String], labels: &[usize]) -> Self {
        let mut renumbered: Vec<usize> = Vec::new();
        let mut clusters: BTreeMap<usize, Vec<String>> = BTreeMap::new();

        for (asset, &label) in assets.iter().zip(labels) {
            let id = match renumbered.iter().position(|&l| l == label) {
                Some(id) => id,
                None => {
                    renumbered.push(label);
                    renumbered.len() - 1
                }
            };
            clusters.entry(id).or_default().push(asset.clone());
        }

        Self(clusters)
    }

    /// Number of non-empty clusters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members of cluster `id`.
    pub fn get(&self, id: usize) -> Option<&[String]> {
        self.0.get(&id).map(Vec::as_slice)
    }

    /// Cluster id holding `asset`.
    pub fn cluster_of(&self, asset: &str) -> Option<usize> {
        self.0
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == asset))
            .map(|(&id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.0.iter().map(|(&id, members)| (id, members.as_slice()))
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding: each new center is drawn with probability
/// proportional to its squared distance from the nearest chosen center.
fn seed_centers<R: Rng + ?Sized>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let mut centers = vec![points[rng.gen_range(0..points.len())].clone()];

    while centers.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest(p, &centers).1).collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // Every point already coincides with a center
            Err(_) => rng.gen_range(0..points.len()),
        };
        centers.push(points[next].clone());
    }

    centers
}

/// Label each point with one of `k` clusters (Lloyd iterations after k-means++ seeding).
///
/// `k` is clamped to 1..=points.len(). Empty input yields no labels.
pub(crate) fn kmeans<R: Rng + ?Sized>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<usize> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let dims = first.len();
    let k = k.clamp(1, points.len());
    let mut centers = seed_centers(points, k, rng);
    let mut labels = vec![usize::MAX; points.len()];

    for iteration in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (label, point) in labels.iter_mut().zip(points) {
            let (closest, _) = nearest(point, &centers);
            if *label != closest {
                *label = closest;
                changed = true;
            }
        }
        if !changed {
            tracing::debug!(iterations = iteration, k, "k-means converged");
            break;
        }

        for (c, center) in centers.iter_mut().enumerate() {
            let members: Vec<&Vec<f64>> = points
                .iter()
                .zip(&labels)
                .filter(|(_, &l)| l == c)
                .map(|(p, _)| p)
                .collect();
            // Empty clusters keep their previous center
            if members.is_empty() {
                continue;
            }
            for d in 0..dims {
                center[d] = members.iter().map(|p| p[d]).sum::<f64>() / members.len() as f64;
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{}", i)).collect()
    }

    #[test]
    fn test_kmeans_separates_groups() {
        let points = vec![
            vec![0.0, 0.1],
            vec![0.1, 0.0],
            vec![5.0, 5.1],
            vec![5.1, 5.0],
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let labels = kmeans(&points, 2, &mut rng);

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_single_cluster() {
        let points = vec![vec![1.0], vec![2.0], vec![3.0]];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(kmeans(&points, 1, &mut rng), vec![0, 0, 0]);
    }

    #[test]
    fn test_empty_input_and_out_of_range_k() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(kmeans(&[], 2, &mut rng).is_empty());

        let points = vec![vec![0.0], vec![10.0]];
        assert_eq!(kmeans(&points, 0, &mut rng), vec![0, 0]);
        let labels = kmeans(&points, 5, &mut rng);
        assert!(labels.iter().all(|&l| l < 2));
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_identical_points() {
        let points = vec![vec![1.0, 1.0]; 4];
        let mut rng = StdRng::seed_from_u64(7);
        let labels = kmeans(&points, 3, &mut rng);
        assert_eq!(labels.len(), 4);
        assert!(labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_from_labels_renumbers() {
        let assets = names(4);
        let clusters = AssetClusters::from_labels(&assets, &[2, 0, 2, 1]);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters.get(0), Some(&["A0".to_string(), "A2".to_string()][..]));
        assert_eq!(clusters.get(1), Some(&["A1".to_string()][..]));
        assert_eq!(clusters.cluster_of("A3"), Some(2));
        assert_eq!(clusters.cluster_of("missing"), None);
    }

    #[test]
    fn test_clusters_serialize_as_map() {
        let clusters = AssetClusters::from_labels(&names(2), &[0, 1]);
        let json = serde_json::to_value(&clusters).unwrap();
        assert_eq!(json["0"][0], "A0");
        assert_eq!(json["1"][0], "A1");
    }
}
