// DBSCAN over keyword features, via linfa-clustering.
//
// Each keyword contributes one row: either a single similarity scalar or a
// full embedding. Points with at least `min_points` neighbours (themselves
// included) within `epsilon` are cores; everything density-reachable from a
// core joins its cluster, the rest is noise.

use anyhow::Result;
use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label for points not reachable from any core point.
pub const NOISE_LABEL: i32 = -1;

/// DBSCAN neighbourhood parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DbscanParams {
    /// Maximum euclidean distance between neighbours
    pub epsilon: f64,
    /// Neighbours (including the point itself) needed to be a core point
    pub min_points: usize,
}

impl Default for DbscanParams {
    /// Untuned defaults: eps 0.5, five points per core.
    fn default() -> Self {
        Self {
            epsilon: 0.5,
            min_points: 5,
        }
    }
}

impl DbscanParams {
    /// Reject parameter combinations DBSCAN can't run with.
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            anyhow::bail!("DBSCAN epsilon must be a positive number, got {}", self.epsilon);
        }
        if self.min_points < 2 {
            anyhow::bail!(
                "DBSCAN min_points must be at least 2, got {}",
                self.min_points
            );
        }
        Ok(())
    }
}

/// Assigns cluster labels to feature vectors.
#[derive(Debug, Clone)]
pub struct DensityClusterer {
    params: DbscanParams,
}

impl DensityClusterer {
    pub fn new(params: DbscanParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> DbscanParams {
        self.params
    }

    /// Cluster `features`, returning one label per row in input order.
    ///
    /// Labels count up from 0 in discovery order; noise is `NOISE_LABEL`.
    /// Empty input gives empty output. All rows must share one dimension.
    pub fn cluster(&self, features: &[Vec<f64>]) -> Result<Vec<i32>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let data = to_matrix(features)?;

        let memberships = Dbscan::params(self.params.min_points)
            .tolerance(self.params.epsilon)
            .transform(&data)
            .map_err(|e| anyhow::anyhow!("DBSCAN failed: {}", e))?;

        let labels: Vec<i32> = memberships
            .iter()
            .map(|m| match m {
                Some(id) => *id as i32,
                None => NOISE_LABEL,
            })
            .collect();

        debug!(
            points = labels.len(),
            clusters = count_clusters(&labels),
            noise = labels.iter().filter(|&&l| l == NOISE_LABEL).count(),
            epsilon = self.params.epsilon,
            min_points = self.params.min_points,
            "DBSCAN complete"
        );

        Ok(labels)
    }

    /// Convenience for one scalar per keyword.
    pub fn cluster_scalars(&self, values: &[f64]) -> Result<Vec<i32>> {
        let rows: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();
        self.cluster(&rows)
    }
}

/// Stack rows into an `[n, dim]` matrix, rejecting ragged or non-finite input.
fn to_matrix(features: &[Vec<f64>]) -> Result<Array2<f64>> {
    let dim = features[0].len();
    if dim == 0 {
        anyhow::bail!("Cannot cluster zero-dimensional features");
    }

    let mut flat = Vec::with_capacity(features.len() * dim);
    for (i, row) in features.iter().enumerate() {
        if row.len() != dim {
            anyhow::bail!(
                "Feature {} has dimension {} but feature 0 has {}",
                i,
                row.len(),
                dim
            );
        }
        if row.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("Feature {} contains a non-finite value", i);
        }
        flat.extend_from_slice(row);
    }

    Array2::from_shape_vec((features.len(), dim), flat)
        .map_err(|e| anyhow::anyhow!("Failed to build feature matrix: {}", e))
}

/// Number of distinct non-noise labels.
pub fn count_clusters(labels: &[i32]) -> usize {
    let mut ids: Vec<i32> = labels.iter().copied().filter(|&l| l >= 0).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusterer(epsilon: f64, min_points: usize) -> DensityClusterer {
        DensityClusterer::new(DbscanParams {
            epsilon,
            min_points,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_input_gives_empty_labels() {
        let labels = DensityClusterer::new(DbscanParams::default())
            .unwrap()
            .cluster(&[])
            .unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_two_tight_pairs_form_two_clusters() {
        let labels = clusterer(0.5, 2)
            .cluster_scalars(&[0.0, 0.01, 5.0, 5.02])
            .unwrap();
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
        assert!(labels.iter().all(|&l| l != NOISE_LABEL));
    }

    #[test]
    fn test_labels_follow_discovery_order() {
        let labels = clusterer(0.5, 2)
            .cluster_scalars(&[5.0, 0.0, 5.02, 0.01])
            .unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_isolated_point_is_noise() {
        let labels = clusterer(0.5, 2)
            .cluster_scalars(&[0.0, 0.1, 42.0])
            .unwrap();
        assert_eq!(labels[2], NOISE_LABEL);
        assert_eq!(labels[0], labels[1]);
    }

    #[test]
    fn test_default_params_mark_small_sets_as_noise() {
        // Four points can never reach five neighbours
        let labels = DensityClusterer::new(DbscanParams::default())
            .unwrap()
            .cluster_scalars(&[0.1, 0.1, 0.1, 0.1])
            .unwrap();
        assert_eq!(labels, vec![NOISE_LABEL; 4]);
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let c = clusterer(0.3, 2);
        let input = vec![0.9, 0.85, 0.2, 0.25, 0.6];
        assert_eq!(
            c.cluster_scalars(&input).unwrap(),
            c.cluster_scalars(&input).unwrap()
        );
    }

    #[test]
    fn test_multi_dimensional_features() {
        let features = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![3.0, 3.0],
            vec![3.0, 3.1],
        ];
        let labels = clusterer(0.5, 2).cluster(&features).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_ragged_features_rejected() {
        let features = vec![vec![0.0, 1.0], vec![0.0]];
        let err = clusterer(0.5, 2).cluster(&features).unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn test_nan_feature_rejected() {
        assert!(clusterer(0.5, 2).cluster_scalars(&[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(DensityClusterer::new(DbscanParams {
            epsilon: 0.0,
            min_points: 5
        })
        .is_err());
        assert!(DensityClusterer::new(DbscanParams {
            epsilon: 0.5,
            min_points: 1
        })
        .is_err());
    }

    #[test]
    fn test_count_clusters_ignores_noise() {
        assert_eq!(count_clusters(&[0, 0, 1, -1, -1, 2]), 3);
        assert_eq!(count_clusters(&[-1, -1]), 0);
        assert_eq!(count_clusters(&[]), 0);
    }
}
