//! Seeded k-means on top of `linfa-clustering` (k-means++ init, best of N runs).
//!
//! Deterministic for a given seed: the same vectors always produce the same
//! assignment, so repeated analyses of an unchanged chat agree.

use std::collections::HashSet;

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::KMEANS_MAX_CLUSTERS;
use crate::{TopicsError, TopicsResult};

#[derive(Debug, Clone, Copy)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub restarts: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

/// `min(max(3, n / 20), min(12, n / 5))`. Zero below five points.
pub fn target_k(n: usize) -> usize {
    (n / 20).max(3).min(KMEANS_MAX_CLUSTERS.min(n / 5))
}

/// Cluster index per point. Every point is assigned; k-means has no noise.
pub fn fit(data: &Array2<f64>, params: KMeansParams) -> TopicsResult<Vec<Option<usize>>> {
    let n = data.nrows();
    let k = params.k;
    if k == 0 || k > n {
        return Err(TopicsError::InvalidInput(format!(
            "Cannot form {} clusters from {} points",
            k, n
        )));
    }
    // k-means++ cannot seed more centers than there are distinct points.
    let distinct = distinct_rows(data);
    if distinct < k {
        return Err(TopicsError::InvalidInput(format!(
            "Cannot form {} clusters from {} distinct points",
            k, distinct
        )));
    }

    let dataset = DatasetBase::from(data.clone());
    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(params.seed))
        .n_runs(params.restarts.max(1))
        .max_n_iterations(params.max_iterations as u64)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| TopicsError::InvalidInput(format!("k-means fit failed: {}", e)))?;

    let labels: Array1<usize> = model.predict(data);
    tracing::debug!(k, points = n, "k-means complete");
    Ok(labels.into_iter().map(Some).collect())
}

fn distinct_rows(data: &Array2<f64>) -> usize {
    data.rows()
        .into_iter()
        .map(|row| row.iter().map(|x| x.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len()
}
