//! Matrix plumbing shared by both clustering methods.

use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;

use crate::{TopicsError, TopicsResult};

/// Stack embedding rows into an `n × dim` matrix.
/// Fails on ragged rows, zero-dimension vectors, or non-finite values.
pub fn to_matrix(vectors: &[Vec<f32>]) -> TopicsResult<Array2<f64>> {
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    if dim == 0 {
        return Err(TopicsError::InvalidInput("Empty embedding vectors".into()));
    }

    let mut data = Array2::zeros((vectors.len(), dim));
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dim {
            return Err(TopicsError::InvalidInput(format!(
                "Ragged embeddings: row {} has {} dimensions, expected {}",
                i,
                vector.len(),
                dim
            )));
        }
        for (j, &val) in vector.iter().enumerate() {
            if !val.is_finite() {
                return Err(TopicsError::InvalidInput(format!(
                    "Non-finite value at row {}, column {}",
                    i, j
                )));
            }
            data[[i, j]] = val as f64;
        }
    }
    Ok(data)
}

/// Zero mean, unit variance per column. Constant columns are only centered.
pub fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows() as f64;
    let mut scaled = data.clone();
    if data.nrows() == 0 {
        return scaled;
    }

    for mut column in scaled.axis_iter_mut(Axis(1)) {
        let mean = column.sum() / n;
        let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std > 1e-12 { std } else { 1.0 };
        column.mapv_inplace(|x| (x - mean) / scale);
    }
    scaled
}

pub fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Full symmetric distance matrix, rows computed in parallel.
pub fn pairwise_distances(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let row_i = data.row(i);
            (0..n).map(|j| euclidean(row_i, data.row(j))).collect()
        })
        .collect();
    Array2::from_shape_fn((n, n), |(i, j)| rows[i][j])
}
