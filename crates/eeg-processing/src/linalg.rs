//! Matrix utilities for the ICA engine
//!
//! Storage is `ndarray` (row-major, contiguous). Eigen-decomposition and the
//! pseudo-inverse are delegated to `nalgebra`.

use eeg_core::{EegError, EegResult};
use nalgebra::{DMatrix, SymmetricEigen, SVD};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Eigenvalues (descending) with matching eigenvectors as columns
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub values: Array1<f64>,
    pub vectors: Array2<f64>,
}

/// Mean of every row
pub fn row_means(x: &ArrayView2<f64>) -> Array1<f64> {
    x.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(x.nrows()))
}

/// Subtract `means[i]` from row `i`
pub fn center_rows(x: &ArrayView2<f64>, means: &Array1<f64>) -> Array2<f64> {
    x - &means.view().insert_axis(Axis(1))
}

/// Covariance of row variables of an already centered matrix (divides by n)
pub fn covariance(centered: &Array2<f64>) -> Array2<f64> {
    let n = centered.ncols().max(1) as f64;
    centered.dot(&centered.t()) / n
}

/// Eigen-decomposition of a symmetric matrix, sorted by descending eigenvalue
pub fn symmetric_eigen(a: &Array2<f64>) -> EigenDecomposition {
    let n = a.nrows();
    let eigen = SymmetricEigen::new(to_dmatrix(a));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let values = Array1::from_iter(order.iter().map(|&i| eigen.eigenvalues[i]));
    // nalgebra stores eigenvectors as columns
    let vectors = Array2::from_shape_fn((n, n), |(row, col)| eigen.eigenvectors[(row, order[col])]);

    EigenDecomposition { values, vectors }
}

/// Moore-Penrose pseudo-inverse via SVD
pub fn pseudo_inverse(a: &Array2<f64>) -> EegResult<Array2<f64>> {
    let svd = SVD::new(to_dmatrix(a), true, true);

    let largest = svd.singular_values.iter().fold(0.0_f64, |acc, &s| acc.max(s));
    let eps = largest * f64::EPSILON * a.nrows().max(a.ncols()) as f64;

    let inverse = svd.pseudo_inverse(eps).map_err(|e| EegError::ProcessingError {
        message: format!("pseudo-inverse failed: {}", e),
    })?;

    Ok(from_dmatrix(&inverse))
}

/// Scale `v` to unit length, returning its original norm
pub fn normalize(v: &mut Array1<f64>) -> f64 {
    let norm = v.dot(v).sqrt();
    if norm > f64::MIN_POSITIVE {
        v.mapv_inplace(|x| x / norm);
    }
    norm
}

/// Gram-Schmidt: remove the components of `v` along each orthonormal
/// vector in `basis`
pub fn orthogonalize(v: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for b in basis {
        let projection = v.dot(b);
        v.scaled_add(-projection, b);
    }
}

/// Largest absolute element-wise difference
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (x, y)| acc.max((x - y).abs()))
}

fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
