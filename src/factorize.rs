//! Low-rank factorization of symmetric matrices.
//!
//! A symmetric positive semi-definite matrix *M* is approximated by
//! *V Vᵗ*, where *V* holds the eigenvectors of the `rank` largest
//! eigenvalues, each scaled by the square root of its eigenvalue.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::linalg::symmetric_eigen;

/// Rank-limited factorization *M ≈ V Vᵗ*.
#[derive(Clone, Debug)]
pub struct LowRankFactorization {
    factor: Array2<f32>,
    eigenvalues: Array1<f64>,
    eigenvectors: Array2<f64>,
}

impl LowRankFactorization {
    /// The factor `V`, one row per row of the decomposed matrix.
    pub fn factor(&self) -> &Array2<f32> {
        &self.factor
    }

    /// The kept eigenvalues in descending order.
    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    /// The kept eigenvectors, column `i` belongs to eigenvalue `i`.
    pub fn eigenvectors(&self) -> &Array2<f64> {
        &self.eigenvectors
    }

    pub fn rank(&self) -> usize {
        self.factor.ncols()
    }

    /// Reconstruct the approximation *V Vᵗ*.
    pub fn reconstruct(&self) -> Array2<f32> {
        self.factor.dot(&self.factor.t())
    }

    /// Give up ownership of the factor.
    pub fn into_factor(self) -> Array2<f32> {
        self.factor
    }
}

/// Factorize a symmetric matrix, keeping the `rank` largest eigenpairs.
///
/// Returns `Error::Rank` if `rank` exceeds the matrix dimensionality
/// and `Error::NegativeEigenvalue` if one of the kept eigenvalues is
/// negative. Negative eigenvalues are never clamped.
pub fn factorize(m: ArrayView2<f32>, rank: usize) -> Result<LowRankFactorization> {
    let dim = m.nrows();
    if rank > dim {
        return Err(Error::Rank { rank, dim });
    }

    let eigen = symmetric_eigen(m)?;

    // Eigenvalues are ascending, keep the last `rank` in reverse.
    let eigenvalues = eigen.eigenvalues.slice(s![dim - rank..;-1]).to_owned();
    let eigenvectors = eigen
        .eigenvectors
        .slice(s![.., dim - rank..;-1])
        .to_owned();

    if let Some((index, value)) = eigenvalues.iter().enumerate().find(|(_, v)| **v < 0.) {
        return Err(Error::NegativeEigenvalue {
            index,
            value: *value,
        });
    }

    debug!(
        "Largest eigenvalue: {:?}, smallest kept eigenvalue: {:?}",
        eigenvalues.iter().next(),
        eigenvalues.iter().last()
    );

    let mut factor = eigenvectors.clone();
    for (mut column, &value) in factor.axis_iter_mut(Axis(1)).zip(eigenvalues.iter()) {
        column *= value.sqrt();
    }

    info!("Factorized {}x{} matrix with rank {}", dim, dim, rank);

    Ok(LowRankFactorization {
        factor: factor.mapv(|v| v as f32),
        eigenvalues,
        eigenvectors,
    })
}
