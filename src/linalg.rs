//! Small dense linear algebra routines.

use faer::{Mat, Side};
use ndarray::{Array1, Array2, ArrayView2, Zip};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::error::{Error, Result};

const POWER_ITER_MAX: usize = 100;

const POWER_ITER_EPSILON: f64 = 1e-6;

/// Sum of absolute values, optionally weighted elementwise.
pub fn norm1(m: ArrayView2<f32>, weight: Option<ArrayView2<f32>>) -> f32 {
    match weight {
        Some(weight) => Zip::from(m)
            .and(weight)
            .fold(0., |acc, &m, &w| acc + (m * w).abs()),
        None => m.fold(0., |acc, v| acc + v.abs()),
    }
}

/// Frobenius norm, optionally weighted elementwise.
pub fn norm_f(m: ArrayView2<f32>, weight: Option<ArrayView2<f32>>) -> f32 {
    let sum = match weight {
        Some(weight) => Zip::from(m)
            .and(weight)
            .fold(0., |acc, &m, &w| acc + m * m * w),
        None => m.fold(0., |acc, v| acc + v * v),
    };

    sum.sqrt()
}

/// Symmetric part *(M + Mᵗ) / 2*.
pub fn sym(m: ArrayView2<f32>) -> Array2<f32> {
    (&m + &m.t()) / 2.
}

/// Skew-symmetric part *(M - Mᵗ) / 2*.
pub fn skew(m: ArrayView2<f32>) -> Array2<f32> {
    (&m - &m.t()) / 2.
}

/// Eigendecomposition of a symmetric matrix.
#[derive(Clone, Debug)]
pub struct SymmetricEigen {
    /// Eigenvalues in ascending order.
    pub eigenvalues: Array1<f64>,

    /// Eigenvectors, column `i` belongs to eigenvalue `i`.
    pub eigenvectors: Array2<f64>,
}

/// Compute all eigenpairs of a symmetric matrix.
///
/// The matrix is symmetrized before decomposition, so only its
/// symmetric part is decomposed. Returns `Error::NonFinite` if the
/// matrix contains infinite or NaN entries.
pub fn symmetric_eigen(m: ArrayView2<f32>) -> Result<SymmetricEigen> {
    let n = m.nrows();
    if m.ncols() != n {
        return Err(Error::Format(format!(
            "Cannot decompose a non-square {}x{} matrix",
            n,
            m.ncols()
        )));
    }

    if let Some(((row, col), _)) = m.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(Error::NonFinite { row, col });
    }

    let a = sym(m);
    let a = Mat::<f64>::from_fn(n, n, |i, j| f64::from(a[[i, j]]));

    // Eigenvalues are returned in non-decreasing order.
    let eigen = a.as_ref().selfadjoint_eigendecomposition(Side::Lower);
    let s = eigen.s().column_vector();
    let u = eigen.u();

    Ok(SymmetricEigen {
        eigenvalues: Array1::from_shape_fn(n, |i| s.read(i)),
        eigenvectors: Array2::from_shape_fn((n, n), |(i, j)| u.read(i, j)),
    })
}

/// Find the principal eigenpair by power iteration.
///
/// If the returned eigenvalue is negative, the left principal singular
/// vector is the negated eigenvector.
pub fn power_iteration(m: ArrayView2<f32>, seed: u64) -> (f64, Array1<f64>) {
    let m = m.mapv(f64::from);
    let mut rng = XorShiftRng::seed_from_u64(seed);

    let mut vec = (0..m.nrows()).map(|_| rng.gen::<f64>()).collect::<Array1<_>>();
    let mut old_vec = vec.clone();
    let mut magnitude = 0.;

    for i in 0..POWER_ITER_MAX {
        let mut next = m.dot(&vec);
        magnitude = next.dot(&next).sqrt();
        if magnitude == 0. {
            return (0., vec);
        }
        next /= magnitude;
        vec = next;

        if i % 2 == 1 {
            let diff = &vec - &old_vec;
            if diff.dot(&diff).sqrt() < POWER_ITER_EPSILON {
                break;
            }
            old_vec = vec.clone();
        }
    }

    let projected = m.dot(&vec);
    if projected.sum() / vec.sum() > 0. {
        (magnitude, vec)
    } else {
        (-magnitude, vec)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::{norm1, norm_f, power_iteration, skew, sym, symmetric_eigen};
    use crate::error::Error;

    #[test]
    fn norms() {
        let m = arr2(&[[1f32, -2.], [2., 0.]]);
        let w = arr2(&[[1f32, 0.5], [0., 1.]]);
        assert_abs_diff_eq!(norm1(m.view(), None), 5.);
        assert_abs_diff_eq!(norm1(m.view(), Some(w.view())), 2.);
        assert_abs_diff_eq!(norm_f(m.view(), None), 3.);
        assert_abs_diff_eq!(norm_f(m.view(), Some(w.view())), 3f32.sqrt());
    }

    #[test]
    fn sym_and_skew_add_up() {
        let m = arr2(&[[1f32, 2.], [4., 3.]]);
        assert_eq!(sym(m.view()), arr2(&[[1f32, 3.], [3., 3.]]));
        assert_eq!(skew(m.view()), arr2(&[[0f32, -1.], [1., 0.]]));
        assert_eq!(sym(m.view()) + skew(m.view()), m);
    }

    #[test]
    fn eigen_decomposition_reconstructs() {
        let m = arr2(&[[4f32, 1., 2.], [1., 3., 0.], [2., 0., 5.]]);
        let eigen = symmetric_eigen(m.view()).unwrap();

        for pair in eigen.eigenvalues.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        let vt_v = eigen.eigenvectors.t().dot(&eigen.eigenvectors);
        assert_abs_diff_eq!(vt_v, Array2::<f64>::eye(3), epsilon = 1e-10);

        let reconstructed = eigen
            .eigenvectors
            .dot(&Array2::from_diag(&eigen.eigenvalues))
            .dot(&eigen.eigenvectors.t());
        assert_abs_diff_eq!(reconstructed, m.mapv(f64::from), epsilon = 1e-5);
    }

    #[test]
    fn eigenvalues_of_diagonal_matrix() {
        let m = arr2(&[[3f32, 0.], [0., -1.]]);
        let eigen = symmetric_eigen(m.view()).unwrap();
        assert_abs_diff_eq!(eigen.eigenvalues, arr1(&[-1f64, 3.]), epsilon = 1e-12);
    }

    #[test]
    fn non_square_is_rejected() {
        assert!(symmetric_eigen(Array2::<f32>::zeros((2, 3)).view()).is_err());
    }

    #[test]
    fn non_finite_entries_are_rejected() {
        let m = arr2(&[[1f32, 0.], [f32::NEG_INFINITY, 1.]]);
        assert!(matches!(
            symmetric_eigen(m.view()).unwrap_err(),
            Error::NonFinite { row: 1, col: 0 }
        ));
    }

    #[test]
    fn larger_random_matrix_is_decomposed() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        let g = Array2::from_shape_fn((200, 50), |_| rng.gen_range(-1f32..1.));
        let m = g.dot(&g.t());

        let eigen = symmetric_eigen(m.view()).unwrap();
        for pair in eigen.eigenvalues.windows(2) {
            assert!(pair[0] <= pair[1]);
        }

        let reconstructed = eigen
            .eigenvectors
            .dot(&Array2::from_diag(&eigen.eigenvalues))
            .dot(&eigen.eigenvectors.t());
        assert_abs_diff_eq!(reconstructed, m.mapv(f64::from), epsilon = 1e-3);
    }

    #[test]
    fn power_iteration_finds_principal_eigenpair() {
        let m = arr2(&[[2f32, 1.], [1., 2.]]);
        let (eigenvalue, eigenvector) = power_iteration(m.view(), 42);
        assert_abs_diff_eq!(eigenvalue, 3., epsilon = 1e-4);
        let expected = 1. / 2f64.sqrt();
        assert_abs_diff_eq!(eigenvector[0].abs(), expected, epsilon = 1e-4);
        assert_abs_diff_eq!(eigenvector[1].abs(), expected, epsilon = 1e-4);
    }
}
