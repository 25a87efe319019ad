//! Smoothed co-occurrence and PMI matrices.
//!
//! Every raw neighbor-frequency row `x` is smoothed with the unigram
//! distribution `u`:
//!
//! *x' = x + (‖x‖₁ κ) u*
//!
//! The smoothed row is stored in `F`. The corresponding row of the PMI
//! matrix `G` is *log(x' / sum(x')) - log u*.

use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};
use tracing::{debug, info};

use crate::bigram::{BigramCorpus, FocusRow};
use crate::error::{Error, Result};
use crate::vocab::UnigramModel;

/// Smoothed frequency matrix `F` and PMI matrix `G`.
#[derive(Clone, Debug)]
pub struct PmiMatrices {
    /// Smoothed neighbor frequencies.
    pub f: Array2<f32>,

    /// Smoothed PMI values.
    pub g: Array2<f32>,
}

impl PmiMatrices {
    /// Build `F` and `G` from a bigram corpus.
    ///
    /// Rows are smoothed in parallel. The raw count matrix of the corpus
    /// is reused as `F`.
    pub fn from_corpus(corpus: BigramCorpus, kappa: f32) -> Result<Self> {
        Self::from_counts(corpus.counts, &corpus.unigrams, kappa)
    }

    /// Build `F` and `G` from a raw neighbor-frequency matrix.
    pub fn from_counts(counts: Array2<f32>, unigrams: &UnigramModel, kappa: f32) -> Result<Self> {
        check_dims(&counts, unigrams)?;

        let k_u = unigrams.probs() * kappa;
        let log_u = unigrams.log_probs();

        let mut f = counts;
        let mut g = Array2::zeros(f.raw_dim());

        f.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(g.axis_iter_mut(Axis(0)))
            .enumerate()
            .try_for_each(|(row, (mut f_row, g_row))| {
                smooth_row(f_row.view_mut(), k_u.view());
                pmi_row(row, f_row.view(), log_u.view(), g_row)
            })?;

        info!("Built {}x{} PMI matrix, kappa: {}", f.nrows(), f.ncols(), kappa);

        Ok(PmiMatrices { f, g })
    }
}

fn check_dims(counts: &Array2<f32>, unigrams: &UnigramModel) -> Result<()> {
    if counts.nrows() != counts.ncols() || counts.ncols() != unigrams.len() {
        return Err(Error::Format(format!(
            "Count matrix shape {:?} does not match unigram model of length {}",
            counts.shape(),
            unigrams.len()
        )));
    }

    Ok(())
}

/// Incremental builder of `F` and `G`.
///
/// This builder consumes the rows of a `BigramReader` one at a time.
pub struct PmiBuilder {
    k_u: Array1<f32>,
    log_u: Array1<f32>,
    f: Array2<f32>,
    g: Array2<f32>,
}

impl PmiBuilder {
    pub fn new(unigrams: &UnigramModel, kappa: f32) -> Self {
        let n = unigrams.len();
        PmiBuilder {
            k_u: unigrams.probs() * kappa,
            log_u: unigrams.log_probs().clone(),
            f: Array2::zeros((n, n)),
            g: Array2::zeros((n, n)),
        }
    }

    /// Smooth a raw row and add it to the matrices.
    pub fn add_row(&mut self, row: FocusRow) -> Result<()> {
        let FocusRow { idx, mut counts, .. } = row;
        if idx >= self.f.nrows() || counts.len() != self.f.ncols() {
            return Err(Error::Format(format!(
                "Row {} of length {} does not fit a {}x{} matrix",
                idx,
                counts.len(),
                self.f.nrows(),
                self.f.ncols()
            )));
        }

        smooth_row(counts.view_mut(), self.k_u.view());
        pmi_row(
            idx,
            counts.view(),
            self.log_u.view(),
            self.g.row_mut(idx),
        )?;
        self.f.row_mut(idx).assign(&counts);

        Ok(())
    }

    pub fn into_matrices(self) -> PmiMatrices {
        PmiMatrices {
            f: self.f,
            g: self.g,
        }
    }
}

/// Additive smoothing: *x += ‖x‖₁ k_u*, where *k_u = κ u*.
pub fn smooth_row(mut x: ArrayViewMut1<f32>, k_u: ArrayView1<f32>) {
    let norm1 = x.fold(0f32, |acc, v| acc + v.abs());
    x.scaled_add(norm1, &k_u);
}

/// Compute the PMI row *log(x / sum(x)) - log_u*.
pub fn pmi_row(
    row: usize,
    x: ArrayView1<f32>,
    log_u: ArrayView1<f32>,
    g: ArrayViewMut1<f32>,
) -> Result<()> {
    let sum = x.sum();
    if !(sum > 0.) {
        return Err(Error::ZeroSumRow { row });
    }

    Zip::from(g)
        .and(x)
        .and(log_u)
        .for_each(|g, &x, &log_u| *g = (x / sum).ln() - log_u);

    Ok(())
}

/// Find a cut point for clipping large frequencies.
///
/// Starting from `a[[0, 0]]`, candidate cut points are divided by
/// three while they are at least 10. Returns the smallest candidate
/// such that at least `fraction` of the elements are at or above it,
/// or `a[[0, 0]]` if no candidate qualifies.
pub fn quantile_cut(a: ArrayView2<f32>, fraction: f32) -> f32 {
    if a.is_empty() {
        return 0.;
    }

    let n_elems = a.len() as f32;
    let mut cut_point = a[[0, 0]];
    let mut ideal_cut_point = cut_point;

    while cut_point >= 10. {
        let n_above = a.iter().filter(|&&v| v >= cut_point).count();
        debug!("Cut point {:.0}: {}", cut_point, n_above);
        if n_above as f32 >= n_elems * fraction {
            ideal_cut_point = cut_point;
        }
        cut_point /= 3.;
    }

    ideal_cut_point
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs::File;
    use std::io::BufReader;

    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    use super::{quantile_cut, PmiBuilder, PmiMatrices};
    use crate::bigram::{read_bigram_corpus, BigramReader};
    use crate::error::Error;
    use crate::vocab::UnigramModel;

    fn toy_reader() -> BufReader<File> {
        BufReader::new(File::open("testdata/toy.bigram").unwrap())
    }

    #[test]
    fn smoothing_follows_unigrams() {
        let unigrams = UnigramModel::from_log_probs(arr1(&[0.5f32.ln(), 0.25f32.ln(), 0.25f32.ln()]));
        let counts = arr2(&[[0f32, 2., 2.], [4., 0., 0.], [1., 1., 0.]]);
        let matrices = PmiMatrices::from_counts(counts, &unigrams, 0.5).unwrap();

        // ‖x‖₁ = 4, κ = 0.5: x + 2u.
        assert_abs_diff_eq!(matrices.f.row(0), arr1(&[1f32, 2.5, 2.5]), epsilon = 1e-5);
        assert_abs_diff_eq!(matrices.f.row(2), arr1(&[1.5f32, 1.25, 0.25]), epsilon = 1e-5);

        let expected = (1f32 / 6.).ln() - 0.5f32.ln();
        assert_abs_diff_eq!(matrices.g[[0, 0]], expected, epsilon = 1e-5);
    }

    #[test]
    fn kappa_zero_is_identity() {
        let corpus = read_bigram_corpus(toy_reader(), None, HashSet::new()).unwrap();
        let counts = corpus.counts.clone();
        let matrices = PmiMatrices::from_corpus(corpus, 0.).unwrap();
        assert_eq!(matrices.f, counts);
    }

    #[test]
    fn smoothed_rows_are_positive_and_finite() {
        let corpus = read_bigram_corpus(toy_reader(), Some(10), HashSet::new()).unwrap();
        let matrices = PmiMatrices::from_corpus(corpus, 0.02).unwrap();
        for (f_row, g_row) in matrices.f.outer_iter().zip(matrices.g.outer_iter()) {
            assert!(f_row.sum() > 0.);
            assert!(f_row.iter().all(|&v| v > 0.));
            assert!(g_row.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn incremental_builder_matches_batch() {
        let mut reader = BigramReader::new(toy_reader(), Some(8), HashSet::new()).unwrap();
        let mut builder = PmiBuilder::new(reader.unigrams(), 0.1);
        while let Some(row) = reader.next_row().unwrap() {
            builder.add_row(row).unwrap();
        }
        let incremental = builder.into_matrices();

        let corpus = read_bigram_corpus(toy_reader(), Some(8), HashSet::new()).unwrap();
        let batch = PmiMatrices::from_corpus(corpus, 0.1).unwrap();

        assert_abs_diff_eq!(incremental.f, batch.f, epsilon = 1e-5);
        assert_abs_diff_eq!(incremental.g, batch.g, epsilon = 1e-5);
    }

    #[test]
    fn zero_row_is_a_numeric_error() {
        let unigrams = UnigramModel::from_log_probs(arr1(&[0.5f32.ln(), 0.5f32.ln()]));
        let counts = arr2(&[[1f32, 1.], [0., 0.]]);
        let err = PmiMatrices::from_counts(counts, &unigrams, 0.1).unwrap_err();
        assert!(matches!(err, Error::ZeroSumRow { row: 1 }));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let unigrams = UnigramModel::from_log_probs(arr1(&[0f32]));
        let counts = Array2::<f32>::ones((2, 2));
        assert!(PmiMatrices::from_counts(counts, &unigrams, 0.1).is_err());
    }

    #[test]
    fn quantile_cut_picks_smallest_qualifying_cut() {
        let a = arr2(&[[270f32, 90.], [30., 1.]]);
        // Cut points: 270 (1 element), 90 (2), 30 (3), 10 (3).
        assert_eq!(quantile_cut(a.view(), 0.5), 10.);
        assert_eq!(quantile_cut(a.view(), 0.8), 270.);
    }
}
