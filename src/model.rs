//! Word vector model with cached pairwise cosine similarities.

use std::sync::OnceLock;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, CowArray, Ix1, Zip};
use tracing::debug;

use crate::error::{Error, Result};
use crate::util::{l2_normalize_array, DEGENERATE_NORM};
use crate::vocab::{SimpleVocab, Vocab};

/// Word vectors with a vocabulary.
///
/// The model stores the raw vectors, their l2-normalized copies and
/// the original norms. When `normalize` is enabled, similarities are
/// cosine similarities. Otherwise, similarities are raw dot products.
///
/// The matrix of pairwise cosine similarities is computed on the first
/// `sim_row` query and reused afterwards.
#[derive(Debug)]
pub struct VectorModel {
    vocab: SimpleVocab,
    raw: Array2<f32>,
    normalized: Array2<f32>,
    norms: Array1<f32>,
    normalize: bool,
    cos_table: OnceLock<Array2<f32>>,
}

impl VectorModel {
    /// Construct a model from a vocabulary and one vector per word.
    pub fn new(vocab: SimpleVocab, raw: Array2<f32>, normalize: bool) -> Result<Self> {
        if vocab.len() != raw.nrows() {
            return Err(Error::Format(format!(
                "Vocabulary size {} does not match the number of vectors {}",
                vocab.len(),
                raw.nrows()
            )));
        }

        let mut normalized = raw.clone();
        let norms = l2_normalize_array(normalized.view_mut());

        Ok(VectorModel {
            vocab,
            raw,
            normalized,
            norms,
            normalize,
            cos_table: OnceLock::new(),
        })
    }

    /// Check whether the model has a vector for `word`.
    pub fn contains(&self, word: &str) -> bool {
        self.vocab.idx(word).is_some()
    }

    /// Get the raw vector of a word.
    pub fn embedding(&self, word: &str) -> Option<ArrayView1<f32>> {
        self.vocab.idx(word).map(|idx| self.raw.row(idx))
    }

    /// Get the l2-normalized vector of a word.
    ///
    /// Degenerate vectors are returned as zero vectors.
    pub fn normalized_embedding(&self, word: &str) -> Option<ArrayView1<f32>> {
        self.vocab.idx(word).map(|idx| self.normalized.row(idx))
    }

    /// Get the vector used for similarity queries, which depends on
    /// whether the model normalizes.
    pub fn lookup(&self, word: &str) -> Option<ArrayView1<f32>> {
        if self.normalize {
            self.normalized_embedding(word)
        } else {
            self.embedding(word)
        }
    }

    /// Similarity of two words.
    ///
    /// Returns `None` if either of the words is unknown. Returns zero
    /// if one of the vectors is degenerate.
    pub fn similarity(&self, x: &str, y: &str) -> Option<f32> {
        let ix = self.vocab.idx(x)?;
        let iy = self.vocab.idx(y)?;

        if self.normalize {
            if let Some(cos_table) = self.cos_table.get() {
                return Some(cos_table[[ix, iy]]);
            }

            return Some(self.normalized.row(ix).dot(&self.normalized.row(iy)));
        }

        if self.norms[ix] <= DEGENERATE_NORM || self.norms[iy] <= DEGENERATE_NORM {
            return Some(0.);
        }

        Some(self.raw.row(ix).dot(&self.raw.row(iy)))
    }

    /// Similarities of a word with every word in the vocabulary.
    ///
    /// With normalization, this is a row of the pairwise cosine matrix,
    /// which is computed by the first call.
    pub fn sim_row(&self, word: &str) -> Option<CowArray<f32, Ix1>> {
        let idx = self.vocab.idx(word)?;

        if self.normalize {
            return Some(self.cosine_table().row(idx).into());
        }

        if self.norms[idx] <= DEGENERATE_NORM {
            return Some(Array1::zeros(self.vocab.len()).into());
        }

        let mut row = self.raw.dot(&self.raw.row(idx));
        Zip::from(&mut row).and(&self.norms).for_each(|sim, &norm| {
            if norm <= DEGENERATE_NORM {
                *sim = 0.;
            }
        });

        Some(row.into())
    }

    /// Pairwise cosine similarities, computed at most once.
    pub fn cosine_table(&self) -> &Array2<f32> {
        self.cos_table.get_or_init(|| {
            debug!(
                "Precomputing {}x{} cosine matrix",
                self.vocab.len(),
                self.vocab.len()
            );
            self.normalized.dot(&self.normalized.t())
        })
    }

    pub fn vocab(&self) -> &SimpleVocab {
        &self.vocab
    }

    /// Raw vectors, one row per word.
    pub fn vectors(&self) -> ArrayView2<f32> {
        self.raw.view()
    }

    /// Norms of the raw vectors.
    pub fn norms(&self) -> ArrayView1<f32> {
        self.norms.view()
    }

    pub fn dims(&self) -> usize {
        self.raw.ncols()
    }

    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Decompose the model into its vocabulary and raw vectors.
    pub fn into_parts(self) -> (SimpleVocab, Array2<f32>) {
        (self.vocab, self.raw)
    }
}
