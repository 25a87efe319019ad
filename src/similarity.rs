//! Traits and trait implementations for similarity queries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{ArrayView1, CowArray, Ix1};
use ordered_float::NotNan;

use crate::model::VectorModel;
use crate::vocab::Vocab;

/// Score assigned to the query words of an analogy, so that they are
/// never predicted.
pub const QUERY_WORD_SCORE: f32 = -10000.;

/// Similarity queries that evaluation relies on.
pub trait SimilarityModel {
    /// Check whether the model has a vector for `word`.
    fn contains(&self, word: &str) -> bool {
        self.idx(word).is_some()
    }

    /// Get the index of a word.
    fn idx(&self, word: &str) -> Option<usize>;

    /// Get the word at an index.
    fn word(&self, idx: usize) -> Option<&str>;

    /// Get the l2-normalized vector of a word.
    fn normalized_embedding(&self, word: &str) -> Option<ArrayView1<f32>>;

    /// Similarity of two words, `None` if either is unknown.
    fn similarity(&self, x: &str, y: &str) -> Option<f32>;

    /// Similarities of a word with every word of the model, ordered by
    /// word index.
    fn sim_row(&self, word: &str) -> Option<CowArray<f32, Ix1>>;
}

impl SimilarityModel for VectorModel {
    fn contains(&self, word: &str) -> bool {
        VectorModel::contains(self, word)
    }

    fn idx(&self, word: &str) -> Option<usize> {
        self.vocab().idx(word)
    }

    fn word(&self, idx: usize) -> Option<&str> {
        self.vocab().word(idx)
    }

    fn normalized_embedding(&self, word: &str) -> Option<ArrayView1<f32>> {
        VectorModel::normalized_embedding(self, word)
    }

    fn similarity(&self, x: &str, y: &str) -> Option<f32> {
        VectorModel::similarity(self, x, y)
    }

    fn sim_row(&self, word: &str) -> Option<CowArray<f32, Ix1>> {
        VectorModel::sim_row(self, word)
    }
}

/// Trait for analogy queries.
pub trait Analogy {
    /// Predict the answer to the analogy query `a` is to `a2` as `b` is
    /// to `?`.
    ///
    /// The prediction is the word maximizing
    ///
    /// *sim(·, a2) - sim(·, a) + sim(·, b)*
    ///
    /// The query words themselves are excluded. `Result::Err` is
    /// returned when one or more of the query words are unknown,
    /// indicating which of the words were present.
    fn predict_analogy(&self, query: [&str; 3]) -> Result<&str, [bool; 3]>;
}

impl<M> Analogy for M
where
    M: SimilarityModel,
{
    fn predict_analogy(&self, query: [&str; 3]) -> Result<&str, [bool; 3]> {
        let [a, a2, b] = query;
        let (sims_a, sims_a2, sims_b) = match (self.sim_row(a), self.sim_row(a2), self.sim_row(b)) {
            (Some(sims_a), Some(sims_a2), Some(sims_b)) => (sims_a, sims_a2, sims_b),
            (sims_a, sims_a2, sims_b) => {
                return Err([sims_a.is_some(), sims_a2.is_some(), sims_b.is_some()])
            }
        };

        let mut scores = &sims_a2 - &sims_a + &sims_b;
        for word in &query {
            if let Some(idx) = self.idx(word) {
                scores[idx] = QUERY_WORD_SCORE;
            }
        }

        let best = nan_argmax(scores.view()).ok_or([true, true, true])?;
        self.word(best).ok_or([true, true, true])
    }
}

/// Index of the first maximum, ignoring NaN.
fn nan_argmax(scores: ArrayView1<f32>) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter_map(|(idx, &score)| NotNan::new(score).ok().map(|score| (idx, score)))
        .fold(None, |best: Option<(usize, NotNan<f32>)>, (idx, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((idx, score)),
        })
        .map(|(idx, _)| idx)
}

/// A word with its similarity.
///
/// This data structure is used to store a pair consisting of a word and
/// its similarity to a query word.
#[derive(Debug, Eq, PartialEq)]
pub struct WordSimilarityResult<'a> {
    similarity: NotNan<f32>,
    word: &'a str,
}

impl<'a> WordSimilarityResult<'a> {
    pub fn similarity(&self) -> f32 {
        *self.similarity
    }

    pub fn word(&self) -> &str {
        self.word
    }
}

impl<'a> Ord for WordSimilarityResult<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.similarity.cmp(&self.similarity) {
            Ordering::Equal => self.word.cmp(other.word),
            ordering => ordering,
        }
    }
}

impl<'a> PartialOrd for WordSimilarityResult<'a> {
    fn partial_cmp(&self, other: &WordSimilarityResult) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Trait for nearest-neighbor queries.
pub trait WordSimilarity {
    /// Find the `limit` words that are most similar to the query word.
    ///
    /// The query word itself is excluded. Returns `None` if the query
    /// word is unknown.
    fn word_similarity(&self, word: &str, limit: usize) -> Option<Vec<WordSimilarityResult>>;
}

impl<M> WordSimilarity for M
where
    M: SimilarityModel,
{
    fn word_similarity(&self, word: &str, limit: usize) -> Option<Vec<WordSimilarityResult>> {
        let query_idx = self.idx(word)?;
        let sims = self.sim_row(word)?;

        let mut results = BinaryHeap::with_capacity(limit);
        for (idx, &sim) in sims.iter().enumerate() {
            if idx == query_idx {
                continue;
            }

            let similarity = match NotNan::new(sim) {
                Ok(similarity) => similarity,
                Err(_) => continue,
            };

            let word = match self.word(idx) {
                Some(word) => word,
                None => continue,
            };

            let word_similarity = WordSimilarityResult { word, similarity };

            if results.len() < limit {
                results.push(word_similarity);
            } else if let Some(mut peek) = results.peek_mut() {
                if word_similarity < *peek {
                    *peek = word_similarity
                }
            }
        }

        Some(results.into_sorted_vec())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    use super::{nan_argmax, Analogy, WordSimilarity};
    use crate::model::VectorModel;
    use crate::vocab::SimpleVocab;

    fn royalty_model() -> VectorModel {
        // Dimensions: royalty, gender, noise.
        let vocab = SimpleVocab::new(vec![
            "king".to_owned(),
            "man".to_owned(),
            "woman".to_owned(),
            "queen".to_owned(),
            "apple".to_owned(),
        ]);
        let vectors = arr2(&[
            [1f32, 1., 0.1],
            [0., 1., 0.1],
            [0., -1., 0.1],
            [1., -1., 0.1],
            [0., 0., 1.],
        ]);
        VectorModel::new(vocab, vectors, true).unwrap()
    }

    #[test]
    fn analogy_predicts_queen() {
        let model = royalty_model();
        assert_eq!(model.predict_analogy(["man", "king", "woman"]), Ok("queen"));
        assert_eq!(model.predict_analogy(["king", "man", "queen"]), Ok("woman"));
    }

    #[test]
    fn analogy_reports_unknown_words() {
        let model = royalty_model();
        assert_eq!(
            model.predict_analogy(["man", "prince", "woman"]),
            Err([true, false, true])
        );
        assert_eq!(
            model.predict_analogy(["a", "b", "c"]),
            Err([false, false, false])
        );
    }

    #[test]
    fn argmax_skips_nan_and_takes_first_maximum() {
        assert_eq!(nan_argmax(arr1(&[f32::NAN, 1., 3., 3.]).view()), Some(2));
        assert_eq!(nan_argmax(arr1(&[f32::NAN]).view()), None);
    }

    #[test]
    fn nearest_neighbors_are_sorted() {
        let model = royalty_model();
        let results = model.word_similarity("king", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].word(), "man");
        assert!(results[0].similarity() >= results[1].similarity());
        assert_abs_diff_eq!(
            results[0].similarity(),
            model.similarity("king", "man").unwrap(),
            epsilon = 1e-6
        );
        assert!(model.word_similarity("prince", 2).is_none());
    }
}
