//! Word similarity and analogy evaluation.
//!
//! Similarity test sets are scored by the Spearman rank correlation
//! between model similarities and gold scores. Analogy test sets are
//! scored by the accuracy of the additive analogy method.
//!
//! Words that are absent from the model never abort an evaluation.
//! They are recorded in [`AbsentWords`], optionally classified with a
//! [`ReferenceVocab`].

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2};
use ndarray_stats::CorrelationExt;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::compat::testset::{AnalogyTestSet, SimilarityTestSet};
use crate::compat::unigram::ReferenceVocab;
use crate::similarity::{Analogy, SimilarityModel};

const PROGRESS_INTERVAL: usize = 500;

/// Words that were missing from the model or ranked beyond a cut point.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AbsentWords {
    /// Words in the reference vocabulary but not in the model, by rank.
    pub absent_from_model: BTreeMap<usize, String>,

    /// Words that are neither in the model nor in the reference
    /// vocabulary.
    pub absent_from_vocab: BTreeSet<String>,

    /// Words with a reference rank beyond the cut point. These words
    /// may or may not be in the model.
    pub beyond_cut: BTreeSet<String>,
}

impl AbsentWords {
    pub fn is_empty(&self) -> bool {
        self.absent_from_model.is_empty()
            && self.absent_from_vocab.is_empty()
            && self.beyond_cut.is_empty()
    }

    /// Add the words recorded in `other`.
    pub fn merge(&mut self, other: AbsentWords) {
        self.absent_from_model.extend(other.absent_from_model);
        self.absent_from_vocab.extend(other.absent_from_vocab);
        self.beyond_cut.extend(other.beyond_cut);
    }
}

/// Reference vocabulary and cut point used to classify words.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordClassifier<'a> {
    reference: Option<&'a ReferenceVocab>,
    cut_point: Option<usize>,
}

impl<'a> WordClassifier<'a> {
    /// Construct a classifier.
    ///
    /// Words with a reference rank larger than `cut_point` are recorded
    /// as beyond the cut point. A cut point of zero disables this.
    pub fn new(reference: Option<&'a ReferenceVocab>, cut_point: Option<usize>) -> Self {
        WordClassifier {
            reference,
            cut_point: cut_point.filter(|&cut_point| cut_point > 0),
        }
    }

    /// Record a word beyond the cut point, returns whether it was.
    fn check_cut(&self, word: &str, absent: &mut AbsentWords) -> bool {
        let rank = match self.reference.and_then(|reference| reference.rank(word)) {
            Some(rank) => rank,
            None => return false,
        };

        match self.cut_point {
            Some(cut_point) if rank > cut_point => {
                absent.beyond_cut.insert(word.to_owned());
                true
            }
            _ => false,
        }
    }

    /// Record a word that is absent from the model.
    fn record_absent(&self, word: &str, absent: &mut AbsentWords) {
        match self.reference.and_then(|reference| reference.rank(word)) {
            Some(rank) => {
                absent.absent_from_model.insert(rank, word.to_owned());
            }
            None => {
                absent.absent_from_vocab.insert(word.to_owned());
            }
        }
    }
}

/// Score of a single test set.
#[derive(Clone, Debug, PartialEq)]
pub struct TestSetScore {
    pub name: String,

    /// Number of items in the test set.
    pub total: usize,

    /// Number of items that could be evaluated.
    pub valid: usize,

    /// Spearman coefficient or analogy accuracy.
    pub score: f64,
}

/// Scores of a collection of test sets with the words that were absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    /// Scores in test set order.
    pub scores: Vec<TestSetScore>,
    pub absent: AbsentWords,
}

impl Evaluation {
    fn from_results(results: Vec<(TestSetScore, AbsentWords)>) -> Self {
        let mut evaluation = Evaluation::default();
        for (score, absent) in results {
            evaluation.scores.push(score);
            evaluation.absent.merge(absent);
        }

        evaluation
    }
}

/// Running analogy accuracy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AnalogyTally {
    pub correct: usize,
    pub valid: usize,
}

impl AnalogyTally {
    pub fn record(&mut self, correct: bool) {
        self.valid += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Accuracy over the valid items so far, zero without valid items.
    pub fn running_score(&self) -> f64 {
        if self.valid == 0 {
            0.
        } else {
            self.correct as f64 / self.valid as f64
        }
    }
}

/// Evaluate a model on similarity test sets.
///
/// Test sets are evaluated in parallel.
pub fn evaluate_similarity<M>(
    model: &M,
    test_sets: &[SimilarityTestSet],
    classifier: WordClassifier,
) -> Evaluation
where
    M: SimilarityModel + Sync,
{
    let results = test_sets
        .par_iter()
        .map(|test_set| evaluate_similarity_set(model, test_set, classifier))
        .collect();

    Evaluation::from_results(results)
}

fn evaluate_similarity_set<M>(
    model: &M,
    test_set: &SimilarityTestSet,
    classifier: WordClassifier,
) -> (TestSetScore, AbsentWords)
where
    M: SimilarityModel,
{
    let mut absent = AbsentWords::default();
    let mut model_sims = Vec::with_capacity(test_set.len());
    let mut gold_sims = Vec::with_capacity(test_set.len());

    for pair in test_set.items() {
        let mut valid = true;
        for word in [&pair.x, &pair.y] {
            classifier.check_cut(word, &mut absent);
            if !model.contains(word) {
                classifier.record_absent(word, &mut absent);
                valid = false;
            }
        }

        if !valid {
            continue;
        }

        if let Some(sim) = model.similarity(&pair.x, &pair.y) {
            model_sims.push(sim);
            gold_sims.push(pair.gold);
        }
    }

    let score = TestSetScore {
        name: test_set.name().to_owned(),
        total: test_set.len(),
        valid: model_sims.len(),
        score: spearman(&model_sims, &gold_sims),
    };

    info!(
        "{}: {} test pairs, {} valid, {:.5}",
        score.name, score.total, score.valid, score.score
    );

    (score, absent)
}

/// Evaluate a model on analogy test sets.
///
/// Test sets are evaluated in parallel. An analogy is valid when `a`,
/// `a2`, and `b` are in the model, `b2` does not have to be.
pub fn evaluate_analogy<M>(
    model: &M,
    test_sets: &[AnalogyTestSet],
    classifier: WordClassifier,
) -> Evaluation
where
    M: SimilarityModel + Sync,
{
    let results = test_sets
        .par_iter()
        .map(|test_set| evaluate_analogy_set(model, test_set, classifier))
        .collect();

    Evaluation::from_results(results)
}

fn evaluate_analogy_set<M>(
    model: &M,
    test_set: &AnalogyTestSet,
    classifier: WordClassifier,
) -> (TestSetScore, AbsentWords)
where
    M: SimilarityModel,
{
    let mut absent = AbsentWords::default();
    let mut tally = AnalogyTally::default();

    for (idx, question) in test_set.items().iter().enumerate() {
        let mut watch_when_wrong = false;
        for word in question.words() {
            watch_when_wrong |= classifier.check_cut(word, &mut absent);
            if !model.contains(word) {
                classifier.record_absent(word, &mut absent);
            }
        }

        if let Ok(predicted) = model.predict_analogy([&question.a, &question.a2, &question.b]) {
            let correct = predicted == question.b2;
            tally.record(correct);

            if !correct && watch_when_wrong {
                debug!(
                    "{}~{} = {}~{},{:.3} ({},{:.3})",
                    question.a,
                    question.a2,
                    question.b,
                    question.b2,
                    model.similarity(&question.b, &question.b2).unwrap_or(0.),
                    predicted,
                    model.similarity(&question.b, predicted).unwrap_or(0.)
                );
            }
        }

        if (idx + 1) % PROGRESS_INTERVAL == 0 {
            debug!(
                "{}/{}/{}: {:.5}",
                idx + 1,
                tally.valid,
                test_set.len(),
                tally.running_score()
            );
        }
    }

    let score = TestSetScore {
        name: test_set.name().to_owned(),
        total: test_set.len(),
        valid: tally.valid,
        score: tally.running_score(),
    };

    info!(
        "{}: {} analogies, {} valid. AddSim Score: {:.5}",
        score.name, score.total, score.valid, score.score
    );

    (score, absent)
}

/// Spearman rank correlation coefficient.
///
/// Tied values get their average rank. Returns NaN if there are fewer
/// than two observations or one of the variables is constant.
///
/// # Panics
///
/// Panics if `x` and `y` have different lengths.
pub fn spearman(x: &[f32], y: &[f32]) -> f64 {
    assert_eq!(x.len(), y.len(), "Variables have different lengths");

    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }

    let mut ranks = Array2::zeros((2, n));
    ranks.row_mut(0).assign(&average_ranks(x));
    ranks.row_mut(1).assign(&average_ranks(y));

    match ranks.pearson_correlation() {
        Ok(correlation) => correlation[[0, 1]],
        Err(_) => f64::NAN,
    }
}

/// 1-based ranks, tied values get the average of their ranks.
fn average_ranks(values: &[f32]) -> Array1<f64> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by_key(|&idx| OrderedFloat(values[idx]));

    let mut ranks = Array1::zeros(values.len());
    let mut start = 0;
    while start < order.len() {
        let value = OrderedFloat(values[order[start]]);
        let end = start
            + order[start..]
                .iter()
                .take_while(|&&idx| OrderedFloat(values[idx]) == value)
                .count();

        let rank = (start + end + 1) as f64 / 2.;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }

        start = end;
    }

    ranks
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::BufReader;

    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    use super::{
        average_ranks, evaluate_analogy, evaluate_similarity, spearman, AnalogyTally,
        WordClassifier,
    };
    use crate::compat::testset::{
        AnalogyQuestion, AnalogyTestSet, SimilarityPair, SimilarityTestSet,
    };
    use crate::compat::unigram::ReferenceVocab;
    use crate::model::VectorModel;
    use crate::vocab::SimpleVocab;

    fn pair(x: &str, y: &str, gold: f32) -> SimilarityPair {
        SimilarityPair {
            x: x.to_owned(),
            y: y.to_owned(),
            gold,
        }
    }

    fn question(words: [&str; 4]) -> AnalogyQuestion {
        AnalogyQuestion {
            a: words[0].to_owned(),
            a2: words[1].to_owned(),
            b: words[2].to_owned(),
            b2: words[3].to_owned(),
        }
    }

    fn reference() -> ReferenceVocab {
        ReferenceVocab::read(BufReader::new(File::open("testdata/toy.unigram").unwrap())).unwrap()
    }

    /// Model with sim(cat, dog) = 0.8 and sim(cat, car) = 0.1.
    fn pets_model() -> VectorModel {
        let vocab = SimpleVocab::new(vec!["cat".to_owned(), "dog".to_owned(), "car".to_owned()]);
        let vectors = arr2(&[
            [1f32, 0.],
            [0.8, 0.6],
            [0.1, 0.99498744],
        ]);
        VectorModel::new(vocab, vectors, true).unwrap()
    }

    fn royalty_model() -> VectorModel {
        let vocab = SimpleVocab::new(vec![
            "king".to_owned(),
            "man".to_owned(),
            "woman".to_owned(),
            "queen".to_owned(),
        ]);
        let vectors = arr2(&[[1f32, 1., 0.1], [0., 1., 0.1], [0., -1., 0.1], [1., -1., 0.1]]);
        VectorModel::new(vocab, vectors, true).unwrap()
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(
            average_ranks(&[0.5, 0.1, 0.5, 0.9]),
            arr1(&[2.5f64, 1., 2.5, 4.])
        );
    }

    #[test]
    fn spearman_of_monotonic_relation_is_one() {
        assert_abs_diff_eq!(spearman(&[0.8, 0.1], &[0.9, 0.05]), 1., epsilon = 1e-9);
        assert_abs_diff_eq!(spearman(&[1., 2., 3.], &[30., 20., 10.]), -1., epsilon = 1e-9);
        assert!(spearman(&[1.], &[2.]).is_nan());
    }

    #[test]
    #[should_panic]
    fn spearman_panics_on_length_mismatch() {
        spearman(&[1., 2.], &[1.]);
    }

    #[test]
    fn similarity_evaluation_excludes_oov_pairs() {
        let model = pets_model();
        let test_set = SimilarityTestSet::new(
            "pets",
            vec![
                pair("cat", "dog", 0.9),
                pair("cat", "car", 0.05),
                pair("cat", "zebra", 0.5),
                pair("unicorn", "pony", 0.7),
            ],
        );
        let reference = reference();

        let evaluation = evaluate_similarity(
            &model,
            &[test_set],
            WordClassifier::new(Some(&reference), None),
        );

        let score = &evaluation.scores[0];
        assert_eq!(score.total, 4);
        assert_eq!(score.valid, 2);
        assert_abs_diff_eq!(score.score, 1., epsilon = 1e-6);

        let absent = &evaluation.absent;
        assert_eq!(absent.absent_from_model.get(&18).map(String::as_str), Some("zebra"));
        assert!(absent.absent_from_vocab.contains("unicorn"));
        assert!(absent.absent_from_vocab.contains("pony"));
        assert!(absent.beyond_cut.is_empty());
    }

    #[test]
    fn cut_point_records_low_ranked_words() {
        let model = pets_model();
        let test_set = SimilarityTestSet::new("pets", vec![pair("cat", "dog", 0.9)]);
        let reference = reference();

        let evaluation = evaluate_similarity(
            &model,
            &[test_set],
            WordClassifier::new(Some(&reference), Some(5)),
        );

        // cat is ranked 10, dog is ranked 3.
        assert!(evaluation.absent.beyond_cut.contains("cat"));
        assert!(!evaluation.absent.beyond_cut.contains("dog"));
    }

    #[test]
    fn analogy_evaluation_counts_valid_items() {
        let model = royalty_model();
        let test_set = AnalogyTestSet::new(
            "royalty",
            vec![
                question(["man", "king", "woman", "queen"]),
                question(["king", "man", "queen", "woman"]),
                question(["man", "woman", "king", "prince"]),
                question(["cat", "dog", "king", "queen"]),
            ],
        );

        let evaluation = evaluate_analogy(&model, &[test_set], WordClassifier::default());
        let score = &evaluation.scores[0];
        assert_eq!(score.total, 4);
        assert_eq!(score.valid, 3);
        assert_abs_diff_eq!(score.score, 2. / 3.);
        assert!(evaluation.absent.absent_from_vocab.contains("prince"));
        assert!(evaluation.absent.absent_from_vocab.contains("cat"));
    }

    #[test]
    fn test_sets_are_scored_in_order() {
        let model = royalty_model();
        let test_sets = vec![
            AnalogyTestSet::new("first", vec![question(["man", "king", "woman", "queen"])]),
            AnalogyTestSet::new("second", vec![question(["a", "b", "c", "d"])]),
        ];
        let evaluation = evaluate_analogy(&model, &test_sets, WordClassifier::default());
        assert_eq!(evaluation.scores[0].name, "first");
        assert_eq!(evaluation.scores[1].name, "second");
        assert_eq!(evaluation.scores[1].valid, 0);
        assert_eq!(evaluation.scores[1].score, 0.);
    }

    #[test]
    fn tally_tracks_running_score() {
        let mut tally = AnalogyTally::default();
        assert_eq!(tally.running_score(), 0.);
        tally.record(true);
        tally.record(false);
        assert_abs_diff_eq!(tally.running_score(), 0.5);
    }
}
