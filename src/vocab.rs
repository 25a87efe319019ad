//! Vocabularies and unigram models.

use std::collections::HashMap;

use ndarray::Array1;

/// Embedding vocabularies.
pub trait Vocab {
    /// Get the index of a token.
    fn idx(&self, word: &str) -> Option<usize>;

    /// Get the number of words in the vocabulary.
    fn len(&self) -> usize;

    /// Check whether the vocabulary is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the words in the vocabulary.
    fn words(&self) -> &[String];
}

/// Vocabulary with dense indices in insertion order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimpleVocab {
    indices: HashMap<String, usize>,
    words: Vec<String>,
}

impl SimpleVocab {
    /// Construct a new simple vocabulary.
    ///
    /// Words are assigned indices in the given order.
    ///
    /// Panics when there are duplicate words.
    pub fn new(words: impl Into<Vec<String>>) -> Self {
        let words = words.into();
        let mut indices = HashMap::with_capacity(words.len());
        for (idx, word) in words.iter().enumerate() {
            indices.insert(word.clone(), idx);
        }
        assert_eq!(
            words.len(),
            indices.len(),
            "words contained duplicate entries."
        );
        SimpleVocab { words, indices }
    }

    /// Append a word, assigning it the next free index.
    ///
    /// Returns `None` if the word is already in the vocabulary.
    pub fn push(&mut self, word: impl Into<String>) -> Option<usize> {
        let word = word.into();
        if self.indices.contains_key(&word) {
            return None;
        }

        let idx = self.words.len();
        self.indices.insert(word.clone(), idx);
        self.words.push(word);
        Some(idx)
    }

    /// Get the word at the given index.
    pub fn word(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }
}

impl Vocab for SimpleVocab {
    fn idx(&self, word: &str) -> Option<usize> {
        self.indices.get(word).cloned()
    }

    fn len(&self) -> usize {
        self.words.len()
    }

    fn words(&self) -> &[String] {
        &self.words
    }
}

/// Unigram distribution over a vocabulary.
///
/// Stores both the probabilities `u` and their natural logarithms
/// `log_u`, indexed by vocabulary index.
#[derive(Clone, Debug, PartialEq)]
pub struct UnigramModel {
    probs: Array1<f32>,
    log_probs: Array1<f32>,
}

impl UnigramModel {
    /// Construct the model from unigram log-probabilities.
    pub fn from_log_probs(log_probs: impl Into<Array1<f32>>) -> Self {
        let log_probs = log_probs.into();
        let probs = log_probs.mapv(f32::exp);
        UnigramModel { probs, log_probs }
    }

    /// Rescale the probabilities so that they sum to one.
    ///
    /// This is required when the vocabulary is a strict subset of the
    /// vocabulary that the probabilities were estimated on.
    pub fn renormalize(&mut self) {
        let probs = self.probs.mapv(f64::from);
        let sum = probs.sum();
        self.probs = probs.mapv(|p| (p / sum) as f32);
        self.log_probs = probs.mapv(|p| (p / sum).ln() as f32);
    }

    /// Unigram probabilities `u`.
    pub fn probs(&self) -> &Array1<f32> {
        &self.probs
    }

    /// Unigram log-probabilities `log_u`.
    pub fn log_probs(&self) -> &Array1<f32> {
        &self.log_probs
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}
