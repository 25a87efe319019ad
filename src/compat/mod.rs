//! Readers/writers for embedding, vocabulary, and test set files.

use std::collections::HashSet;

pub mod extra;

pub mod testset;

pub mod text;

pub mod unigram;

pub mod word2vec;

/// Vocabulary truncation applied while reading embeddings.
///
/// The first `max_words` words of a file are kept, all words when
/// `max_words` is `None`. Words in `extra_words` are kept regardless
/// of their position.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Truncation {
    pub max_words: Option<usize>,
    pub extra_words: HashSet<String>,
}
