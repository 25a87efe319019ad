//! Word embeddings from smoothed bigram PMI matrices.
//!
//! pmivec reads bigram co-occurrence counts, smooths them with the
//! unigram distribution, and factorizes the resulting PMI matrix into
//! low-dimensional word vectors. The vectors can be evaluated on word
//! similarity and analogy test sets.

pub mod bigram;

pub mod compat;

pub mod config;

pub mod error;

pub mod eval;

pub mod factorize;

pub mod linalg;

pub mod model;

pub mod pipeline;

pub mod pmi;

pub mod prelude;

pub mod similarity;

pub(crate) mod util;

pub mod vocab;
