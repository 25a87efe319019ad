//! Prelude exports the most commonly-used types and traits.

pub use crate::bigram::{read_bigram_corpus, BigramCorpus, BigramReader};

pub use crate::compat::testset::{AnalogyTestSet, SimilarityTestSet};

pub use crate::compat::text::{ReadTextDims, WriteTextDims};

pub use crate::compat::unigram::ReferenceVocab;

pub use crate::compat::word2vec::{ReadWord2Vec, WriteWord2Vec};

pub use crate::compat::Truncation;

pub use crate::config::PipelineConfig;

pub use crate::error::{Error, Result};

pub use crate::eval::{evaluate_analogy, evaluate_similarity, WordClassifier};

pub use crate::factorize::factorize;

pub use crate::model::VectorModel;

pub use crate::pipeline::Pipeline;

pub use crate::pmi::PmiMatrices;

pub use crate::similarity::{Analogy, SimilarityModel, WordSimilarity};

pub use crate::vocab::{SimpleVocab, Vocab};
