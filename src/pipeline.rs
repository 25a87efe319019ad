//! Batch pipeline from a bigram corpus to evaluated word vectors.
//!
//! The pipeline reads a bigram corpus, builds the smoothed PMI matrix,
//! factorizes its Gram matrix, and evaluates the resulting vectors on
//! word similarity and analogy test sets.
//!
//! ```no_run
//! use pmivec::config::PipelineConfig;
//! use pmivec::pipeline::Pipeline;
//!
//! let config = PipelineConfig::from_file("pipeline.toml").unwrap();
//! let output = Pipeline::new(config).run().unwrap();
//! for score in &output.similarity.unwrap().scores {
//!     println!("{}: {:.5}", score.name, score.score);
//! }
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use ndarray::Array2;
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use crate::bigram::{read_bigram_corpus, BigramCorpus};
use crate::compat::extra::read_extra_words;
use crate::compat::testset::{read_test_sets, AnalogyTestSet, SimilarityTestSet};
use crate::compat::text::WriteTextDims;
use crate::compat::unigram::ReferenceVocab;
use crate::config::{GramMatrix, PipelineConfig};
use crate::error::{Error, Result};
use crate::eval::{evaluate_analogy, evaluate_similarity, Evaluation, WordClassifier};
use crate::factorize::factorize;
use crate::linalg::sym;
use crate::model::VectorModel;
use crate::pmi::PmiMatrices;

/// Results of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub model: VectorModel,

    /// Kept eigenvalues in descending order.
    pub eigenvalues: Vec<f64>,

    /// Extra words that do not occur in the corpus.
    pub unknown_extra_words: HashSet<String>,

    pub similarity: Option<Evaluation>,

    pub analogy: Option<Evaluation>,
}

/// Batch driver for corpus reading, factorization, and evaluation.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline.
    ///
    /// If the configuration sets the number of threads, the pipeline
    /// runs in a dedicated thread pool of that size.
    pub fn run(&self) -> Result<PipelineOutput> {
        match self.config.threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Format(format!("Cannot build thread pool: {}", e)))?;
                pool.install(|| self.run_stages())
            }
            None => self.run_stages(),
        }
    }

    fn run_stages(&self) -> Result<PipelineOutput> {
        let (model, eigenvalues, unknown_extra_words) = self.build_model()?;

        if let Some(output) = &self.config.output {
            write_model(&model, output)?;
        }

        let reference = self.read_reference()?;
        let classifier = WordClassifier::new(reference.as_ref(), self.config.evaluation.cut_point);

        let similarity = match &self.config.evaluation.similarity_dir {
            Some(dir) => {
                let test_sets: Vec<SimilarityTestSet> =
                    read_test_sets(dir, &self.config.evaluation.similarity_sets)?;
                Some(evaluate_similarity(&model, &test_sets, classifier))
            }
            None => None,
        };

        let analogy = match &self.config.evaluation.analogy_dir {
            Some(dir) => {
                let test_sets: Vec<AnalogyTestSet> =
                    read_test_sets(dir, &self.config.evaluation.analogy_sets)?;
                Some(evaluate_analogy(&model, &test_sets, classifier))
            }
            None => None,
        };

        Ok(PipelineOutput {
            model,
            eigenvalues,
            unknown_extra_words,
            similarity,
            analogy,
        })
    }

    /// Read the corpus and factorize its PMI matrix.
    fn build_model(&self) -> Result<(VectorModel, Vec<f64>, HashSet<String>)> {
        let corpus_config = &self.config.corpus;

        let extra_words = match &corpus_config.extra_words_file {
            Some(path) => read_extra_words(open(path, "extra words file")?)?,
            None => HashSet::new(),
        };

        let timer = Instant::now();
        let BigramCorpus {
            vocab,
            unigrams,
            counts,
            unknown_extra_words,
            ..
        } = read_bigram_corpus(
            open(&corpus_config.bigram_file, "bigram file")?,
            corpus_config.top_words,
            extra_words,
        )?;
        info!("Read bigram corpus in {:.3}s", timer.elapsed().as_secs_f64());

        if !unknown_extra_words.is_empty() {
            warn!(
                "{} extra words do not occur in the corpus",
                unknown_extra_words.len()
            );
        }

        let timer = Instant::now();
        let matrices = PmiMatrices::from_counts(counts, &unigrams, corpus_config.kappa)?;
        let gram = gram_matrix(&matrices, self.config.factorization.gram);
        info!("Built Gram matrix in {:.3}s", timer.elapsed().as_secs_f64());

        let timer = Instant::now();
        let factorization = factorize(gram.view(), self.config.factorization.rank)?;
        info!("Factorized in {:.3}s", timer.elapsed().as_secs_f64());

        let eigenvalues = factorization.eigenvalues().to_vec();
        let model = VectorModel::new(
            vocab,
            factorization.into_factor(),
            self.config.model.normalize,
        )?;

        Ok((model, eigenvalues, unknown_extra_words))
    }

    fn read_reference(&self) -> Result<Option<ReferenceVocab>> {
        self.config
            .evaluation
            .unigram_file
            .as_ref()
            .map(|path| ReferenceVocab::read(open(path, "unigram file")?))
            .transpose()
    }
}

fn gram_matrix(matrices: &PmiMatrices, gram: GramMatrix) -> Array2<f32> {
    match gram {
        GramMatrix::Outer => matrices.g.dot(&matrices.g.t()),
        GramMatrix::Symmetric => sym(matrices.g.view()),
    }
}

fn open(path: &Path, desc: &str) -> Result<BufReader<File>> {
    let f = File::open(path)
        .map_err(|e| Error::read_error(format!("{} {}", desc, path.display()), e))?;
    Ok(BufReader::new(f))
}

fn write_model(model: &VectorModel, path: &Path) -> Result<()> {
    info!("Writing word vectors to {}", path.display());
    let f = File::create(path)
        .map_err(|e| Error::write_error(format!("word vectors {}", path.display()), e))?;
    let mut writer = BufWriter::new(f);
    model.write_text_dims(&mut writer)?;
    writer
        .flush()
        .map_err(|e| Error::write_error(format!("word vectors {}", path.display()), e))
}
