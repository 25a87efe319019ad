//! Pipeline configuration.
//!
//! The configuration is read from TOML:
//!
//! ```toml
//! threads = 4
//! output = "vectors.txt"
//!
//! [corpus]
//! bigram_file = "corpus.bigram"
//! top_words = 10000
//! extra_words_file = "extra.words"
//! kappa = 0.02
//!
//! [factorization]
//! rank = 50
//! gram = "outer"
//!
//! [model]
//! normalize = true
//!
//! [evaluation]
//! similarity_dir = "testsets/ws"
//! analogy_dir = "testsets/analogy"
//! analogy_sets = ["google"]
//! unigram_file = "corpus.unigram"
//! cut_point = 10000
//! ```
//!
//! Only `corpus.bigram_file` is required. Relative paths are resolved
//! against the directory of the configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

fn default_kappa() -> f32 {
    0.02
}

fn deserialize_top_words<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let top_words = Option::<i64>::deserialize(deserializer)?;
    Ok(top_words.and_then(|top_words| usize::try_from(top_words).ok()))
}

fn default_rank() -> usize {
    50
}

fn default_normalize() -> bool {
    true
}

/// Configuration of a pipeline run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub factorization: FactorizationConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Number of worker threads, rayon's default when absent.
    pub threads: Option<usize>,

    /// Write the word vectors to this file in text format.
    pub output: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    pub bigram_file: PathBuf,

    /// Keep only the most frequent words. All words are kept when the
    /// value is absent or negative.
    #[serde(default, deserialize_with = "deserialize_top_words")]
    pub top_words: Option<usize>,

    /// Words to keep regardless of their rank.
    pub extra_words_file: Option<PathBuf>,

    /// Smoothing strength.
    #[serde(default = "default_kappa")]
    pub kappa: f32,
}

/// Matrix that is factorized into word vectors.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GramMatrix {
    /// *G Gᵗ*
    Outer,

    /// *(G + Gᵗ) / 2*
    Symmetric,
}

impl Default for GramMatrix {
    fn default() -> Self {
        GramMatrix::Outer
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FactorizationConfig {
    /// Dimensionality of the word vectors.
    #[serde(default = "default_rank")]
    pub rank: usize,

    #[serde(default)]
    pub gram: GramMatrix,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        FactorizationConfig {
            rank: default_rank(),
            gram: GramMatrix::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Use cosine similarities rather than dot products.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            normalize: default_normalize(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    pub similarity_dir: Option<PathBuf>,

    /// Similarity test sets to read, all `*.txt` files when empty.
    #[serde(default)]
    pub similarity_sets: Vec<String>,

    pub analogy_dir: Option<PathBuf>,

    /// Analogy test sets to read, all `*.txt` files when empty.
    #[serde(default)]
    pub analogy_sets: Vec<String>,

    /// Unigram file used to classify absent words.
    pub unigram_file: Option<PathBuf>,

    /// Words ranked beyond this point in the unigram file are reported.
    pub cut_point: Option<usize>,
}

impl PipelineConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| Error::Format(format!("Cannot parse configuration: {}", e)))
    }

    /// Read a configuration file.
    ///
    /// Relative paths are resolved against the directory of the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml = fs::read_to_string(path)
            .map_err(|e| Error::read_error(format!("configuration {}", path.display()), e))?;

        let mut config = Self::from_toml(&toml)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        Ok(config)
    }

    /// Make relative paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.corpus.bigram_file);
        for path in [
            &mut self.corpus.extra_words_file,
            &mut self.output,
            &mut self.evaluation.similarity_dir,
            &mut self.evaluation.analogy_dir,
            &mut self.evaluation.unigram_file,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{GramMatrix, PipelineConfig};

    #[test]
    fn minimal_config_uses_defaults() {
        let config = PipelineConfig::from_toml("[corpus]\nbigram_file = \"toy.bigram\"\n").unwrap();
        assert_eq!(config.corpus.bigram_file, PathBuf::from("toy.bigram"));
        assert_eq!(config.corpus.top_words, None);
        assert_eq!(config.corpus.kappa, 0.02);
        assert_eq!(config.factorization.rank, 50);
        assert_eq!(config.factorization.gram, GramMatrix::Outer);
        assert!(config.model.normalize);
        assert!(config.evaluation.similarity_sets.is_empty());
        assert_eq!(config.threads, None);
    }

    #[test]
    fn reads_full_config() {
        let config = PipelineConfig::from_file("testdata/pipeline.toml").unwrap();
        assert_eq!(
            config.corpus.bigram_file,
            Path::new("testdata").join("toy.bigram")
        );
        assert_eq!(config.corpus.top_words, Some(12));
        assert_eq!(config.factorization.rank, 8);
        assert_eq!(config.factorization.gram, GramMatrix::Outer);
        assert_eq!(config.evaluation.cut_point, Some(10));
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn negative_top_words_keeps_all_words() {
        let config =
            PipelineConfig::from_toml("[corpus]\nbigram_file = \"toy.bigram\"\ntop_words = -1\n")
                .unwrap();
        assert_eq!(config.corpus.top_words, None);

        let config =
            PipelineConfig::from_toml("[corpus]\nbigram_file = \"toy.bigram\"\ntop_words = 5\n")
                .unwrap();
        assert_eq!(config.corpus.top_words, Some(5));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = "[corpus]\nbigram_file = \"toy.bigram\"\nkapa = 0.1\n";
        assert!(PipelineConfig::from_toml(toml).is_err());
        let toml = "[corpus]\nbigram_file = \"toy.bigram\"\n[factorization]\ngram = \"inner\"\n";
        assert!(PipelineConfig::from_toml(toml).is_err());
    }
}
