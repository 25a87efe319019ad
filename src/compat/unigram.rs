//! Reference vocabulary from a unigram file.
//!
//! Each line of a unigram file contains a word, its frequency, and its
//! unigram log-probability, separated by tabs. Lines starting with `#`
//! are comments. Words are ranked by their order in the file, starting
//! at 1.

use std::collections::HashMap;
use std::io::BufRead;

use tracing::info;

use crate::error::{Error, Result};
use crate::util::LineReader;

/// Entry of the reference vocabulary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceEntry {
    /// 1-based rank of the word.
    pub rank: usize,
    pub freq: u64,
    pub log_prob: f32,
}

/// Vocabulary that a model's vocabulary is typically a subset of.
///
/// Used to find out why a word is absent from a model: either it was
/// ranked too low to be kept, or it is not known at all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceVocab {
    entries: HashMap<String, ReferenceEntry>,
}

impl ReferenceVocab {
    /// Read a reference vocabulary from a unigram file.
    pub fn read<R>(reader: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut lines = LineReader::new(reader);
        let mut entries = HashMap::new();

        while let Some(line) = lines.next_line()? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let (word, freq, log_prob) = match (fields.next(), fields.next(), fields.next()) {
                (Some(word), Some(freq), Some(log_prob)) => (word, freq, log_prob),
                _ => {
                    return Err(Error::malformed_line(
                        lines.line_no(),
                        line,
                        "expected word, frequency, and log-probability",
                    ))
                }
            };

            let freq = freq.parse().map_err(|e| {
                Error::malformed_line(lines.line_no(), line, format!("invalid frequency: {}", e))
            })?;
            let log_prob = log_prob.parse().map_err(|e| {
                Error::malformed_line(
                    lines.line_no(),
                    line,
                    format!("invalid log-probability: {}", e),
                )
            })?;

            let rank = entries.len() + 1;
            if entries
                .insert(
                    word.to_owned(),
                    ReferenceEntry {
                        rank,
                        freq,
                        log_prob,
                    },
                )
                .is_some()
            {
                return Err(Error::inconsistent(
                    lines.line_no(),
                    line,
                    format!("duplicate word '{}'", word),
                ));
            }
        }

        info!("{} words in reference vocabulary", entries.len());

        Ok(ReferenceVocab { entries })
    }

    pub fn get(&self, word: &str) -> Option<&ReferenceEntry> {
        self.entries.get(word)
    }

    /// Get the 1-based rank of a word.
    pub fn rank(&self, word: &str) -> Option<usize> {
        self.entries.get(word).map(|entry| entry.rank)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
