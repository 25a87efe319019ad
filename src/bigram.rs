//! Streaming reader for bigram corpus files.
//!
//! A bigram corpus file consists of a header, a list of all words with
//! their unigram log-probabilities, and for every focus word a block of
//! neighbor frequencies:
//!
//! ```text
//! # 3 words, 12 occurrences
//! # <parameters>
//! # 10 bigram occurrences
//! Words:
//! the,6,-0.693\tcat,4,-1.099
//! sat,2,-1.792
//!
//! Bigrams:
//! 1,the,2,6,0
//! \tcat,3,-0.693\tsat,1,-1.792
//! 2,cat,1,4,0
//! \tthe,3,-0.288
//! ```
//!
//! Only the first `top_words` words and the words in an *extra words*
//! set are kept. Neighbor frequencies of a kept focus word are
//! collected into a dense row over the kept vocabulary; neighbors that
//! are not kept are dropped.
//!
//! ```no_run
//! use std::collections::HashSet;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use pmivec::bigram::read_bigram_corpus;
//!
//! let reader = BufReader::new(File::open("corpus.bigram").unwrap());
//! let corpus = read_bigram_corpus(reader, Some(10000), HashSet::new()).unwrap();
//! println!("{} words kept", corpus.counts.nrows());
//! ```

use std::collections::HashSet;
use std::io::BufRead;

use itertools::Itertools;
use ndarray::{Array1, Array2};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::util::LineReader;
use crate::vocab::{SimpleVocab, UnigramModel, Vocab};

/// Counts declared in the corpus header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CorpusHeader {
    /// Number of words in the whole corpus vocabulary.
    pub whole_vocab_size: usize,

    /// Number of token occurrences in the corpus.
    pub occurrences: u64,

    /// Number of bigram occurrences in the corpus.
    pub bigram_occurrences: u64,
}

/// Raw neighbor frequencies of a kept focus word.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusRow {
    /// Vocabulary index of the focus word.
    pub idx: usize,

    /// The focus word.
    pub word: String,

    /// Neighbor frequencies, indexed by the kept vocabulary.
    pub counts: Array1<f32>,
}

/// A fully read bigram corpus.
#[derive(Clone, Debug)]
pub struct BigramCorpus {
    pub header: CorpusHeader,

    /// The kept vocabulary.
    pub vocab: SimpleVocab,

    /// Unigram model over the kept vocabulary.
    pub unigrams: UnigramModel,

    /// Raw neighbor frequencies, one row per kept focus word.
    pub counts: Array2<f32>,

    /// Extra words that do not occur in the corpus.
    pub unknown_extra_words: HashSet<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    Header,
    Words,
    Bigrams,
    Done,
}

enum Block {
    Wanted { idx: usize, counts: Array1<f32> },
    Skipped,
}

/// Streaming bigram corpus reader.
///
/// The header and word list are read on construction. Afterwards,
/// `next_row` yields the rows of the kept focus words in file order.
pub struct BigramReader<R> {
    lines: LineReader<R>,
    stage: Stage,
    header: CorpusHeader,
    top_words: usize,
    vocab: SimpleVocab,
    unigrams: UnigramModel,
    extra_words: HashSet<String>,
    has_row: Vec<bool>,
    focus_words: HashSet<String>,
    n_rows: usize,
}

impl<R> BigramReader<R>
where
    R: BufRead,
{
    /// Construct a reader and read the header and word list.
    ///
    /// All words are kept when `top_words` is `None`. Words in
    /// `extra_words` are kept regardless of their rank.
    pub fn new(
        reader: R,
        top_words: Option<usize>,
        extra_words: HashSet<String>,
    ) -> Result<Self> {
        let mut reader = BigramReader {
            lines: LineReader::new(reader),
            stage: Stage::Header,
            header: CorpusHeader {
                whole_vocab_size: 0,
                occurrences: 0,
                bigram_occurrences: 0,
            },
            top_words: 0,
            vocab: SimpleVocab::default(),
            unigrams: UnigramModel::from_log_probs(Vec::new()),
            extra_words,
            has_row: Vec::new(),
            focus_words: HashSet::new(),
            n_rows: 0,
        };

        reader.read_header(top_words)?;
        reader.read_words()?;

        Ok(reader)
    }

    pub fn header(&self) -> &CorpusHeader {
        &self.header
    }

    /// The kept vocabulary.
    pub fn vocab(&self) -> &SimpleVocab {
        &self.vocab
    }

    /// Unigram model over the kept vocabulary.
    pub fn unigrams(&self) -> &UnigramModel {
        &self.unigrams
    }

    /// Number of the most recently read line.
    pub fn line_no(&self) -> usize {
        self.lines.line_no()
    }

    fn expect_line(&mut self, desc: &str) -> Result<String> {
        let line_no = self.lines.line_no() + 1;
        self.lines
            .next_line()?
            .ok_or_else(|| Error::malformed_line(line_no, "", desc))
    }

    fn read_header(&mut self, top_words: Option<usize>) -> Result<()> {
        debug_assert_eq!(self.stage, Stage::Header);

        let line = self.expect_line("expected word count header")?;
        let (whole_vocab_size, occurrences) = parse_word_count_header(&line).ok_or_else(|| {
            Error::malformed_line(self.lines.line_no(), &line, "expected word count header")
        })?;
        info!("Totally {} words", whole_vocab_size);

        // Training parameters, not used.
        self.expect_line("expected parameter line")?;

        let line = self.expect_line("expected bigram count header")?;
        let bigram_occurrences = parse_bigram_count_header(&line).ok_or_else(|| {
            Error::malformed_line(self.lines.line_no(), &line, "expected bigram count header")
        })?;

        let line = self.expect_line("expected 'Words:'")?;
        if !line.starts_with("Words:") {
            return Err(Error::malformed_line(
                self.lines.line_no(),
                line,
                "expected 'Words:'",
            ));
        }

        self.header = CorpusHeader {
            whole_vocab_size,
            occurrences,
            bigram_occurrences,
        };
        self.top_words = top_words.unwrap_or(whole_vocab_size);
        self.stage = Stage::Words;

        Ok(())
    }

    fn read_words(&mut self) -> Result<()> {
        debug_assert_eq!(self.stage, Stage::Words);

        let mut log_probs = Vec::new();
        let mut seen = HashSet::new();
        let mut n_words = 0;

        let line_no = loop {
            let line = match self.lines.next_line()? {
                Some(line) => line,
                None => break self.lines.line_no() + 1,
            };

            let line = line.trim_end();
            if line.is_empty() {
                break self.lines.line_no();
            }

            for field in line.split('\t') {
                let (word, _, log_prob) = split_triple(field).ok_or_else(|| {
                    Error::malformed_line(self.lines.line_no(), line, "expected word,freq,logprob")
                })?;

                if !seen.insert(word.to_owned()) {
                    return Err(Error::inconsistent(
                        self.lines.line_no(),
                        line,
                        format!("duplicate word '{}'", word),
                    ));
                }

                if n_words < self.top_words || self.extra_words.contains(word) {
                    let log_prob = log_prob.parse::<f32>().map_err(|e| {
                        Error::malformed_line(
                            self.lines.line_no(),
                            line,
                            format!("cannot parse log-probability '{}': {}", log_prob, e),
                        )
                    })?;

                    self.vocab.push(word);
                    log_probs.push(log_prob);
                }

                n_words += 1;
            }
        };

        if n_words != self.header.whole_vocab_size {
            return Err(Error::inconsistent(
                line_no,
                "",
                format!(
                    "{} words declared in header, but {} seen",
                    self.header.whole_vocab_size, n_words
                ),
            ));
        }

        info!(
            "{} words seen, top {} & {} extra to keep. {} kept",
            n_words,
            self.top_words,
            self.extra_words.len(),
            self.vocab.len()
        );

        self.unigrams = UnigramModel::from_log_probs(log_probs);
        if self.top_words < self.header.whole_vocab_size {
            self.unigrams.renormalize();
        }

        let line = self.expect_line("expected 'Bigrams:'")?;
        if !line.starts_with("Bigrams:") {
            return Err(Error::malformed_line(
                self.lines.line_no(),
                line,
                "expected 'Bigrams:'",
            ));
        }

        self.has_row = vec![false; self.vocab.len()];
        self.stage = Stage::Bigrams;

        Ok(())
    }

    /// Read the next row of a kept focus word.
    ///
    /// Returns `None` when the rows of all kept words were read or the
    /// end of the bigram block was reached.
    pub fn next_row(&mut self) -> Result<Option<FocusRow>> {
        while self.stage == Stage::Bigrams {
            if self.n_rows == self.vocab.len() {
                self.stage = Stage::Done;
                break;
            }

            let line = match self.lines.next_line()? {
                Some(line) => line,
                None => {
                    self.stage = Stage::Done;
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.stage = Stage::Done;
                break;
            }

            if trimmed.starts_with('#') {
                continue;
            }

            let (orig_id, word) = parse_focus_line(trimmed).ok_or_else(|| {
                Error::malformed_line(
                    self.lines.line_no(),
                    trimmed,
                    "expected origId,word,neighborCount,freq,cutoffFreq",
                )
            })?;

            if orig_id % 500 == 0 {
                debug!("Reading bigrams of focus word {}", orig_id);
            }

            if !self.focus_words.insert(word.to_owned()) {
                return Err(Error::inconsistent(
                    self.lines.line_no(),
                    trimmed,
                    format!("duplicate focus word '{}'", word),
                ));
            }

            let forced = self.extra_words.remove(word);
            let mut block = if orig_id <= self.top_words || forced {
                let idx = self.vocab.idx(word).ok_or_else(|| {
                    Error::inconsistent(
                        self.lines.line_no(),
                        trimmed,
                        format!("focus word '{}' is not in the word list", word),
                    )
                })?;

                Block::Wanted {
                    idx,
                    counts: Array1::zeros(self.vocab.len()),
                }
            } else {
                Block::Skipped
            };
            let word = word.to_owned();

            self.read_neighbors(&mut block)?;

            if let Block::Wanted { idx, counts } = block {
                self.has_row[idx] = true;
                self.n_rows += 1;
                return Ok(Some(FocusRow { idx, word, counts }));
            }
        }

        Ok(None)
    }

    fn read_neighbors(&mut self, block: &mut Block) -> Result<()> {
        while let Some(line) = self.lines.next_line()? {
            if line.starts_with('#') {
                continue;
            }

            if !line.starts_with('\t') {
                self.lines.push_back(line);
                break;
            }

            let counts = match block {
                Block::Wanted { counts, .. } => counts,
                Block::Skipped => continue,
            };

            for neighbor in line.trim().split('\t') {
                let (word, freq, _) = split_triple(neighbor).ok_or_else(|| {
                    Error::malformed_line(
                        self.lines.line_no(),
                        &line,
                        "expected word,freq,logprob",
                    )
                })?;

                if let Some(idx) = self.vocab.idx(word) {
                    let freq = freq.parse::<u64>().map_err(|e| {
                        Error::malformed_line(
                            self.lines.line_no(),
                            &line,
                            format!("cannot parse frequency '{}': {}", freq, e),
                        )
                    })?;
                    counts[idx] += freq as f32;
                }
            }
        }

        Ok(())
    }

    /// Finish reading, checking that every kept word has a row.
    ///
    /// Returns the vocabulary, the unigram model, and the extra words
    /// that do not occur in the corpus.
    pub fn finish(self) -> Result<(SimpleVocab, UnigramModel, HashSet<String>)> {
        if self.n_rows != self.vocab.len() {
            let missing = self
                .has_row
                .iter()
                .enumerate()
                .filter(|(_, &has_row)| !has_row)
                .filter_map(|(idx, _)| self.vocab.word(idx))
                .take(10)
                .join(", ");
            return Err(Error::inconsistent(
                self.lines.line_no() + 1,
                "",
                format!(
                    "{} kept words, but {} focus word rows read; missing: {}",
                    self.vocab.len(),
                    self.n_rows,
                    missing
                ),
            ));
        }

        if !self.extra_words.is_empty() {
            warn!(
                "{} extra words do not occur in the corpus: {}",
                self.extra_words.len(),
                self.extra_words.iter().sorted().take(10).join(", ")
            );
        }

        Ok((self.vocab, self.unigrams, self.extra_words))
    }
}

/// Read a bigram corpus into a dense matrix of raw neighbor frequencies.
///
/// Row `i` of the matrix holds the neighbor frequencies of the `i`-th
/// kept word. The load fails without a partial result on the first
/// malformed or inconsistent line.
pub fn read_bigram_corpus<R>(
    reader: R,
    top_words: Option<usize>,
    extra_words: HashSet<String>,
) -> Result<BigramCorpus>
where
    R: BufRead,
{
    let mut reader = BigramReader::new(reader, top_words, extra_words)?;
    let header = *reader.header();

    let n_words = reader.vocab().len();
    let mut counts = Array2::zeros((n_words, n_words));
    while let Some(row) = reader.next_row()? {
        counts.row_mut(row.idx).assign(&row.counts);
    }

    let (vocab, unigrams, unknown_extra_words) = reader.finish()?;

    Ok(BigramCorpus {
        header,
        vocab,
        unigrams,
        counts,
        unknown_extra_words,
    })
}

fn parse_word_count_header(line: &str) -> Option<(usize, u64)> {
    let (words, occurrences) = line.strip_prefix("# ")?.split_once(" words, ")?;
    let occurrences = occurrences.trim_end().strip_suffix(" occurrences")?;
    Some((words.parse().ok()?, occurrences.parse().ok()?))
}

fn parse_bigram_count_header(line: &str) -> Option<u64> {
    line.strip_prefix("# ")?
        .trim_end()
        .strip_suffix(" bigram occurrences")?
        .parse()
        .ok()
}

/// Split `word,freq,logprob`. Words may contain commas.
fn split_triple(field: &str) -> Option<(&str, &str, &str)> {
    let mut parts = field.rsplitn(3, ',');
    let log_prob = parts.next()?;
    let freq = parts.next()?;
    let word = parts.next()?;
    if word.is_empty() {
        return None;
    }

    Some((word, freq, log_prob))
}

/// Parse `origId,word,neighborCount,freq,cutoffFreq`.
fn parse_focus_line(line: &str) -> Option<(usize, &str)> {
    let (orig_id, rest) = line.split_once(',')?;
    let mut parts = rest.rsplitn(4, ',');
    let _cutoff_freq = parts.next()?;
    let _freq = parts.next()?;
    let _neighbor_count = parts.next()?;
    let word = parts.next()?;
    if word.is_empty() {
        return None;
    }

    Some((orig_id.parse().ok()?, word))
}
