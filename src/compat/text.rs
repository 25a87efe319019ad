//! Reader and writer for the text embedding format.
//!
//! The data is preceded by a line with the shape of the embedding
//! matrix. Every following line contains a word and its vector
//! components, separated by spaces:
//!
//! ```text
//! 2 3
//! king 0.10000 0.20000 0.30000
//! queen 0.20000 0.10000 0.30000
//! ```
//!
//! The vectors can be read into a `VectorModel`:
//!
//! ```
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use pmivec::prelude::*;
//!
//! let mut reader = BufReader::new(File::open("testdata/embeddings.txt").unwrap());
//!
//! // The second argument specifies whether similarities are cosine
//! // similarities.
//! let model = VectorModel::read_text_dims(&mut reader, true).unwrap();
//!
//! let similarity = model.similarity("king", "queen");
//! ```

use std::io::{BufRead, Write};

use itertools::Itertools;
use ndarray::Array2;
use tracing::{debug, info};

use crate::compat::Truncation;
use crate::error::{Error, Result};
use crate::model::VectorModel;
use crate::util::LineReader;
use crate::vocab::{SimpleVocab, Vocab};

/// Method to construct a `VectorModel` from a text file with dimensions.
///
/// The text must contain as the first line the shape of the embedding
/// matrix:
///
/// *vocab_size n_components*
///
/// The remainder of the stream should contain one word embedding per line in
/// the following format:
///
/// *word0 component_1 component_2 ... component_n*
///
/// Reading ends at the first blank line or at the end of the stream.
/// The number of words read at that point must match the header.
pub trait ReadTextDims<R>
where
    Self: Sized,
    R: BufRead,
{
    /// Read all embeddings from the given buffered reader.
    fn read_text_dims(reader: &mut R, normalize: bool) -> Result<Self> {
        Self::read_text_dims_truncated(reader, &mut Truncation::default(), normalize)
    }

    /// Read the first `truncation.max_words` embeddings, plus the
    /// embeddings of the truncation's extra words.
    ///
    /// Extra words that were found are removed from the truncation.
    fn read_text_dims_truncated(
        reader: &mut R,
        truncation: &mut Truncation,
        normalize: bool,
    ) -> Result<Self>;
}

impl<R> ReadTextDims<R> for VectorModel
where
    R: BufRead,
{
    fn read_text_dims_truncated(
        reader: &mut R,
        truncation: &mut Truncation,
        normalize: bool,
    ) -> Result<Self> {
        let (vocab, matrix) = read_embeds(reader, truncation)?;
        VectorModel::new(vocab, matrix, normalize)
    }
}

fn read_embeds<R>(reader: R, truncation: &mut Truncation) -> Result<(SimpleVocab, Array2<f32>)>
where
    R: BufRead,
{
    let mut lines = LineReader::new(reader);

    let header = lines
        .next_line()?
        .ok_or_else(|| Error::malformed_line(1, "", "expected shape header"))?;
    let (n_words, dims) = parse_shape(&header)
        .ok_or_else(|| Error::malformed_line(1, &header, "expected shape header"))?;

    let max_words = truncation.max_words.map_or(n_words, |max| max.min(n_words));
    debug!("{} extra words", truncation.extra_words.len());

    let mut vocab = SimpleVocab::default();
    let mut data = Vec::with_capacity(max_words * dims);
    let mut n_read = 0;

    loop {
        let line = match lines.next_line()? {
            Some(line) => line,
            None => {
                check_word_count(n_words, n_read, lines.line_no() + 1)?;
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            check_word_count(n_words, n_read, lines.line_no())?;
            break;
        }

        let orig_idx = n_read;
        n_read += 1;

        let mut parts = line.split(' ').filter(|part| !part.is_empty());
        let word = match parts.next() {
            Some(word) => word,
            None => continue,
        };

        if orig_idx >= max_words && !truncation.extra_words.contains(word) {
            continue;
        }

        let n_components = data.len();
        for part in parts {
            data.push(part.parse::<f32>().map_err(|e| {
                Error::malformed_line(
                    lines.line_no(),
                    line,
                    format!("cannot parse vector component '{}': {}", part, e),
                )
            })?);
        }

        if data.len() - n_components != dims {
            return Err(Error::malformed_line(
                lines.line_no(),
                line,
                format!(
                    "expected {} components, got {}",
                    dims,
                    data.len() - n_components
                ),
            ));
        }

        if vocab.push(word).is_none() {
            return Err(Error::inconsistent(
                lines.line_no(),
                line,
                format!("duplicate word '{}'", word),
            ));
        }

        truncation.extra_words.remove(word);

        if n_read >= max_words && truncation.extra_words.is_empty() {
            break;
        }
    }

    info!("{} embeddings read, {} kept", n_read, vocab.len());

    let matrix = Array2::from_shape_vec((vocab.len(), dims), data)?;

    Ok((vocab, matrix))
}

fn check_word_count(declared: usize, read: usize, line_no: usize) -> Result<()> {
    if declared != read {
        return Err(Error::inconsistent(
            line_no,
            "",
            format!("{} words declared in header, but {} read", declared, read),
        ));
    }

    Ok(())
}

pub(crate) fn parse_shape(line: &str) -> Option<(usize, usize)> {
    let mut parts = line.split_whitespace();
    let n_words = parts.next()?.parse().ok()?;
    let dims = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some((n_words, dims))
}

/// Method to write a `VectorModel` to a text file.
///
/// The shape header is followed by one word and its raw vector per
/// line. Components are written with five decimals.
pub trait WriteTextDims<W>
where
    W: Write,
{
    /// Write the embeddings to the given writer.
    fn write_text_dims(&self, writer: &mut W) -> Result<()>;
}

impl<W> WriteTextDims<W> for VectorModel
where
    W: Write,
{
    fn write_text_dims(&self, write: &mut W) -> Result<()> {
        writeln!(write, "{} {}", self.vocab().len(), self.dims())
            .map_err(|e| Error::write_error("word embedding matrix shape", e))?;

        for (word, embed) in self.vocab().words().iter().zip(self.vectors().outer_iter()) {
            let embed_str = embed.iter().map(|v| format!("{:.5}", v)).join(" ");
            writeln!(write, "{} {}", word, embed_str)
                .map_err(|e| Error::write_error("word embedding", e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{BufReader, Cursor};

    use approx::assert_abs_diff_eq;
    use maplit::hashset;

    use super::{parse_shape, ReadTextDims, WriteTextDims};
    use crate::compat::Truncation;
    use crate::error::Error;
    use crate::model::VectorModel;
    use crate::vocab::Vocab;

    fn read_toy(truncation: &mut Truncation) -> VectorModel {
        let mut reader = BufReader::new(File::open("testdata/embeddings.txt").unwrap());
        VectorModel::read_text_dims_truncated(&mut reader, truncation, true).unwrap()
    }

    #[test]
    fn reads_all_embeddings() {
        let mut reader = BufReader::new(File::open("testdata/embeddings.txt").unwrap());
        let model = VectorModel::read_text_dims(&mut reader, true).unwrap();
        assert_eq!(model.vocab().len(), 5);
        assert_eq!(model.dims(), 3);
        assert!(model.contains("King"));
        assert!(model.contains("queen"));
    }

    #[test]
    fn truncation_keeps_exactly_max_words() {
        let mut truncation = Truncation {
            max_words: Some(2),
            ..Truncation::default()
        };
        let model = read_toy(&mut truncation);
        assert_eq!(model.vocab().words(), &["king", "queen"]);
    }

    #[test]
    fn truncation_keeps_extra_words() {
        let mut truncation = Truncation {
            max_words: Some(1),
            extra_words: hashset! {"woman".to_owned(), "unicorn".to_owned()},
        };
        let model = read_toy(&mut truncation);
        assert_eq!(model.vocab().words(), &["king", "woman"]);
        assert_eq!(truncation.extra_words, hashset! {"unicorn".to_owned()});

        let mut only_extra = Truncation {
            max_words: Some(0),
            extra_words: hashset! {"man".to_owned()},
        };
        let model = read_toy(&mut only_extra);
        assert_eq!(model.vocab().words(), &["man"]);
        assert!(only_extra.extra_words.is_empty());
    }

    #[test]
    fn word_count_mismatch_reports_blank_line() {
        let text = "3 2\na 1 2\nb 3 4\n\nc 5 6\n";
        let err = VectorModel::read_text_dims(&mut Cursor::new(text), true).unwrap_err();
        assert!(matches!(err, Error::Inconsistent { line: 4, .. }));
    }

    #[test]
    fn wrong_dimensionality_is_rejected() {
        let text = "2 2\na 1 2\nb 3\n";
        let err = VectorModel::read_text_dims(&mut Cursor::new(text), true).unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let err = VectorModel::read_text_dims(&mut Cursor::new("two 2\n"), true).unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 1, .. }));
        assert_eq!(parse_shape("3 10"), Some((3, 10)));
        assert_eq!(parse_shape("3 10 1"), None);
    }

    #[test]
    fn write_uses_five_decimals() {
        let text = "2 2\nx 0.5 -1\ny 0.123456 2\n";
        let model = VectorModel::read_text_dims(&mut Cursor::new(text), false).unwrap();

        let mut output = Vec::new();
        model.write_text_dims(&mut output).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "2 2\nx 0.50000 -1.00000\ny 0.12346 2.00000\n"
        );
    }

    #[test]
    fn written_embeddings_can_be_read() {
        let model = read_toy(&mut Truncation::default());
        let mut output = Vec::new();
        model.write_text_dims(&mut output).unwrap();

        let reread = VectorModel::read_text_dims(&mut Cursor::new(output), true).unwrap();
        assert_eq!(reread.vocab().words(), model.vocab().words());
        assert_abs_diff_eq!(
            reread.embedding("queen").unwrap(),
            model.embedding("queen").unwrap(),
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(reread.norms(), model.norms(), epsilon = 1e-4);
    }
}
