//! Reader and writer for the word2vec binary format.
//!
//! The format has a text header with the shape of the embedding
//! matrix. Each embedding is stored as the word, a space, and the
//! little-endian `f32` components. Embeddings are read as follows:
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use pmivec::prelude::*;
//!
//! let mut reader = BufReader::new(File::open("vectors.bin").unwrap());
//!
//! // Read the embeddings.
//! let model = VectorModel::read_word2vec_binary(&mut reader, true)
//!     .unwrap();
//!
//! // Look up an embedding.
//! let embedding = model.embedding("Berlin");
//! ```
//!
//! A capitalized word is stored under its lowercased form, unless the
//! lowercased form was read before.

use std::io::{BufRead, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;
use tracing::{debug, info};

use crate::compat::text::parse_shape;
use crate::compat::Truncation;
use crate::error::{Error, Result};
use crate::model::VectorModel;
use crate::util::read_string;
use crate::vocab::{SimpleVocab, Vocab};

/// Method to construct a `VectorModel` from a word2vec binary file.
pub trait ReadWord2Vec<R>
where
    Self: Sized,
    R: BufRead,
{
    /// Read all embeddings from the given buffered reader.
    fn read_word2vec_binary(reader: &mut R, normalize: bool) -> Result<Self> {
        Self::read_word2vec_binary_truncated(reader, &mut Truncation::default(), normalize)
    }

    /// Read the first `truncation.max_words` embeddings, plus the
    /// embeddings of the truncation's extra words.
    ///
    /// Extra words that were found are removed from the truncation.
    fn read_word2vec_binary_truncated(
        reader: &mut R,
        truncation: &mut Truncation,
        normalize: bool,
    ) -> Result<Self>;
}

impl<R> ReadWord2Vec<R> for VectorModel
where
    R: BufRead,
{
    fn read_word2vec_binary_truncated(
        reader: &mut R,
        truncation: &mut Truncation,
        normalize: bool,
    ) -> Result<Self> {
        let (vocab, matrix) = read_word2vec_raw(reader, truncation)?;
        VectorModel::new(vocab, matrix, normalize)
    }
}

fn read_word2vec_raw<R>(
    reader: &mut R,
    truncation: &mut Truncation,
) -> Result<(SimpleVocab, Array2<f32>)>
where
    R: BufRead,
{
    let header = read_string(reader, b'\n')?;
    let (n_words, dims) = parse_shape(&header)
        .ok_or_else(|| Error::malformed_line(1, &header, "expected shape header"))?;

    let max_words = truncation.max_words.map_or(n_words, |max| max.min(n_words));
    debug!("{} extra words", truncation.extra_words.len());

    let mut vocab = SimpleVocab::default();
    let mut data = Vec::with_capacity(max_words * dims);
    let mut embedding = vec![0f32; dims];
    let mut n_read = 0;

    while n_read < n_words {
        let word = read_string(reader, b' ')?;
        let mut word = word.trim_start_matches('\n').to_owned();
        if word.is_empty() {
            return Err(Error::Format(format!(
                "Empty word at embedding {}",
                n_read + 1
            )));
        }

        if word.chars().next().map_or(false, char::is_uppercase) {
            let lowercased = word.to_lowercase();
            if vocab.idx(&lowercased).is_none() {
                word = lowercased;
            }
        }

        reader
            .read_f32_into::<LittleEndian>(&mut embedding)
            .map_err(|e| Error::read_error("word embedding", e))?;

        let orig_idx = n_read;
        n_read += 1;

        if orig_idx >= max_words && !truncation.extra_words.contains(&word) {
            continue;
        }

        truncation.extra_words.remove(&word);
        if vocab.push(word.as_str()).is_none() {
            debug!("Skipping duplicate word '{}'", word);
            continue;
        }
        data.extend_from_slice(&embedding);

        if n_read >= max_words && truncation.extra_words.is_empty() {
            break;
        }
    }

    info!("{} embeddings read, {} kept", n_read, vocab.len());

    let matrix = Array2::from_shape_vec((vocab.len(), dims), data)?;

    Ok((vocab, matrix))
}

/// Method to write a `VectorModel` to a word2vec binary file.
pub trait WriteWord2Vec<W>
where
    W: Write,
{
    /// Write the raw embeddings to the given writer.
    fn write_word2vec_binary(&self, w: &mut W) -> Result<()>;
}

impl<W> WriteWord2Vec<W> for VectorModel
where
    W: Write,
{
    fn write_word2vec_binary(&self, w: &mut W) -> Result<()> {
        writeln!(w, "{} {}", self.vocab().len(), self.dims())
            .map_err(|e| Error::write_error("word embedding matrix shape", e))?;

        for (word, embed) in self.vocab().words().iter().zip(self.vectors().outer_iter()) {
            write!(w, "{} ", word).map_err(|e| Error::write_error("token", e))?;

            for &v in embed {
                w.write_f32::<LittleEndian>(v)
                    .map_err(|e| Error::write_error("embedding component", e))?;
            }

            w.write_all(&[0x0a])
                .map_err(|e| Error::write_error("embedding separator", e))?;
        }

        Ok(())
    }
}
