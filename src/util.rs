use std::io::BufRead;

use ndarray::{Array1, ArrayViewMut1, ArrayViewMut2};

use crate::error::{Error, Result};

/// Vectors with an l2 norm at or below this threshold are degenerate.
pub const DEGENERATE_NORM: f32 = 1e-6;

/// l2-normalize a vector in place, returning its original norm.
///
/// Degenerate vectors are set to zero, so that they have a similarity
/// of zero with any other vector.
pub fn l2_normalize(mut v: ArrayViewMut1<f32>) -> f32 {
    let norm = v.dot(&v).sqrt();

    if norm > DEGENERATE_NORM {
        v /= norm;
    } else {
        v.fill(0.);
    }

    norm
}

pub fn l2_normalize_array(mut v: ArrayViewMut2<f32>) -> Array1<f32> {
    let mut norms = Vec::with_capacity(v.nrows());
    for embedding in v.outer_iter_mut() {
        norms.push(l2_normalize(embedding));
    }

    norms.into()
}

/// Line reader that counts lines and buffers one unconsumed line.
pub(crate) struct LineReader<R> {
    reader: R,
    line_no: usize,
    pending: Option<String>,
}

impl<R> LineReader<R>
where
    R: BufRead,
{
    pub fn new(reader: R) -> Self {
        LineReader {
            reader,
            line_no: 0,
            pending: None,
        }
    }

    /// Number of the most recently read line (1-based).
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Read the next line without its line terminator.
    ///
    /// Returns `None` at the end of the stream. A line that was pushed
    /// back is returned first.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }

        let mut line = String::new();
        let n = self
            .reader
            .read_line(&mut line)
            .map_err(|e| Error::read_error("line", e))?;
        if n == 0 {
            return Ok(None);
        }

        self.line_no += 1;

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Return a line to the reader, it is yielded by the next call
    /// to `next_line`.
    pub fn push_back(&mut self, line: String) {
        debug_assert!(self.pending.is_none(), "only one line can be pushed back");
        self.pending = Some(line);
    }
}

/// Read bytes up to `delim` as UTF-8, without the delimiter.
pub fn read_string(reader: &mut dyn BufRead, delim: u8) -> Result<String> {
    let mut buf = Vec::new();
    reader
        .read_until(delim, &mut buf)
        .map_err(|e| Error::read_error("string", e))?;
    if buf.last() == Some(&delim) {
        buf.pop();
    }

    String::from_utf8(buf).map_err(|e| Error::Format(format!("Token contains invalid UTF-8: {}", e)))
}
