//! Reader for extra-word files.
//!
//! An extra-word file lists words that should be kept regardless of
//! their frequency rank, one `word\tid` pair per line.

use std::collections::HashSet;
use std::io::BufRead;

use crate::error::{Error, Result};
use crate::util::LineReader;

/// Read the set of extra words.
pub fn read_extra_words<R>(reader: R) -> Result<HashSet<String>>
where
    R: BufRead,
{
    let mut lines = LineReader::new(reader);
    let mut extra_words = HashSet::new();

    while let Some(line) = lines.next_line()? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once('\t') {
            Some((word, id)) if !word.is_empty() && !id.contains('\t') => {
                extra_words.insert(word.to_owned());
            }
            _ => {
                return Err(Error::malformed_line(
                    lines.line_no(),
                    line,
                    "expected word and id",
                ))
            }
        }
    }

    Ok(extra_words)
}
