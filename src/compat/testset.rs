//! Readers for word similarity and analogy test sets.
//!
//! Test sets are whitespace-delimited text files. A similarity test set
//! has lines of the form `word1 word2 score`, an analogy test set has
//! lines of the form `a a2 b b2` (*a* is to *a2* as *b* is to *b2*).
//! All words are lowercased on load.
//!
//! A directory with test sets is read as a collection, where each test
//! set is named after its file without the `.txt` extension.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::util::LineReader;

/// A word pair with a gold similarity score.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityPair {
    pub x: String,
    pub y: String,
    pub gold: f32,
}

/// An analogy *a : a2 = b : b2*.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalogyQuestion {
    pub a: String,
    pub a2: String,
    pub b: String,
    pub b2: String,
}

impl AnalogyQuestion {
    /// All words of the analogy, in file order.
    pub fn words(&self) -> [&str; 4] {
        [&self.a, &self.a2, &self.b, &self.b2]
    }
}

/// Items that can be parsed from a test set line.
pub trait TestItem: Sized {
    /// Parse a lowercased line, `None` if it is malformed.
    fn parse(line: &str) -> Option<Self>;
}

impl TestItem for SimilarityPair {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let x = fields.next()?.to_owned();
        let y = fields.next()?.to_owned();
        let gold = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }

        Some(SimilarityPair { x, y, gold })
    }
}

impl TestItem for AnalogyQuestion {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace().map(ToOwned::to_owned);
        let question = AnalogyQuestion {
            a: fields.next()?,
            a2: fields.next()?,
            b: fields.next()?,
            b2: fields.next()?,
        };
        if fields.next().is_some() {
            return None;
        }

        Some(question)
    }
}

/// A named test set.
#[derive(Clone, Debug, PartialEq)]
pub struct TestSet<T> {
    name: String,
    items: Vec<T>,
}

pub type SimilarityTestSet = TestSet<SimilarityPair>;

pub type AnalogyTestSet = TestSet<AnalogyQuestion>;

impl<T> TestSet<T>
where
    T: TestItem,
{
    pub fn new(name: impl Into<String>, items: Vec<T>) -> Self {
        TestSet {
            name: name.into(),
            items,
        }
    }

    /// Read a test set, skipping blank lines.
    pub fn read<R>(reader: R, name: impl Into<String>) -> Result<Self>
    where
        R: BufRead,
    {
        let mut lines = LineReader::new(reader);
        let mut items = Vec::new();

        while let Some(line) = lines.next_line()? {
            let line = line.trim().to_lowercase();
            if line.is_empty() {
                continue;
            }

            let item = T::parse(&line).ok_or_else(|| {
                Error::malformed_line(lines.line_no(), line.as_str(), "malformed test item")
            })?;
            items.push(item);
        }

        Ok(TestSet::new(name, items))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Names of the test sets in a directory.
///
/// These are the file names of the `*.txt` files without extension,
/// in sorted order.
pub fn test_set_names(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Format(format!(
            "Test set directory does not exist or is not a directory: {}",
            dir.display()
        )));
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::read_error("test set directory", e))? {
        let path = entry
            .map_err(|e| Error::read_error("test set directory entry", e))?
            .path();
        if path.extension().map_or(false, |ext| ext == "txt") {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }

    if names.is_empty() {
        return Err(Error::Format(format!(
            "No test set ending with '.txt' found in {}",
            dir.display()
        )));
    }

    names.sort();

    Ok(names)
}

/// Read a collection of test sets from a directory.
///
/// If `names` is empty, all `*.txt` files in the directory are read.
pub fn read_test_sets<T>(dir: impl AsRef<Path>, names: &[String]) -> Result<Vec<TestSet<T>>>
where
    T: TestItem,
{
    let dir = dir.as_ref();
    let names = if names.is_empty() {
        test_set_names(dir)?
    } else {
        names.to_owned()
    };

    names
        .into_iter()
        .map(|name| {
            let path = dir.join(format!("{}.txt", name));
            info!("Read test set {}", path.display());
            let f = File::open(&path)
                .map_err(|e| Error::read_error(format!("test set {}", path.display()), e))?;
            TestSet::read(BufReader::new(f), name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{
        read_test_sets, test_set_names, AnalogyQuestion, AnalogyTestSet, SimilarityPair,
        SimilarityTestSet,
    };
    use crate::error::Error;

    #[test]
    fn similarity_pairs_are_lowercased() {
        let test_set = SimilarityTestSet::read(Cursor::new("King Queen 8.5\n\ncat dog 7\n"), "toy")
            .unwrap();
        assert_eq!(test_set.name(), "toy");
        assert_eq!(
            test_set.items(),
            &[
                SimilarityPair {
                    x: "king".to_owned(),
                    y: "queen".to_owned(),
                    gold: 8.5
                },
                SimilarityPair {
                    x: "cat".to_owned(),
                    y: "dog".to_owned(),
                    gold: 7.
                }
            ]
        );
    }

    #[test]
    fn malformed_items_report_line() {
        let err = SimilarityTestSet::read(Cursor::new("a b 1\na b\n"), "bad").unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 2, .. }));

        let err = AnalogyTestSet::read(Cursor::new("a b c d e\n"), "bad").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn directory_names_are_sorted() {
        assert_eq!(
            test_set_names("testdata/sim").unwrap(),
            vec!["pets".to_owned(), "toy".to_owned()]
        );
        assert!(test_set_names("testdata/nonexistent").is_err());
    }

    #[test]
    fn reads_named_and_discovered_test_sets() {
        let all: Vec<SimilarityTestSet> = read_test_sets("testdata/sim", &[]).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].len(), 5);

        let analogies: Vec<AnalogyTestSet> =
            read_test_sets("testdata/analogy", &["toy".to_owned()]).unwrap();
        assert_eq!(
            analogies[0].items()[0],
            AnalogyQuestion {
                a: "man".to_owned(),
                a2: "king".to_owned(),
                b: "woman".to_owned(),
                b2: "queen".to_owned(),
            }
        );
    }
}
