//! Error types.

use std::io;

use ndarray::ShapeError;
use thiserror::Error;

/// `Result` type alias for operations that can fail.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Errors in reading corpora, building matrices, and factorization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid file format without line information.
    #[error("Invalid file format: {0}")]
    Format(String),

    /// A line that does not match the expected grammar.
    #[error("Unknown line {line} ({desc}):\n{content}")]
    MalformedLine {
        line: usize,
        content: String,
        desc: String,
    },

    /// Declared counts that disagree with the observed counts.
    #[error("Inconsistent input at line {line} ({desc}):\n{content}")]
    Inconsistent {
        line: usize,
        content: String,
        desc: String,
    },

    /// A kept eigenvalue is negative, its square root is undefined.
    #[error("Eigenvalue {index} is negative: {value}")]
    NegativeEigenvalue { index: usize, value: f64 },

    /// Normalization of a row that sums to zero.
    #[error("Row {row} sums to zero and cannot be normalized")]
    ZeroSumRow { row: usize },

    /// Requested rank exceeds the matrix dimensionality.
    #[error("Cannot factorize a {dim}x{dim} matrix with rank {rank}")]
    Rank { rank: usize, dim: usize },

    /// A matrix to decompose contains an infinite or NaN entry.
    #[error("Matrix entry ({row}, {col}) is not finite")]
    NonFinite { row: usize, col: usize },

    #[error("Cannot read {desc}: {error}")]
    Read { desc: String, error: io::Error },

    #[error("Cannot write {desc}: {error}")]
    Write { desc: String, error: io::Error },

    /// `ndarray` shape error.
    #[error(transparent)]
    Shape(ShapeError),
}

impl Error {
    pub fn read_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Read {
            desc: desc.into(),
            error,
        }
    }

    pub fn write_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Write {
            desc: desc.into(),
            error,
        }
    }

    pub(crate) fn malformed_line(
        line: usize,
        content: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Error::MalformedLine {
            line,
            content: content.into(),
            desc: desc.into(),
        }
    }

    pub(crate) fn inconsistent(
        line: usize,
        content: impl Into<String>,
        desc: impl Into<String>,
    ) -> Self {
        Error::Inconsistent {
            line,
            content: content.into(),
            desc: desc.into(),
        }
    }

    /// Line number of a format or consistency error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::MalformedLine { line, .. } | Error::Inconsistent { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<ShapeError> for Error {
    fn from(error: ShapeError) -> Self {
        Error::Shape(error)
    }
}
