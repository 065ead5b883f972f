//! Error types for journal operations.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::date::EntryDate;

/// Failures surfaced to callers of the journal API.
///
/// Malformed Markdown in an existing journal is never an error; it is kept
/// verbatim by the parser. Only bad caller input and I/O reach this type.
#[derive(Debug)]
pub enum WorklogError {
    /// The supplied date is not a valid `YYYY-MM-DD` calendar date.
    InvalidDate(String),
    /// The supplied content was empty or contained only whitespace.
    EmptyContent,
    /// The content carries a `## YYYY-MM-DD` heading for another day.
    ForeignDate { expected: EntryDate, found: EntryDate },
    /// Reading or writing the journal file failed.
    Io { path: PathBuf, source: io::Error },
}

impl WorklogError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WorklogError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorklogError::InvalidDate(_)
                | WorklogError::EmptyContent
                | WorklogError::ForeignDate { .. }
        )
    }
}

impl fmt::Display for WorklogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorklogError::InvalidDate(value) => {
                write!(f, "invalid date '{value}': expected YYYY-MM-DD")
            }
            WorklogError::EmptyContent => write!(f, "content must not be empty"),
            WorklogError::ForeignDate { expected, found } => write!(
                f,
                "invalid content: heading for {found} inside content for {expected}"
            ),
            WorklogError::Io { path, source } => {
                write!(f, "I/O error on {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for WorklogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorklogError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for Results in seev.
pub type WorklogResult<T> = Result<T, WorklogError>;
