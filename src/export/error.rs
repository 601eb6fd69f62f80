//! Error types for table export.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that prevent the node or edge table from being written.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem operation failed.
    #[error("cannot write '{path}': {source}\n  Suggestion: Check that the output directory exists and is writable")]
    Io {
        /// File being written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("cannot encode table '{path}': {source}\n  Suggestion: Re-run with -vv to see which row failed")]
    Csv {
        /// File being written
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// The destination has no file name component.
    #[error("invalid output path '{path}'\n  Suggestion: Provide a file path such as papers.csv")]
    InvalidPath {
        /// Rejected path
        path: PathBuf,
    },
}

impl ExportError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a `Csv` error.
    #[must_use]
    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates an `InvalidPath` error.
    #[must_use]
    pub fn invalid_path(path: &Path) -> Self {
        Self::InvalidPath {
            path: path.to_path_buf(),
        }
    }
}
