//! Error types shared across the library

use crate::model::FormatKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a record's own consistency checks
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no file path")]
    MissingPath,
}

/// Errors raised by format adapters while reading or writing tags
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("file does not exist: {0}")]
    MissingFile(PathBuf),

    #[error("unable to decode tags in {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write tags to {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("no adapter available for {0} files")]
    Unsupported(FormatKind),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Errors raised while persisting the library snapshot
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LibraryError::Io {
            path: path.into(),
            source,
        }
    }
}
