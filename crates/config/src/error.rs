//! Error types for configuration persistence.

use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while reading or writing the persisted record.
#[derive(Debug, Error)]
pub enum Error {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the file that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The config file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Path of the file that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The persisted record could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}
