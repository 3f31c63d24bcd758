//! Common error types for deckstat

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for deckstat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the deckstat crates
#[derive(Error, Debug)]
pub enum Error {
    /// The durable record store could not be read or written.
    ///
    /// This is the only condition that aborts a pipeline run. A deck or
    /// card that does not exist is never an error: lookups return `None`.
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (poisoned lock, panicked worker, ...)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O failure on a store path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }

    /// True for structural store failures
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}
