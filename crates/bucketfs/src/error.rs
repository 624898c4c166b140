//! Error types for Bucketfs
//!
//! Errors fall into three groups:
//! - Caller mistakes detected locally (`InvalidPath`, `Config`)
//! - Store answers the nodes absorb (`NotFound` becomes `exists == false`)
//! - Store failures that propagate unchanged (`StoreUnavailable`,
//!   `PartialBatchFailure`, `Io`)
//!
//! The core never retries. Retry policy belongs to the store client.

use thiserror::Error;

/// Result type alias using Bucketfs's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Bucketfs error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A path could not be used as a node identity.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store has no object at the key.
    ///
    /// Existence-oriented calls (refresh, listing) treat this as
    /// `exists == false` and never surface it.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Transport, authentication or service failure other than not-found.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A batch delete was only partially applied.
    ///
    /// Some keys of the batch may already be gone. Re-running the recursive
    /// delete converges on the remaining keys.
    #[error("batch delete failed for {} of {attempted} keys", failed.len())]
    PartialBatchFailure {
        /// Number of keys sent in the batch.
        attempted: usize,
        /// Keys the store reported as not deleted.
        failed: Vec<String>,
    },

    /// I/O error from local file transfer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or request shape.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the store reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
