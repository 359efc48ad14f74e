//! Error types for ccstore
//!
//! Everything in the root crate returns `StoreResult<T>`.

use ccstore_io::FileError;
use ccstore_lock::LockError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// All errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid cache key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    /// Check if the entry's lock was busy for the whole timeout.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Lock(e) if e.is_timeout())
    }

    /// Check if the error means a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::File(e) if e.is_not_found())
    }
}
