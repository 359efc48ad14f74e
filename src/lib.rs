//! ccstore - multi-process file cache storage
//!
//! A content cache shared by cooperating processes on one machine. Entries
//! are published atomically (temporary file plus rename) and guarded by
//! per-entry lock files, so concurrent writers never interleave and readers
//! never see a torn entry.
//!
//! The low-level pieces live in their own crates:
//! - [`ccstore_io`]: whole-file reads and writes, atomic publish, preallocation
//! - [`ccstore_lock`]: exclusive lock files and the per-process lock pool

pub mod config;
pub mod error;
pub mod key;
pub mod store;

pub use ccstore_io;
pub use ccstore_lock;

pub use config::{ConfigError, StorageConfig};
pub use error::{StoreError, StoreResult};
pub use key::CacheKey;
pub use store::CacheStore;
