//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ccstore::{CacheStore, StorageConfig};
use ccstore_lock::LockOptions;
use tempfile::TempDir;

/// `len` bytes cycling through a prime-length pattern seeded by `seed`.
///
/// Different seeds give different content at every offset, so a mix of two
/// versions is always detectable.
pub fn patterned(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i % 251) as u8).wrapping_add(seed))
        .collect()
}

/// A store in a fresh temporary directory.
pub fn temp_store() -> (TempDir, CacheStore) {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::open(cache_root(&temp), StorageConfig::default()).unwrap();
    (temp, store)
}

/// The cache directory inside a test's temporary directory.
pub fn cache_root(temp: &TempDir) -> PathBuf {
    temp.path().join("cache")
}

/// Lock options that give up quickly.
pub fn short_lock_options(timeout_ms: u64) -> LockOptions {
    LockOptions {
        timeout: Duration::from_millis(timeout_ms),
        min_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        contention_warning: Duration::from_secs(60),
    }
}

/// Names of the entries directly inside `dir`.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
