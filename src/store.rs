//! Cache entry storage on top of the I/O and lock primitives.
//!
//! Each operation locks the entry's key through the store's [`LockPool`], so
//! one process serving many requests pays for each key's lock once. Writes
//! go through atomic publish, so readers that skip locking still only ever
//! see complete entries.

use std::fs;
use std::path::{Path, PathBuf};

use ccstore_io::{
    create_cachedir_tag, fallocate, publish_with, read_file, read_file_part, set_timestamps,
    sweep_orphaned_temporaries, write_all, Bytes, FileError,
};
use ccstore_lock::{DirLocker, LockPool};
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::StoreResult;
use crate::key::CacheKey;

/// A cache directory shared with other processes.
pub struct CacheStore {
    root: PathBuf,
    config: StorageConfig,
    locks: LockPool<DirLocker>,
}

impl CacheStore {
    /// Open (creating if needed) the cache directory at `root`.
    pub fn open(root: impl Into<PathBuf>, config: StorageConfig) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| FileError::CreateDir {
            path: root.clone(),
            source,
        })?;
        create_cachedir_tag(&root);

        let locker = DirLocker::new(&root, config.lock_options());
        Ok(Self {
            root,
            config,
            locks: LockPool::new(locker),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Path where the entry for `key` lives.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        key.entry_path(&self.root)
    }

    /// Path of the lock file guarding `key`.
    pub fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.locks.locker().lock_path(&key.relative_path())
    }

    /// Take (or reuse) the lock for `key`, held until [`release_locks`](Self::release_locks).
    pub fn lock(&mut self, key: &CacheKey) -> StoreResult<()> {
        let pooled = self.locks.acquire(&key.relative_path())?;
        if pooled.was_reused() {
            debug!("Reusing held lock for {}", key);
        }
        Ok(())
    }

    /// Store `data` under `key`.
    pub fn put(&mut self, key: &CacheKey, data: &[u8]) -> StoreResult<()> {
        self.lock(key)?;
        let path = self.entry_path(key);

        let preallocate = self.config.io.preallocate
            && data.len() as u64 >= self.config.io.preallocate_min_bytes;
        publish_with(&path, |file, tmp_path| {
            if preallocate {
                if let Err(e) = fallocate(file, data.len() as u64) {
                    debug!("Preallocation skipped: {}", e);
                }
            }
            write_all(file, data).map_err(|source| FileError::Write {
                path: tmp_path.to_path_buf(),
                source,
            })
        })?;

        debug!("Stored {} ({} bytes)", key, data.len());
        Ok(())
    }

    /// Fetch the entry for `key`. `None` if there is no entry.
    pub fn get(&mut self, key: &CacheKey) -> StoreResult<Option<Bytes>> {
        self.lock(key)?;
        let path = self.entry_path(key);

        let data = match read_file(&path, None) {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                debug!("Miss for {}", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if self.config.io.touch_on_hit {
            if let Err(e) = set_timestamps(&path, None, None) {
                debug!("Failed to touch {}: {}", path.display(), e);
            }
        }
        debug!("Hit for {} ({} bytes)", key, data.len());
        Ok(Some(data))
    }

    /// Fetch `count` bytes of the entry for `key` starting at `pos`.
    ///
    /// `None` if there is no entry.
    pub fn get_part(&mut self, key: &CacheKey, pos: u64, count: usize) -> StoreResult<Option<Bytes>> {
        self.lock(key)?;
        match read_file_part(self.entry_path(key), pos, count) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if an entry exists for `key`. Takes no lock.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Remove temporary files older than the configured orphan age.
    pub fn sweep_orphans(&self) -> StoreResult<usize> {
        let removed = sweep_orphaned_temporaries(&self.root, self.config.orphan_temp_age())?;
        Ok(removed)
    }

    /// Keys currently locked by this store, in acquisition order.
    pub fn held_locks(&self) -> Vec<String> {
        self.locks.keys().map(str::to_string).collect()
    }

    /// Release every lock this store holds, newest first.
    pub fn release_locks(&mut self) -> usize {
        self.locks.release_all()
    }
}
