//! Long-lived lock pool.
//!
//! A process that touches the same keys repeatedly keeps their locks in a
//! [`LockPool`] instead of re-acquiring them each time. The pool is explicit
//! state owned by whoever runs the operation sequence; there is no global
//! pool.
//!
//! Locks are released in reverse acquisition order, on [`LockPool::release_all`]
//! or when the pool drops.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::lock::{LockFile, LockResult};
use crate::options::LockOptions;

/// Something that can acquire the lock for a key.
pub trait Locker {
    /// The held lock. Dropping it releases the lock.
    type Guard;

    /// Acquire the lock for `key`, waiting as the implementation sees fit.
    fn lock(&self, key: &str) -> LockResult<Self::Guard>;
}

/// Locks `<root>/<key>.lock` files with [`LockFile`].
#[derive(Debug, Clone)]
pub struct DirLocker {
    root: PathBuf,
    options: LockOptions,
}

impl DirLocker {
    pub fn new(root: impl Into<PathBuf>, options: LockOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// Path of the lock file for `key`.
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.lock"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }
}

impl Locker for DirLocker {
    type Guard = LockFile;

    fn lock(&self, key: &str) -> LockResult<LockFile> {
        LockFile::acquire(self.lock_path(key), &self.options)
    }
}

/// Handle returned by [`LockPool::acquire`].
///
/// The lock itself stays in the pool; the handle identifies it and stays
/// meaningful until the pool releases the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PooledLock {
    key: String,
    reused: bool,
}

impl PooledLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `true` if the pool already held the lock and no acquisition happened.
    pub fn was_reused(&self) -> bool {
        self.reused
    }
}

/// Process-scoped registry of held locks, at most one per key.
pub struct LockPool<L: Locker = DirLocker> {
    locker: L,
    /// Held locks in acquisition order.
    held: Vec<(String, L::Guard)>,
}

impl<L: Locker> LockPool<L> {
    pub fn new(locker: L) -> Self {
        Self {
            locker,
            held: Vec::new(),
        }
    }

    /// Acquire the lock for `key`, or return the one the pool already holds.
    pub fn acquire(&mut self, key: &str) -> LockResult<PooledLock> {
        if self.is_held(key) {
            return Ok(PooledLock {
                key: key.to_string(),
                reused: true,
            });
        }

        let guard = self.locker.lock(key)?;
        self.held.push((key.to_string(), guard));
        debug!("Pooled lock {} ({} held)", key, self.held.len());
        Ok(PooledLock {
            key: key.to_string(),
            reused: false,
        })
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.iter().any(|(k, _)| k == key)
    }

    /// Held keys in acquisition order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.held.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn locker(&self) -> &L {
        &self.locker
    }

    /// Release the lock for `key` early. Returns `false` if it was not held.
    pub fn release(&mut self, key: &str) -> bool {
        match self.held.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                drop(self.held.remove(idx));
                true
            }
            None => false,
        }
    }

    /// Release every held lock, most recently acquired first. Returns the
    /// number released.
    pub fn release_all(&mut self) -> usize {
        let count = self.held.len();
        while let Some((key, guard)) = self.held.pop() {
            drop(guard);
            debug!("Released pooled lock {}", key);
        }
        count
    }
}

impl<L: Locker> Drop for LockPool<L> {
    fn drop(&mut self) {
        self.release_all();
    }
}
