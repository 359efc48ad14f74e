//! Advisory lock files for cache entries.
//!
//! A lock is an exclusive OS-level lock on a file that sits beside the entry
//! it protects. The lock lives as long as the open descriptor, so:
//! - dropping the guard releases it
//! - a crashed holder releases it when the kernel closes its descriptors
//!
//! Acquisition polls with exponential backoff until the configured timeout.
//! Contention past a threshold is logged as a warning.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::options::LockOptions;
use crate::platform;

/// Lock result type
pub type LockResult<T> = Result<T, LockError>;

/// Errors from lock operations
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process held the lock for the whole timeout. This is an
    /// expected outcome: the key is busy.
    #[error("timed out after {waited:?} waiting for lock {}", path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("failed to lock {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    /// Check if the lock was busy rather than broken.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Path of the lock file involved.
    pub fn path(&self) -> &Path {
        match self {
            Self::Timeout { path, .. } | Self::Io { path, .. } => path,
        }
    }
}

/// Result of a single locking attempt.
enum Attempt {
    Acquired(File),
    Busy,
    /// The file was unlinked by its previous holder; retry right away.
    Stale,
}

/// A held advisory lock.
///
/// Dropping it (or calling [`release`](Self::release)) removes the lock file
/// and releases the OS lock.
#[derive(Debug)]
pub struct LockFile {
    /// Path to the lock file
    path: PathBuf,
    /// The opened lock file (held for the lock duration)
    file: File,
}

impl LockFile {
    /// Acquire the lock at `path`.
    ///
    /// Creates the parent directory and the lock file if needed. Waits up to
    /// `options.timeout`, sleeping between attempts with exponential backoff.
    ///
    /// # Returns
    /// * `Ok(LockFile)` - The lock is held
    /// * `Err(LockError::Timeout)` - Another holder kept it for the whole timeout
    /// * `Err(LockError::Io)` - The lock file could not be opened or locked
    pub fn acquire(path: impl Into<PathBuf>, options: &LockOptions) -> LockResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.clone(),
                source,
            })?;
        }

        let start = Instant::now();
        let mut delay = options.min_backoff;
        let mut warned = false;

        loop {
            match Self::attempt(&path) {
                Ok(Attempt::Acquired(file)) => {
                    if warned {
                        warn!(
                            "Lock acquired after {:.1}s contention: {}",
                            start.elapsed().as_secs_f64(),
                            path.display()
                        );
                    }
                    debug!("Acquired lock {}", path.display());
                    return Ok(Self { path, file });
                }
                Ok(Attempt::Stale) => {
                    debug!("Lock file {} was replaced, retrying", path.display());
                    if start.elapsed() >= options.timeout {
                        return Err(LockError::Timeout {
                            path,
                            waited: start.elapsed(),
                        });
                    }
                    continue;
                }
                Ok(Attempt::Busy) => {
                    if !warned && start.elapsed() > options.contention_warning {
                        warn!("Lock contention on {}, waiting...", path.display());
                        warned = true;
                    }
                }
                Err(source) => return Err(LockError::Io { path, source }),
            }

            let elapsed = start.elapsed();
            if elapsed >= options.timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: elapsed,
                });
            }

            thread::sleep(delay.min(options.timeout - elapsed));
            delay = options.next_backoff(delay);
        }
    }

    /// Make one attempt at the lock at `path`, without waiting.
    ///
    /// Returns `Ok(None)` if the lock is busy.
    pub fn try_acquire(path: impl Into<PathBuf>) -> LockResult<Option<Self>> {
        let path = path.into();
        loop {
            match Self::attempt(&path) {
                Ok(Attempt::Acquired(file)) => return Ok(Some(Self { path, file })),
                Ok(Attempt::Busy) => return Ok(None),
                Ok(Attempt::Stale) => continue,
                Err(source) => return Err(LockError::Io { path, source }),
            }
        }
    }

    fn attempt(path: &Path) -> io::Result<Attempt> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        if !platform::try_lock_exclusive(&file)? {
            return Ok(Attempt::Busy);
        }
        if !platform::still_linked(&file, path)? {
            platform::unlock(&file);
            return Ok(Attempt::Stale);
        }
        Ok(Attempt::Acquired(file))
    }

    /// Get the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Unlink while still holding the lock: anyone who locks the old inode
        // afterwards sees it is no longer linked and retries.
        if platform::REMOVE_ON_RELEASE {
            if let Err(e) = fs::remove_file(&self.path) {
                debug!("Failed to remove lock file {}: {}", self.path.display(), e);
            }
        }
        platform::unlock(&self.file);
        debug!("Released lock {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Barrier};
    use tempfile::TempDir;

    fn quick(timeout_ms: u64) -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(timeout_ms),
            min_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            contention_warning: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_lock_acquire_basic() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");

        let lock = LockFile::acquire(&lock_path, &quick(1000)).unwrap();

        assert!(lock.path().exists());
        assert_eq!(lock.path(), lock_path);
    }

    #[test]
    fn test_lock_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("ab").join("cd").join("entry.lock");

        let _lock = LockFile::acquire(&lock_path, &quick(1000)).unwrap();

        assert!(lock_path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");

        {
            let _lock = LockFile::acquire(&lock_path, &quick(1000)).unwrap();
        }

        // Should be able to acquire again immediately
        let lock = LockFile::try_acquire(&lock_path).unwrap();
        assert!(lock.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_release_removes_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");

        let lock = LockFile::acquire(&lock_path, &quick(1000)).unwrap();
        lock.release();

        assert!(!lock_path.exists());
    }

    #[test]
    fn test_lock_contention_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");
        let lock_path2 = lock_path.clone();

        let lock1 = LockFile::acquire(&lock_path, &quick(1000)).unwrap();

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let started = Instant::now();
            let result = LockFile::acquire(&lock_path2, &quick(100));
            tx.send((result, started.elapsed())).unwrap();
        });

        let (result, elapsed) = rx.recv().unwrap();
        let err = result.unwrap_err();
        assert!(err.is_timeout(), "second acquisition should time out: {err}");
        assert!(elapsed >= Duration::from_millis(100));

        handle.join().unwrap();
        drop(lock1);
    }

    #[test]
    fn test_try_acquire_busy() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");

        let _held = LockFile::acquire(&lock_path, &quick(1000)).unwrap();
        assert!(LockFile::try_acquire(&lock_path).unwrap().is_none());
    }

    #[test]
    fn test_zero_timeout_is_single_attempt() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");

        let _held = LockFile::acquire(&lock_path, &quick(1000)).unwrap();
        let err = LockFile::acquire(&lock_path, &quick(0)).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.path(), lock_path);
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");
        let lock_path2 = lock_path.clone();

        let lock1 = LockFile::acquire(&lock_path, &quick(1000)).unwrap();
        let handle = thread::spawn(move || LockFile::acquire(&lock_path2, &quick(5000)).is_ok());

        thread::sleep(Duration::from_millis(50));
        lock1.release();

        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_unopenable_lock_path_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        // A directory cannot be opened for writing as a lock file.
        let lock_path = temp_dir.path().join("dir.lock");
        fs::create_dir(&lock_path).unwrap();

        let err = LockFile::acquire(&lock_path, &quick(1000)).unwrap_err();
        assert!(!err.is_timeout());
        assert!(matches!(err, LockError::Io { .. }));
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join("entry.lock");
        let inside = Arc::new(AtomicUsize::new(0));
        let entered = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock_path = lock_path.clone();
                let inside = Arc::clone(&inside);
                let entered = Arc::clone(&entered);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..20 {
                        let lock = LockFile::acquire(&lock_path, &quick(10_000)).unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "two holders at once");
                        thread::sleep(Duration::from_micros(200));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        entered.fetch_add(1, Ordering::SeqCst);
                        lock.release();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }
        assert_eq!(entered.load(Ordering::SeqCst), 160);
    }
}
