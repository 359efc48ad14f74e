//! Uniquely named temporary files created beside their destination.
//!
//! Name layout: `<dest-file-name>.tmp.<pid>.<random>`. The pid keeps
//! concurrent processes apart, the random suffix keeps concurrent writers in
//! one process apart, and `create_new` catches whatever collisions remain.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FileError, FileResult};

/// Marker separating the destination name from the unique suffix.
const TEMP_MARKER: &str = ".tmp.";

/// Length of the random part of a temporary file name.
const SUFFIX_LEN: usize = 8;

/// Attempts before giving up on finding an unused name.
const MAX_ATTEMPTS: usize = 16;

/// A temporary file that is removed on drop unless persisted.
#[derive(Debug)]
pub struct TemporaryFile {
    path: PathBuf,
    file: Option<File>,
}

impl TemporaryFile {
    /// Create a new temporary file in the same directory as `dest`.
    pub fn beside(dest: &Path) -> FileResult<Self> {
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = dest
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "entry".to_string());

        let mut last_error = None;
        for _ in 0..MAX_ATTEMPTS {
            let path = dir.join(unique_name(&stem));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    return Ok(Self {
                        path,
                        file: Some(file),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_error = Some(e),
                Err(source) => return Err(FileError::TempFile { dir, source }),
            }
        }

        Err(FileError::TempFile {
            dir,
            source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AlreadyExists)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open file. `None` only after [`close`](Self::close).
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Mutable access to the open file.
    pub fn file_mut(&mut self) -> Option<&mut File> {
        self.file.as_mut()
    }

    /// Close the descriptor but keep the file (and its drop-time removal).
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Stop tracking the file: it will not be removed on drop.
    pub fn into_path(mut self) -> PathBuf {
        self.file = None;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        self.file = None;
        if self.path.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

fn unique_name(stem: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{stem}{TEMP_MARKER}{}.{suffix}", std::process::id())
}

/// Check if `path` is named like a file created by [`TemporaryFile`].
pub fn is_temporary_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(idx) = name.rfind(TEMP_MARKER) else {
        return false;
    };
    let mut parts = name[idx + TEMP_MARKER.len()..].splitn(2, '.');
    let pid_ok = parts
        .next()
        .is_some_and(|pid| !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit()));
    let suffix_ok = parts
        .next()
        .is_some_and(|s| s.len() == SUFFIX_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric()));
    pid_ok && suffix_ok
}

/// Remove temporary files under `dir` not modified for at least `max_age`.
///
/// These are left behind by publishers that crashed, or whose final rename
/// failed. Entries that vanish or cannot be inspected are skipped. Returns the
/// number of files removed.
pub fn sweep_orphaned_temporaries(dir: &Path, max_age: Duration) -> FileResult<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_temporary_file(entry.path()) {
            continue;
        }
        let age = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|modified| modified.elapsed().ok());
        match age {
            Some(age) if age >= max_age => match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!("Removed orphaned temporary file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => debug!("Failed to remove {}: {}", entry.path().display(), e),
            },
            _ => {}
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn created_beside_destination() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("entry");
        let tmp = TemporaryFile::beside(&dest).unwrap();

        assert_eq!(tmp.path().parent(), Some(dir.path()));
        assert!(tmp.path().exists());
        assert!(is_temporary_file(tmp.path()));
        let name = tmp.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("entry.tmp."));
    }

    #[test]
    fn removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let mut tmp = TemporaryFile::beside(&dir.path().join("entry")).unwrap();
        tmp.file_mut().unwrap().write_all(b"partial").unwrap();
        let path = tmp.path().to_path_buf();

        drop(tmp);
        assert!(!path.exists());
    }

    #[test]
    fn into_path_keeps_file() {
        let dir = TempDir::new().unwrap();
        let tmp = TemporaryFile::beside(&dir.path().join("entry")).unwrap();
        let path = tmp.into_path();
        assert!(path.exists());
    }

    #[test]
    fn names_are_unique() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("entry");
        let a = TemporaryFile::beside(&dest).unwrap();
        let b = TemporaryFile::beside(&dest).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = TemporaryFile::beside(&dir.path().join("nope").join("entry")).unwrap_err();
        assert!(matches!(err, FileError::TempFile { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn temporary_name_recognition() {
        assert!(is_temporary_file(Path::new("/c/ab/abcd.tmp.1234.aZ09bY8x")));
        assert!(!is_temporary_file(Path::new("/c/ab/abcd")));
        assert!(!is_temporary_file(Path::new("/c/ab/abcd.lock")));
        assert!(!is_temporary_file(Path::new("/c/ab/abcd.tmp.12x4.aZ09bY8x")));
        assert!(!is_temporary_file(Path::new("/c/ab/abcd.tmp.1234.short")));
    }

    #[test]
    fn sweep_respects_age() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("ab");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("entry"), b"keep").unwrap();
        let orphan = TemporaryFile::beside(&sub.join("entry")).unwrap().into_path();

        let removed = sweep_orphaned_temporaries(dir.path(), Duration::from_secs(3600)).unwrap();
        assert_eq!(removed, 0);
        assert!(orphan.exists());

        let removed = sweep_orphaned_temporaries(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(removed, 1);
        assert!(!orphan.exists());
        assert!(sub.join("entry").exists());
    }

    #[test]
    fn sweep_missing_dir() {
        let dir = TempDir::new().unwrap();
        let removed = sweep_orphaned_temporaries(&dir.path().join("none"), Duration::ZERO).unwrap();
        assert_eq!(removed, 0);
    }
}
