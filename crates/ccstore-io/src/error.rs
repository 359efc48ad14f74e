//! Error types for file primitives.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for file primitives.
pub type FileResult<T> = Result<T, FileError>;

/// Errors from file primitives.
///
/// Every variant names the step that failed and the path involved. Transient
/// conditions (`EINTR`, `EAGAIN`) are retried internally and never show up
/// here.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to open {} for reading: {source}", path.display())]
    OpenRead { path: PathBuf, source: io::Error },

    #[error("failed to open {} for writing: {source}", path.display())]
    OpenWrite { path: PathBuf, source: io::Error },

    #[error("failed to stat {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to seek to offset {offset} in {}: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        source: io::Error,
    },

    #[error("failed to create temporary file in {}: {source}", dir.display())]
    TempFile { dir: PathBuf, source: io::Error },

    /// The temporary file `from` is left on disk; see
    /// [`sweep_orphaned_temporaries`](crate::sweep_orphaned_temporaries).
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to preallocate {size} bytes: {source}")]
    Preallocate { size: u64, source: io::Error },

    #[error("failed to set timestamps on {}: {source}", path.display())]
    Timestamps { path: PathBuf, source: io::Error },

    #[error("failed to decode {}: {reason}", path.display())]
    Encoding { path: PathBuf, reason: String },
}

impl FileError {
    pub(crate) fn open_read(path: &Path, source: io::Error) -> Self {
        Self::OpenRead {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn open_write(path: &Path, source: io::Error) -> Self {
        Self::OpenWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The underlying OS error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::OpenRead { source, .. }
            | Self::OpenWrite { source, .. }
            | Self::Stat { source, .. }
            | Self::CreateDir { source, .. }
            | Self::Read { source, .. }
            | Self::Write { source, .. }
            | Self::Seek { source, .. }
            | Self::TempFile { source, .. }
            | Self::Rename { source, .. }
            | Self::Preallocate { source, .. }
            | Self::Timestamps { source, .. } => Some(source),
            Self::Encoding { .. } => None,
        }
    }

    /// Check if the error means the path does not exist.
    pub fn is_not_found(&self) -> bool {
        self.io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
    }
}
