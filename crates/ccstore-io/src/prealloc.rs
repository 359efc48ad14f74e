//! File space preallocation.
//!
//! The native call (`posix_fallocate`) is tried first where the platform has
//! one. When the file system rejects it as unsupported, or the platform has no
//! native call, the file is extended by writing zero bytes at its end. The
//! file offset is the same afterwards on every path.

use std::fs::File;
use std::io::{self, Seek, SeekFrom};
use tracing::{debug, warn};

use crate::error::{FileError, FileResult};
use crate::retry::write_all;

/// Chunk size for the zero-filling fallback.
const ZERO_CHUNK: usize = 64 * 1024;

/// Make sure `file` has at least `new_size` bytes allocated.
///
/// Never shrinks the file. Growing through the fallback path changes the file
/// length to `new_size`.
pub fn fallocate(file: &File, new_size: u64) -> FileResult<()> {
    match native::preallocate(file, new_size) {
        Native::Done => return Ok(()),
        Native::Failed(source) => {
            return Err(FileError::Preallocate {
                size: new_size,
                source,
            })
        }
        Native::Unsupported => {}
    }

    fallocate_by_writing(file, new_size).map_err(|source| FileError::Preallocate {
        size: new_size,
        source,
    })
}

/// Outcome of the platform's native preallocation call.
enum Native {
    Done,
    Unsupported,
    Failed(io::Error),
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
mod native {
    use super::Native;
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    pub(super) fn preallocate(file: &File, new_size: u64) -> Native {
        let Ok(len) = libc::off_t::try_from(new_size) else {
            return Native::Failed(io::Error::from_raw_os_error(libc::EFBIG));
        };
        // posix_fallocate returns the error number instead of setting errno.
        let err = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
        match err {
            0 => Native::Done,
            libc::EINVAL | libc::EOPNOTSUPP => Native::Unsupported,
            err => Native::Failed(io::Error::from_raw_os_error(err)),
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
mod native {
    use super::Native;
    use std::fs::File;

    pub(super) fn preallocate(_file: &File, _new_size: u64) -> Native {
        Native::Unsupported
    }
}

/// Seeks `file` back to `pos` when dropped.
struct RestoreOffset<'a> {
    file: &'a File,
    pos: u64,
}

impl Drop for RestoreOffset<'_> {
    fn drop(&mut self) {
        let mut file = self.file;
        if let Err(e) = file.seek(SeekFrom::Start(self.pos)) {
            warn!("Failed to restore file offset {}: {}", self.pos, e);
        }
    }
}

/// Portable preallocation: append zeros up to `new_size`.
fn fallocate_by_writing(file: &File, new_size: u64) -> io::Result<()> {
    let mut handle = file;
    let saved = handle.stream_position()?;
    let _restore = RestoreOffset { file, pos: saved };

    let old_size = handle.seek(SeekFrom::End(0))?;
    if old_size >= new_size {
        return Ok(());
    }

    let mut remaining = new_size - old_size;
    debug!("Preallocating {} bytes by writing zeros", remaining);
    let zeros = vec![0u8; ZERO_CHUNK.min(usize::try_from(remaining).unwrap_or(ZERO_CHUNK))];
    while remaining > 0 {
        let n = zeros.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        write_all(&mut handle, &zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
