//! Per-platform lock strategy.
//!
//! Every target exposes the same calls and constant: `try_lock_exclusive`,
//! `unlock`, `still_linked` and `REMOVE_ON_RELEASE`. Unix uses `flock(2)`;
//! other targets go through `fs2`.

#[cfg(unix)]
mod imp {
    use std::fs::{self, File};
    use std::io;
    use std::os::unix::fs::MetadataExt;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    pub(crate) const REMOVE_ON_RELEASE: bool = true;

    /// Try to take an exclusive lock without blocking.
    ///
    /// `Ok(false)` means another descriptor holds it.
    pub(crate) fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        let fd = file.as_raw_fd();
        loop {
            let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
            if result == 0 {
                return Ok(true);
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EWOULDBLOCK) => return Ok(false),
                Some(libc::EINTR) => continue,
                _ => return Err(err),
            }
        }
    }

    pub(crate) fn unlock(file: &File) {
        unsafe {
            libc::flock(file.as_raw_fd(), libc::LOCK_UN);
        }
    }

    /// Check that `path` still names the file behind `file`.
    ///
    /// A holder removes the lock file before unlocking, so a descriptor locked
    /// after that removal refers to an orphaned inode.
    pub(crate) fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
        let held = file.metadata()?;
        match fs::metadata(path) {
            Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::fs::File;
    use std::io;
    use std::path::Path;

    /// A removed file stays delete-pending while other handles are open, and
    /// opening it then fails, so lock files are left in place.
    pub(crate) const REMOVE_ON_RELEASE: bool = false;

    pub(crate) fn try_lock_exclusive(file: &File) -> io::Result<bool> {
        match fs2::FileExt::try_lock_exclusive(file) {
            Ok(()) => Ok(true),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn unlock(file: &File) {
        let _ = fs2::FileExt::unlock(file);
    }

    /// Lock files are never removed here, so the path always names the
    /// locked file.
    pub(crate) fn still_linked(_file: &File, _path: &Path) -> io::Result<bool> {
        Ok(true)
    }
}

pub(crate) use imp::{still_linked, try_lock_exclusive, unlock, REMOVE_ON_RELEASE};
