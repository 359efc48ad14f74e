//! Access/modification time updates.

use filetime::FileTime;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{FileError, FileResult};

/// Set the modification and access times of `path`.
///
/// With no `mtime`, both times are set to now. With no `atime`, the access
/// time is set to `mtime`.
pub fn set_timestamps(
    path: impl AsRef<Path>,
    mtime: Option<SystemTime>,
    atime: Option<SystemTime>,
) -> FileResult<()> {
    let path = path.as_ref();
    let (atime, mtime) = match mtime {
        Some(mtime) => {
            let mtime = FileTime::from_system_time(mtime);
            let atime = atime.map(FileTime::from_system_time).unwrap_or(mtime);
            (atime, mtime)
        }
        None => {
            let now = FileTime::now();
            (now, now)
        }
    };

    filetime::set_file_times(path, atime, mtime).map_err(|source| FileError::Timestamps {
        path: path.to_path_buf(),
        source,
    })
}
