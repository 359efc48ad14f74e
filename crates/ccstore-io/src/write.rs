//! Writers, atomic publish and file copy.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;

use crate::error::{FileError, FileResult};
use crate::retry::{read_all, write_all};
use crate::temp::TemporaryFile;

/// How [`write_file`] treats an existing file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Unlink any existing file, then create a fresh one.
    #[default]
    Replace,
    /// Truncate the existing file in place. Use this when another process may
    /// hold the path open and must keep seeing the same inode.
    InPlace,
}

/// Whether [`copy_file`] goes through the atomic publish path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViaTmpFile {
    /// Write the destination directly.
    #[default]
    No,
    /// Write a temporary file beside the destination and rename it into place.
    Yes,
}

/// Write `data` to `path`.
///
/// Leaves the file holding exactly `data` or reports an error. Not atomic
/// against concurrent readers: use [`publish`] or hold the entry's lock for
/// that.
pub fn write_file(path: impl AsRef<Path>, data: impl AsRef<[u8]>, mode: WriteMode) -> FileResult<()> {
    let path = path.as_ref();
    if mode == WriteMode::Replace {
        remove_if_present(path);
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| FileError::open_write(path, e))?;
    write_all(&mut file, data.as_ref()).map_err(|e| FileError::write(path, e))
}

/// Rename `from` onto `to`, replacing any existing destination.
pub fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> FileResult<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    fs::rename(from, to).map_err(|source| FileError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Atomically publish content produced by `writer` at `dest`.
///
/// `writer` fills a fresh temporary file in `dest`'s directory. The file is
/// then synced, closed and renamed onto `dest`, so a reader opening `dest`
/// sees either the previous complete content or the new complete content.
///
/// If `writer` or the sync fails, the temporary file is removed. If the
/// rename fails, the temporary file stays on disk and the returned
/// [`FileError::Rename`] names it.
pub fn publish_with<F>(dest: impl AsRef<Path>, writer: F) -> FileResult<()>
where
    F: FnOnce(&mut File, &Path) -> FileResult<()>,
{
    let dest = dest.as_ref();
    let mut tmp = TemporaryFile::beside(dest)?;
    let tmp_path = tmp.path().to_path_buf();

    {
        let Some(file) = tmp.file_mut() else {
            return Err(FileError::open_write(
                &tmp_path,
                io::Error::new(io::ErrorKind::Other, "temporary file already closed"),
            ));
        };
        writer(file, &tmp_path)?;
        file.sync_data()
            .map_err(|e| FileError::write(&tmp_path, e))?;
    }
    tmp.close();

    let tmp_path = tmp.into_path();
    rename(&tmp_path, dest)?;
    debug!("Published {}", dest.display());
    Ok(())
}

/// Atomically publish `data` at `dest`. See [`publish_with`].
pub fn publish(dest: impl AsRef<Path>, data: impl AsRef<[u8]>) -> FileResult<()> {
    let data = data.as_ref();
    publish_with(dest, |file, tmp_path| {
        write_all(file, data).map_err(|e| FileError::write(tmp_path, e))
    })
}

/// Copy `src` to `dest`.
///
/// With [`ViaTmpFile::Yes`] the copy goes through [`publish_with`] and is
/// atomic for readers of `dest`. A rename cannot cross file systems, so
/// callers copying across a file system boundary should use
/// [`ViaTmpFile::No`] instead: that path unlinks `dest` and writes it
/// directly.
pub fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>, via_tmp_file: ViaTmpFile) -> FileResult<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    let mut src_file = File::open(src).map_err(|e| FileError::open_read(src, e))?;

    match via_tmp_file {
        ViaTmpFile::Yes => publish_with(dest, |dest_file, tmp_path| {
            copy_stream(&mut src_file, src, dest_file, tmp_path)
        }),
        ViaTmpFile::No => {
            remove_if_present(dest);
            let mut dest_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(dest)
                .map_err(|e| FileError::open_write(dest, e))?;
            copy_stream(&mut src_file, src, &mut dest_file, dest)
        }
    }
}

/// Pump `src_file` into `dest_file`, attributing failures to the right path.
fn copy_stream(src_file: &mut File, src: &Path, dest_file: &mut File, dest: &Path) -> FileResult<()> {
    let mut write_error = None;
    let result = read_all(src_file, |chunk| {
        write_all(&mut *dest_file, chunk).map_err(|e| {
            let kind = e.kind();
            write_error = Some(e);
            io::Error::from(kind)
        })
    });
    match (result, write_error) {
        (Ok(()), _) => Ok(()),
        (Err(_), Some(e)) => Err(FileError::write(dest, e)),
        (Err(e), None) => Err(FileError::read(src, e)),
    }
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            debug!("Failed to unlink {}: {}", path.display(), e);
        }
    }
}
