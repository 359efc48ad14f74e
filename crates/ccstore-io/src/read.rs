//! Whole-file and byte-range readers.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

use crate::buffer::Bytes;
use crate::error::{FileError, FileResult};

/// Smallest initial buffer for [`read_file`].
const MIN_READ_SIZE: usize = 1024;

/// Largest initial buffer. Bigger hints and counts are reached by growing.
const MAX_INITIAL_READ_SIZE: usize = 64 * 1024 * 1024;

/// First buffer size for [`read_file_part`].
const PART_CHUNK_SIZE: usize = 64 * 1024;

/// Read the entire file at `path`.
///
/// Without a `size_hint` the file is stat'ed first. The buffer starts at
/// `max(size_hint, 1024) + 1` bytes so a file of static size is read in one
/// call, then doubles whenever it fills (the file may grow while being read).
/// Hints above 64 MiB start at 64 MiB and grow from there.
/// Reading stops at the first zero-length or short read.
pub fn read_file(path: impl AsRef<Path>, size_hint: Option<u64>) -> FileResult<Bytes> {
    let path = path.as_ref();

    let size_hint = match size_hint {
        Some(hint) => hint,
        None => fs::metadata(path)
            .map_err(|source| FileError::Stat {
                path: path.to_path_buf(),
                source,
            })?
            .len(),
    };
    let initial = usize::try_from(size_hint)
        .unwrap_or(usize::MAX)
        .clamp(MIN_READ_SIZE, MAX_INITIAL_READ_SIZE)
        + 1;

    let mut file = File::open(path).map_err(|e| FileError::open_read(path, e))?;

    let mut result = Bytes::zeroed(initial);
    let mut pos = 0;
    loop {
        if pos == result.len() {
            result.resize(result.len() * 2);
        }
        let max_read = result.len() - pos;
        match file.read(&mut result[pos..]) {
            Ok(0) => break,
            Ok(n) => {
                pos += n;
                if n < max_read {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FileError::read(path, e)),
        }
    }

    result.truncate(pos);
    Ok(result)
}

/// Read the entire file at `path` as text.
///
/// On Windows, content that starts with a UTF-16 little-endian byte order mark
/// is transcoded to UTF-8. Everywhere else the content must already be UTF-8.
pub fn read_file_to_string(path: impl AsRef<Path>, size_hint: Option<u64>) -> FileResult<String> {
    let path = path.as_ref();
    let bytes = read_file(path, size_hint)?;

    if cfg!(windows) && has_utf16_le_bom(&bytes) {
        return transcode_utf16_le(path, &bytes[2..]);
    }

    String::from_utf8(bytes.into_vec()).map_err(|e| FileError::Encoding {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read up to `count` bytes starting at byte offset `pos`.
///
/// Returns fewer than `count` bytes if the file ends first. `count == 0`
/// returns an empty buffer without touching the file system, and `pos == 0`
/// never seeks, so unseekable special files work.
pub fn read_file_part(path: impl AsRef<Path>, pos: u64, count: usize) -> FileResult<Bytes> {
    if count == 0 {
        return Ok(Bytes::new());
    }
    let path = path.as_ref();

    let mut file = File::open(path).map_err(|e| {
        debug!("Failed to open {}: {}", path.display(), e);
        FileError::open_read(path, e)
    })?;

    if pos != 0 {
        let seek_error = |source| FileError::Seek {
            path: path.to_path_buf(),
            offset: pos,
            source,
        };
        let reached = file.seek(SeekFrom::Start(pos)).map_err(seek_error)?;
        if reached != pos {
            return Err(seek_error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("seek stopped at offset {reached}"),
            )));
        }
    }

    // `count` may be far larger than the file, so the buffer grows as data
    // arrives instead of being sized up front.
    let mut result = Bytes::zeroed(count.min(PART_CHUNK_SIZE));
    let mut bytes_read = 0;
    while bytes_read < count {
        if bytes_read == result.len() {
            result.resize(result.len().saturating_mul(2).min(count));
        }
        match file.read(&mut result[bytes_read..]) {
            Ok(0) => break,
            Ok(n) => bytes_read += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                return Err(FileError::read(path, e));
            }
        }
    }

    result.truncate(bytes_read);
    Ok(result)
}

fn has_utf16_le_bom(bytes: &[u8]) -> bool {
    bytes.len() > 1 && bytes[0] == 0xff && bytes[1] == 0xfe
}

/// Decode UTF-16LE code units (BOM already stripped) into a `String`.
fn transcode_utf16_le(path: &Path, bytes: &[u8]) -> FileResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(FileError::Encoding {
            path: path.to_path_buf(),
            reason: "odd number of bytes in UTF-16LE content".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| FileError::Encoding {
        path: path.to_path_buf(),
        reason: format!("failed to convert from UTF-16LE to UTF-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn read_small_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small");
        fs::write(&path, b"hello").unwrap();

        let bytes = read_file(&path, None).unwrap();
        assert_eq!(bytes.as_slice(), b"hello");
    }

    #[test]
    fn read_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let bytes = read_file(&path, None).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn undersized_hint_grows_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big");
        let data = patterned(300_000);
        fs::write(&path, &data).unwrap();

        let bytes = read_file(&path, Some(10)).unwrap();
        assert_eq!(bytes.as_slice(), data.as_slice());
    }

    #[test]
    fn exact_hint_on_buffer_boundary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boundary");
        let data = patterned(MIN_READ_SIZE + 1);
        fs::write(&path, &data).unwrap();

        // Initial buffer is exactly the file size, so the first read fills it.
        let bytes = read_file(&path, Some(MIN_READ_SIZE as u64)).unwrap();
        assert_eq!(bytes.as_slice(), data.as_slice());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_file(dir.path().join("missing"), None).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, FileError::Stat { .. }));

        let err = read_file(dir.path().join("missing"), Some(10)).unwrap_err();
        assert!(matches!(err, FileError::OpenRead { .. }));
    }

    #[test]
    fn read_part_ranges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("part");
        let data = patterned(5000);
        fs::write(&path, &data).unwrap();

        let part = read_file_part(&path, 0, 10).unwrap();
        assert_eq!(part.as_slice(), &data[..10]);

        let part = read_file_part(&path, 1234, 2000).unwrap();
        assert_eq!(part.as_slice(), &data[1234..3234]);

        let part = read_file_part(&path, 4990, 100).unwrap();
        assert_eq!(part.as_slice(), &data[4990..]);

        let part = read_file_part(&path, 6000, 100).unwrap();
        assert!(part.is_empty());
    }

    #[test]
    fn read_part_count_beyond_end_returns_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ten");
        fs::write(&path, b"0123456789").unwrap();

        let part = read_file_part(&path, 4, usize::MAX).unwrap();
        assert_eq!(part.as_slice(), b"456789");

        let part = read_file_part(&path, 0, usize::MAX).unwrap();
        assert_eq!(part.as_slice(), b"0123456789");
    }

    #[test]
    fn read_part_grows_past_first_chunk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big");
        let data = patterned(PART_CHUNK_SIZE * 3 + 11);
        fs::write(&path, &data).unwrap();

        let part = read_file_part(&path, 7, PART_CHUNK_SIZE * 2 + 1).unwrap();
        assert_eq!(part.as_slice(), &data[7..7 + PART_CHUNK_SIZE * 2 + 1]);

        let part = read_file_part(&path, 100, 1 << 40).unwrap();
        assert_eq!(part.as_slice(), &data[100..]);
    }

    #[test]
    fn oversized_hint_is_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ten");
        fs::write(&path, b"0123456789").unwrap();

        let bytes = read_file(&path, Some(u64::MAX)).unwrap();
        assert_eq!(bytes.as_slice(), b"0123456789");
    }

    #[test]
    fn read_part_zero_count_skips_open() {
        let dir = TempDir::new().unwrap();
        let part = read_file_part(dir.path().join("does-not-exist"), 42, 0).unwrap();
        assert!(part.is_empty());
    }

    #[test]
    fn read_part_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_file_part(dir.path().join("missing"), 0, 1).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn text_read_validates_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("text");
        fs::write(&path, "ключ = значение\n").unwrap();
        assert_eq!(read_file_to_string(&path, None).unwrap(), "ключ = значение\n");

        let bad = dir.path().join("bad");
        fs::write(&bad, [0xc3, 0x28]).unwrap();
        let err = read_file_to_string(&bad, None).unwrap_err();
        assert!(matches!(err, FileError::Encoding { .. }));
    }

    #[test]
    fn utf16_le_transcoding() {
        let text = "héllo wörld";
        let mut encoded = Vec::new();
        for unit in text.encode_utf16() {
            encoded.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = transcode_utf16_le(Path::new("t"), &encoded).unwrap();
        assert_eq!(decoded, text);

        assert!(has_utf16_le_bom(&[0xff, 0xfe, b'a', 0]));
        assert!(!has_utf16_le_bom(&[0xff]));
        assert!(transcode_utf16_le(Path::new("t"), &[0x41]).is_err());
        // Lone high surrogate.
        assert!(transcode_utf16_le(Path::new("t"), &[0x00, 0xd8]).is_err());
    }
}
