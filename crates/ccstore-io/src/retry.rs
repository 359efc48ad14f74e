//! Read/write loops that retry transient failures.
//!
//! Callers see either complete success or an error. Partial progress before a
//! hard error is not reported: after an error the state of the destination is
//! unreliable.

use std::io::{self, Read, Write};

/// Size of the transfer buffer used by [`read_all`].
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Read from `reader` until end of data, handing each non-empty chunk to
/// `receiver`.
///
/// Interrupted reads are retried. An error from `receiver` stops the loop and
/// is returned as is.
pub fn read_all<R, F>(reader: &mut R, mut receiver: F) -> io::Result<()>
where
    R: Read + ?Sized,
    F: FnMut(&[u8]) -> io::Result<()>,
{
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => receiver(&buffer[..n])?,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Write all of `data` to `writer`.
///
/// Interrupted and would-block writes are retried. A writer that accepts zero
/// bytes while data remains yields `ErrorKind::WriteZero`.
pub fn write_all<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "writer accepted no bytes",
                ))
            }
            Ok(n) => written += n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                continue
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
