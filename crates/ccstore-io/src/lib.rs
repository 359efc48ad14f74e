//! ccstore I/O primitives
//!
//! Byte-level file operations shared by every process that touches the
//! cache directory:
//! - Retrying read/write loops that hide `EINTR`/`EAGAIN`
//! - Whole-file and byte-range readers returning [`Bytes`]
//! - In-place and replacing writers
//! - Atomic publish (write to a temporary file, then rename onto the target)
//! - Space preallocation with a portable fallback
//! - Timestamp updates for recency tracking
//!
//! None of these functions lock anything. Callers that need a single winner
//! per cache entry must hold the entry's lock (see `ccstore-lock`) around the
//! operation.

mod buffer;
mod cachedir;
mod error;
mod prealloc;
mod read;
mod retry;
mod temp;
mod timestamps;
mod write;

pub use buffer::Bytes;
pub use cachedir::{create_cachedir_tag, CACHEDIR_TAG_CONTENT};
pub use error::{FileError, FileResult};
pub use prealloc::fallocate;
pub use read::{read_file, read_file_part, read_file_to_string};
pub use retry::{read_all, write_all, READ_BUFFER_SIZE};
pub use temp::{is_temporary_file, sweep_orphaned_temporaries, TemporaryFile};
pub use timestamps::set_timestamps;
pub use write::{copy_file, publish, publish_with, rename, write_file, ViaTmpFile, WriteMode};
