//! Cache directory tag (see <https://bford.info/cachedir/>).

use std::path::Path;
use tracing::debug;

use crate::write::{write_file, WriteMode};

/// Content of `CACHEDIR.TAG`. Backup tools look for the signature line.
pub const CACHEDIR_TAG_CONTENT: &str = "Signature: 8a477f597d28d172789f06886806bc55\n\
# This file is a cache directory tag created by ccstore.\n\
# For information about cache directory tags, see:\n\
#\thttps://bford.info/cachedir/\n";

/// Write `CACHEDIR.TAG` into `dir` unless it already exists.
///
/// Failures are logged and otherwise ignored.
pub fn create_cachedir_tag(dir: &Path) {
    let path = dir.join("CACHEDIR.TAG");
    if path.exists() {
        return;
    }
    if let Err(e) = write_file(&path, CACHEDIR_TAG_CONTENT, WriteMode::Replace) {
        debug!("Failed to create {}: {}", path.display(), e);
    }
}
