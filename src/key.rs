//! Cache keys and the paths derived from them.
//!
//! Entries use a two-level fan-out: `<root>/<hex[0:2]>/<hex>`. The entry's
//! lock file sits beside it as `<root>/<hex[0:2]>/<hex>.lock`.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// An opaque cache key, usually a content hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    bytes: Vec<u8>,
}

impl CacheKey {
    /// Wrap raw key bytes. Empty keys are rejected.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> StoreResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        Ok(Self { bytes })
    }

    /// Key for `data`: its SHA-256 digest.
    pub fn from_content(data: &[u8]) -> Self {
        Self {
            bytes: Sha256::digest(data).to_vec(),
        }
    }

    /// Parse a hex-encoded key.
    pub fn from_hex(hex_key: &str) -> StoreResult<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| StoreError::InvalidKey(format!("{hex_key:?}: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Path relative to the cache root, with `/` separators.
    ///
    /// This doubles as the lock pool key.
    pub fn relative_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], hex)
    }

    /// Path of the entry under `root`.
    pub fn entry_path(&self, root: &Path) -> PathBuf {
        let hex = self.to_hex();
        root.join(&hex[..2]).join(hex)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
