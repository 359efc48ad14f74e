//! Built-in defaults
//!
//! Hardcoded defaults for every configuration value. A config file only
//! needs to mention what it changes.

/// Total lock wait in milliseconds (default: 5000)
pub const LOCK_TIMEOUT_MS: u64 = 5_000;

/// First retry delay in milliseconds (default: 10)
pub const LOCK_MIN_BACKOFF_MS: u64 = 10;

/// Retry delay cap in milliseconds (default: 100)
pub const LOCK_MAX_BACKOFF_MS: u64 = 100;

/// Contention warning threshold in milliseconds (default: 500)
pub const LOCK_CONTENTION_WARNING_MS: u64 = 500;

/// Preallocate before publishing large entries (default: true)
pub const PREALLOCATE: bool = true;

/// Entries at least this large are preallocated (default: 1 MiB)
pub const PREALLOCATE_MIN_BYTES: u64 = 1024 * 1024;

/// Update timestamps on a cache hit (default: true)
pub const TOUCH_ON_HIT: bool = true;

/// Age after which temporary files count as orphaned (default: 1 hour)
pub const ORPHAN_TEMP_AGE_SECS: u64 = 3600;
