//! Cross-process coordination for ccstore
//!
//! Implements advisory locking for cache entries:
//! - [`LockFile`]: an exclusive OS-level lock on a file beside the entry,
//!   acquired with bounded retry/backoff and released when the guard drops
//! - [`LockPool`]: a per-process registry of held locks so a long-running
//!   process pays the acquisition cost for each key once
//!
//! ## Liveness
//!
//! The OS lock belongs to the open descriptor. A process that dies releases
//! every lock it held, so no stale-lock heuristics exist.
//!
//! ## Ordering
//!
//! Processes that lock several keys must lock them in one globally agreed
//! order. The pool releases in reverse acquisition order.

mod lock;
mod options;
mod platform;
mod pool;

pub use lock::{LockError, LockFile, LockResult};
pub use options::LockOptions;
pub use pool::{DirLocker, LockPool, Locker, PooledLock};
