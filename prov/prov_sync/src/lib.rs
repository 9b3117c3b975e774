#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Prov Sync
//!
//! Synchronization primitives for the provenance capture engine:
//!
//! - A per-entry lock with scoped guards and usage statistics
//! - Lock-free statistics counters and sequence numbers
//! - A fixed-capacity object pool with fail-fast and bounded-wait acquisition
//!
//! ## Integration with Other Prov Crates
//!
//! - **prov_capture**: Entry locks, identifier sequences, the long-entry pool
//!   and recorder statistics

/// Lock-free counters and sequence numbers
pub mod atomic;

/// Per-entry lock with statistics
pub mod lock;

/// Fixed-capacity object pool
pub mod pool;

pub use atomic::{AtomicCounter, AtomicSequence};
pub use lock::{LockError, LockStats, ProvLock, ProvLockGuard};
pub use pool::{AllocMode, ObjectPool, PoolError, PoolStats, Pooled};
