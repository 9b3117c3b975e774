//! Per-entry lock with usage statistics.
//!
//! Every provenance entry owns one [`ProvLock`]. Guards are scoped and
//! release the lock on drop, so every exit path (early return, `?`, panic
//! unwinding) unlocks. Callers keep critical sections short: no allocation,
//! string formatting or sink emission happens while a guard is alive.

use log::{trace, warn};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error when acquiring a lock
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The lock could not be acquired within the specified timeout
    #[error("lock acquisition timed out after {0:?}")]
    Timeout(Duration),
}

/// Statistics about lock usage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockStats {
    /// Number of successful lock acquisitions
    pub acquisition_count: usize,

    /// Acquisitions that found the lock held
    pub contended_count: usize,

    /// Number of failed lock acquisition attempts
    pub failed_count: usize,

    /// Total time spent waiting for the lock (microseconds)
    pub total_wait_time_us: u64,

    /// Total time the lock was held (microseconds)
    pub total_hold_time_us: u64,

    /// Maximum time the lock was held (microseconds)
    pub max_hold_time_us: u64,
}

#[derive(Debug, Default)]
struct Counters {
    acquisition_count: AtomicUsize,
    contended_count: AtomicUsize,
    failed_count: AtomicUsize,
    total_wait_time_us: AtomicU64,
    total_hold_time_us: AtomicU64,
    max_hold_time_us: AtomicU64,
}

/// A mutex that records how it is used.
///
/// The `class` names the kind of object the lock protects ("task", "inode",
/// ...) and shows up in trace output.
pub struct ProvLock<T> {
    mutex: Mutex<T>,
    counters: Counters,
    class: &'static str,
}

/// A guard for a [`ProvLock`]
pub struct ProvLockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    acquired_at: Instant,
    counters: &'a Counters,
    class: &'static str,
}

impl<T> ProvLock<T> {
    /// Create a new lock
    pub fn new(value: T) -> Self {
        Self::with_class(value, "unnamed")
    }

    /// Create a new lock for a class of objects
    pub fn with_class(value: T, class: &'static str) -> Self {
        Self {
            mutex: Mutex::new(value),
            counters: Counters::default(),
            class,
        }
    }

    /// Lock, blocking until the lock is available
    pub fn lock(&self) -> ProvLockGuard<'_, T> {
        if let Some(guard) = self.mutex.try_lock() {
            return self.acquired(guard, Duration::ZERO);
        }

        self.counters.contended_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let guard = self.mutex.lock();
        self.acquired(guard, start.elapsed())
    }

    /// Lock without waiting
    pub fn try_lock(&self) -> Option<ProvLockGuard<'_, T>> {
        match self.mutex.try_lock() {
            Some(guard) => Some(self.acquired(guard, Duration::ZERO)),
            None => {
                self.counters.failed_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Lock, giving up after `timeout`
    pub fn try_lock_for(&self, timeout: Duration) -> Result<ProvLockGuard<'_, T>, LockError> {
        let start = Instant::now();
        match self.mutex.try_lock_for(timeout) {
            Some(guard) => Ok(self.acquired(guard, start.elapsed())),
            None => {
                self.counters.failed_count.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Lock timeout: {} (timeout: {:.2}ms)",
                    self.class,
                    timeout.as_secs_f64() * 1000.0
                );
                Err(LockError::Timeout(timeout))
            }
        }
    }

    /// Run `f` with the lock held
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Consume the lock, returning the protected value
    pub fn into_inner(self) -> T {
        self.mutex.into_inner()
    }

    /// Class of the protected object
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Get the statistics for this lock
    pub fn stats(&self) -> LockStats {
        LockStats {
            acquisition_count: self.counters.acquisition_count.load(Ordering::Relaxed),
            contended_count: self.counters.contended_count.load(Ordering::Relaxed),
            failed_count: self.counters.failed_count.load(Ordering::Relaxed),
            total_wait_time_us: self.counters.total_wait_time_us.load(Ordering::Relaxed),
            total_hold_time_us: self.counters.total_hold_time_us.load(Ordering::Relaxed),
            max_hold_time_us: self.counters.max_hold_time_us.load(Ordering::Relaxed),
        }
    }

    fn acquired<'a>(&'a self, guard: MutexGuard<'a, T>, waited: Duration) -> ProvLockGuard<'a, T> {
        self.counters
            .acquisition_count
            .fetch_add(1, Ordering::Relaxed);
        self.counters
            .total_wait_time_us
            .fetch_add(waited.as_micros() as u64, Ordering::Relaxed);

        trace!(
            "Lock acquired: {} (wait time: {:.2}ms)",
            self.class,
            waited.as_secs_f64() * 1000.0
        );

        ProvLockGuard {
            guard,
            acquired_at: Instant::now(),
            counters: &self.counters,
            class: self.class,
        }
    }
}

impl<T: Default> Default for ProvLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ProvLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ProvLock");
        dbg.field("class", &self.class);
        match self.mutex.try_lock() {
            Some(value) => dbg.field("value", &*value),
            None => dbg.field("value", &"<locked>"),
        };
        dbg.finish()
    }
}

impl<T> Drop for ProvLockGuard<'_, T> {
    fn drop(&mut self) {
        let held = self.acquired_at.elapsed();
        let held_us = held.as_micros() as u64;

        self.counters
            .total_hold_time_us
            .fetch_add(held_us, Ordering::Relaxed);
        self.counters
            .max_hold_time_us
            .fetch_max(held_us, Ordering::Relaxed);

        trace!(
            "Lock released: {} (held for: {:.2}ms)",
            self.class,
            held.as_secs_f64() * 1000.0
        );
    }
}

impl<T> std::ops::Deref for ProvLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> std::ops::DerefMut for ProvLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
