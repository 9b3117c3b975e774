//! Fixed-capacity object pool.
//!
//! All objects are created up front. Acquisition either fails fast when the
//! pool is empty ([`AllocMode::NoWait`], for callers that must not sleep) or
//! waits up to a timeout for an object to be returned. Objects go back to the
//! pool when their [`Pooled`] handle is dropped.

use log::{debug, trace};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::atomic::AtomicCounter;

/// Error returned when an object cannot be acquired from the pool
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Every object is in use and the caller did not want to wait
    #[error("object pool exhausted")]
    Exhausted,

    /// No object was returned within the timeout
    #[error("timed out after {0:?} waiting for a pooled object")]
    Timeout(Duration),
}

/// How to behave when the pool is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocMode {
    /// Fail immediately.
    NoWait,
    /// Wait up to the given duration.
    Wait(Duration),
}

/// Statistics about pool usage
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects owned by the pool
    pub capacity: usize,
    /// Objects currently available
    pub available: usize,
    /// Successful acquisitions
    pub acquired: u64,
    /// Failed acquisitions
    pub failed: u64,
}

/// A pool of reusable objects
pub struct ObjectPool<T> {
    free: Mutex<Vec<T>>,
    returned: Condvar,
    capacity: usize,
    reset: fn(&mut T),
    acquired: AtomicCounter,
    failed: AtomicCounter,
}

impl<T> ObjectPool<T> {
    /// Create a pool of `capacity` objects built by `create`. `reset` runs on
    /// every object as it comes back.
    pub fn new(capacity: usize, create: impl FnMut() -> T, reset: fn(&mut T)) -> Self {
        let free: Vec<T> = std::iter::repeat_with(create).take(capacity).collect();
        debug!("Object pool initialized with {} objects", capacity);
        Self {
            free: Mutex::new(free),
            returned: Condvar::new(),
            capacity,
            reset,
            acquired: AtomicCounter::new(),
            failed: AtomicCounter::new(),
        }
    }

    /// Take an object out of the pool.
    pub fn acquire(&self, mode: AllocMode) -> Result<Pooled<'_, T>, PoolError> {
        let result = match mode {
            // Contention counts as exhaustion so the caller never blocks.
            AllocMode::NoWait => self
                .free
                .try_lock()
                .and_then(|mut free| free.pop())
                .ok_or(PoolError::Exhausted),
            AllocMode::Wait(timeout) => self.wait_for_object(timeout),
        };

        match result {
            Ok(object) => {
                self.acquired.increment();
                Ok(Pooled {
                    object: Some(object),
                    pool: self,
                })
            }
            Err(e) => {
                self.failed.increment();
                trace!("Pool acquisition failed: {}", e);
                Err(e)
            }
        }
    }

    /// Shorthand for `acquire(AllocMode::NoWait)`.
    pub fn try_acquire(&self) -> Result<Pooled<'_, T>, PoolError> {
        self.acquire(AllocMode::NoWait)
    }

    /// Number of objects currently available.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Number of objects owned by the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the statistics for this pool
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            available: self.available(),
            acquired: self.acquired.get(),
            failed: self.failed.get(),
        }
    }

    fn wait_for_object(&self, timeout: Duration) -> Result<T, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut free = self.free.lock();
        loop {
            if let Some(object) = free.pop() {
                return Ok(object);
            }
            if self.returned.wait_until(&mut free, deadline).timed_out() {
                return free.pop().ok_or(PoolError::Timeout(timeout));
            }
        }
    }

    fn release(&self, mut object: T) {
        (self.reset)(&mut object);
        self.free.lock().push(object);
        self.returned.notify_one();
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// An object borrowed from an [`ObjectPool`].
///
/// The object returns to the pool when the handle is dropped.
pub struct Pooled<'a, T> {
    object: Option<T>,
    pool: &'a ObjectPool<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the object out.
        match &self.object {
            Some(object) => object,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.object {
            Some(object) => object,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.pool.release(object);
        }
    }
}
