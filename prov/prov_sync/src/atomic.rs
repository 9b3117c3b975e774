//! Lock-free counters and sequence numbers.

use std::sync::atomic::{AtomicU64, Ordering};

/// A statistics counter.
///
/// Counters only feed diagnostics, so they use relaxed ordering.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    /// Create a counter starting at zero.
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter and return the new value.
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Add `n` and return the new value.
    pub fn add(&self, n: u64) -> u64 {
        self.value.fetch_add(n, Ordering::Relaxed).wrapping_add(n)
    }

    /// Get the current value of the counter.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset the counter to zero, returning the old value.
    pub fn reset(&self) -> u64 {
        self.value.swap(0, Ordering::Relaxed)
    }
}

/// A sequence number that can be safely incremented across threads.
///
/// Every call to [`next`](AtomicSequence::next) returns a distinct value.
#[derive(Debug)]
pub struct AtomicSequence {
    value: AtomicU64,
}

impl AtomicSequence {
    /// Create a new atomic sequence starting from the specified value.
    pub const fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    /// Get the next sequence number.
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }

    /// Get the next sequence number without consuming it.
    pub fn peek(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter() {
        let counter = AtomicCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.add(4), 5);
        assert_eq!(counter.get(), 5);
        assert_eq!(counter.reset(), 5);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_sequence() {
        let seq = AtomicSequence::new(10);
        assert_eq!(seq.next(), 10);
        assert_eq!(seq.next(), 11);
        assert_eq!(seq.peek(), 12);
    }

    #[test]
    fn test_sequence_is_unique_across_threads() {
        let seq = Arc::new(AtomicSequence::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..500).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
