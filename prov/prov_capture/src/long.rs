//! Short-lived payload nodes: paths, exec arguments, strings.
//!
//! A long entry lives only for the duration of one recording. Entries are
//! drawn from a fixed pool so hooks that must not sleep can fail fast when
//! the pool is exhausted.

use prov_core::error::RecordError;
use prov_core::id::{NodeId, Session};
use prov_core::taxonomy::{entity, ProvType};
use prov_core::types::{BoundedStr, LongPayload, LongRecord};
use prov_sync::{AllocMode, ObjectPool, PoolError, PoolStats};
use tracing::trace;

use crate::ids::IdAllocator;

/// A payload-bearing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongProvEntry {
    id: NodeId,
    payload: LongPayload,
}

impl LongProvEntry {
    /// A long entry with a fresh identifier and an empty payload.
    pub fn new(prov_type: ProvType, ids: &IdAllocator) -> Result<Self, RecordError> {
        check_long(prov_type)?;
        Ok(Self {
            id: ids.node(prov_type),
            payload: LongPayload::for_type(prov_type),
        })
    }

    fn vacant() -> Self {
        Self {
            id: NodeId::new(entity::STR, 0, Session::new(0, 0)),
            payload: LongPayload::Empty,
        }
    }

    /// Identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Type.
    pub fn prov_type(&self) -> ProvType {
        self.id.prov_type()
    }

    /// Payload.
    pub fn payload(&self) -> &LongPayload {
        &self.payload
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: LongPayload) {
        self.payload = payload;
    }

    /// Set the main string content, truncating past the payload limit.
    ///
    /// Payloads without a string (machine descriptions) are left unchanged.
    pub fn set_value(&mut self, source: impl AsRef<[u8]>) {
        let bounded = BoundedStr::new(source);
        match &mut self.payload {
            LongPayload::Str { value }
            | LongPayload::Path { value, .. }
            | LongPayload::Arg { value }
            | LongPayload::Env { value }
            | LongPayload::Xattr { value, .. }
            | LongPayload::Address { value } => *value = bounded,
            LongPayload::Machine(_) | LongPayload::Empty => {}
        }
    }

    /// Set a path payload.
    pub fn set_path(&mut self, path: impl AsRef<[u8]>, is_link: bool) {
        self.payload = LongPayload::Path {
            value: BoundedStr::new(path),
            is_link,
        };
    }

    /// Record handed to the sink.
    pub fn to_record(&self) -> LongRecord {
        LongRecord {
            id: self.id,
            payload: self.payload.clone(),
        }
    }

    fn reset(&mut self) {
        self.payload = LongPayload::Empty;
    }
}

/// Fixed pool of long entries.
#[derive(Debug)]
pub struct LongEntryPool {
    pool: ObjectPool<LongProvEntry>,
}

impl LongEntryPool {
    /// A pool holding `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: ObjectPool::new(capacity, LongProvEntry::vacant, LongProvEntry::reset),
        }
    }

    /// Run `f` on a freshly initialised long entry of the given type.
    ///
    /// The entry goes back to the pool when `f` returns, so it never
    /// outlives one recording.
    pub fn with_long<R>(
        &self,
        ids: &IdAllocator,
        prov_type: ProvType,
        mode: AllocMode,
        f: impl FnOnce(&mut LongProvEntry) -> R,
    ) -> Result<R, RecordError> {
        check_long(prov_type)?;
        let mut entry = self.pool.acquire(mode).map_err(|e| {
            trace!(kind = ?prov_type, error = %e, "long entry allocation failed");
            match e {
                PoolError::Exhausted | PoolError::Timeout(_) => RecordError::OutOfMemory,
            }
        })?;
        entry.id = ids.node(prov_type);
        entry.payload = LongPayload::for_type(prov_type);
        Ok(f(&mut *entry))
    }

    /// Pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

fn check_long(prov_type: ProvType) -> Result<(), RecordError> {
    if prov_type.is_node() && prov_type.is_long() {
        Ok(())
    } else {
        Err(RecordError::InvalidNode(prov_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_core::taxonomy::agent;
    use prov_core::types::PATH_MAX;

    fn ids() -> IdAllocator {
        IdAllocator::new(Session::new(1, 1))
    }

    #[test]
    fn test_with_long_initialises_entry() {
        let ids = ids();
        let pool = LongEntryPool::new(2);

        let record = pool
            .with_long(&ids, entity::ARG, AllocMode::NoWait, |entry| {
                entry.set_value("--verbose");
                entry.to_record()
            })
            .unwrap();

        assert_eq!(record.id.prov_type(), entity::ARG);
        assert_eq!(
            record.payload.value().unwrap().to_string_lossy(),
            "--verbose"
        );
        assert_eq!(pool.stats().available, 2);
    }

    #[test]
    fn test_exhausted_pool_is_out_of_memory() {
        let ids = ids();
        let pool = LongEntryPool::new(1);

        let nested = pool
            .with_long(&ids, entity::STR, AllocMode::NoWait, |_| {
                pool.with_long(&ids, entity::STR, AllocMode::NoWait, |_| ())
            })
            .unwrap();

        assert_eq!(nested, Err(RecordError::OutOfMemory));
        assert_eq!(pool.stats().failed, 1);
    }

    #[test]
    fn test_rejects_persistent_types() {
        let pool = LongEntryPool::new(1);
        let result = pool.with_long(&ids(), entity::INODE_FILE, AllocMode::NoWait, |_| ());
        assert_eq!(result, Err(RecordError::InvalidNode(entity::INODE_FILE)));
        assert!(LongProvEntry::new(agent::MACHINE, &ids()).is_ok());
    }

    #[test]
    fn test_long_path_is_truncated() {
        let mut entry = LongProvEntry::new(entity::PATH, &ids()).unwrap();
        let path = "a".repeat(PATH_MAX + 10);
        entry.set_path(&path, false);

        assert!(entry.payload().is_truncated());
        assert_eq!(entry.payload().value().unwrap().len(), PATH_MAX);
    }
}
