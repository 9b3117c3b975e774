//! Provenance entries attached to persistent kernel objects.
//!
//! An entry starts untracked. Access-control logic outside the recorder may
//! mark it tracked; an opaque ancestor may mark it opaque. Neither flag is
//! ever cleared, and an opaque entry never takes part in a recorded fact
//! again (its metadata may still be refreshed).

use bitflags::bitflags;
use std::fmt;

use prov_core::error::TaxonomyError;
use prov_core::id::NodeId;
use prov_core::taxonomy::{ProvType, LONG};
use prov_core::types::{EndpointSnapshot, IfcContext, NodeInfo, NodeRecord};
use prov_sync::{ProvLock, ProvLockGuard};

use crate::ids::IdAllocator;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Recording state of an entry
    pub struct EntryFlags: u32 {
        /// Selected for recording by access-control logic
        const TRACKED = 0b0000_0001;
        /// Never recorded again
        const OPAQUE = 0b0000_0010;
        /// The naming relation has been emitted
        const NAME_RECORDED = 0b0000_0100;
        /// The node record has been emitted
        const RECORDED = 0b0000_1000;
        /// The ran-on relation to the machine has been emitted
        const KERNEL_RECORDED = 0b0001_0000;
        /// Relations out of this entry make their destination tracked
        const PROPAGATE = 0b0010_0000;
    }
}

impl EntryFlags {
    /// Flags that can never be cleared once set.
    pub const STICKY: EntryFlags = EntryFlags::TRACKED.union(EntryFlags::OPAQUE);
}

/// The lock-protected part of an entry.
#[derive(Debug, Clone)]
pub struct EntryState {
    id: NodeId,
    info: NodeInfo,
    flags: EntryFlags,
    labels: IfcContext,
    last_incoming: Option<(NodeId, ProvType)>,
}

impl EntryState {
    /// Identifier, carrying the current type.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current type.
    pub fn prov_type(&self) -> ProvType {
        self.id.prov_type()
    }

    /// Kind-specific metadata.
    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Mutable kind-specific metadata.
    pub fn info_mut(&mut self) -> &mut NodeInfo {
        &mut self.info
    }

    /// Labels.
    pub fn labels(&self) -> &IfcContext {
        &self.labels
    }

    /// Mutable labels.
    pub fn labels_mut(&mut self) -> &mut IfcContext {
        &mut self.labels
    }

    /// Recording flags.
    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Whether the entry is tracked.
    pub fn is_tracked(&self) -> bool {
        self.flags.contains(EntryFlags::TRACKED)
    }

    /// Whether the entry is opaque.
    pub fn is_opaque(&self) -> bool {
        self.flags.contains(EntryFlags::OPAQUE)
    }

    /// Whether the naming relation has been emitted.
    pub fn is_name_recorded(&self) -> bool {
        self.flags.contains(EntryFlags::NAME_RECORDED)
    }

    /// Whether the node record has been emitted.
    pub fn is_recorded(&self) -> bool {
        self.flags.contains(EntryFlags::RECORDED)
    }

    /// Whether relations out of this entry propagate tracking.
    pub fn is_propagating(&self) -> bool {
        self.flags.contains(EntryFlags::PROPAGATE)
    }

    /// Mark the entry tracked.
    pub fn set_tracked(&mut self) {
        self.flags.insert(EntryFlags::TRACKED);
    }

    /// Mark the entry opaque. Permanent.
    pub fn set_opaque(&mut self) {
        self.flags.insert(EntryFlags::OPAQUE);
    }

    /// Make relations out of this entry propagate tracking.
    pub fn set_propagate(&mut self) {
        self.flags.insert(EntryFlags::PROPAGATE);
    }

    /// Reclassify the entry, e.g. once an inode's mode is known.
    ///
    /// Only persistent node types are accepted. The metadata block is reset
    /// when the new type belongs to a different object family.
    pub fn set_type(&mut self, prov_type: ProvType) -> Result<(), TaxonomyError> {
        check_persistent(prov_type)?;
        if !self.info.fits(prov_type) {
            self.info = NodeInfo::for_type(prov_type);
        }
        self.id = self.id.with_type(prov_type);
        Ok(())
    }

    /// Node record as of now.
    pub fn node_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id,
            info: self.info,
            labels: self.labels,
        }
    }

    /// Endpoint snapshot as of now.
    pub fn endpoint(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            id: self.id,
            labels: self.labels,
        }
    }

    /// Set a non-sticky flag, returning whether this call set it.
    pub(crate) fn claim(&mut self, flag: EntryFlags) -> bool {
        debug_assert!(!flag.intersects(EntryFlags::STICKY));
        let claimed = !self.flags.contains(flag);
        self.flags.insert(flag);
        claimed
    }

    /// Undo a [`claim`](Self::claim).
    pub(crate) fn release(&mut self, flag: EntryFlags) {
        self.flags.remove(flag.difference(EntryFlags::STICKY));
    }

    pub(crate) fn last_incoming(&self) -> Option<(NodeId, ProvType)> {
        self.last_incoming
    }

    pub(crate) fn set_last_incoming(&mut self, last: Option<(NodeId, ProvType)>) {
        self.last_incoming = last;
    }
}

/// A provenance entry: node identity, metadata, labels and flags behind one
/// lock.
pub struct ProvEntry {
    state: ProvLock<EntryState>,
}

impl ProvEntry {
    /// A fresh, untracked entry of a persistent node type.
    pub fn new(prov_type: ProvType, ids: &IdAllocator) -> Result<Self, TaxonomyError> {
        check_persistent(prov_type)?;
        let state = EntryState {
            id: ids.node(prov_type),
            info: NodeInfo::for_type(prov_type),
            flags: EntryFlags::empty(),
            labels: IfcContext::default(),
            last_incoming: None,
        };
        Ok(Self {
            state: ProvLock::with_class(state, prov_type.name().unwrap_or("entry")),
        })
    }

    /// Lock the entry.
    pub fn lock(&self) -> ProvLockGuard<'_, EntryState> {
        self.state.lock()
    }

    /// Lock statistics.
    pub fn lock_stats(&self) -> prov_sync::LockStats {
        self.state.stats()
    }

    /// Identifier.
    pub fn id(&self) -> NodeId {
        self.lock().id()
    }

    /// Current type.
    pub fn prov_type(&self) -> ProvType {
        self.lock().prov_type()
    }

    /// Whether the entry is tracked.
    pub fn is_tracked(&self) -> bool {
        self.lock().is_tracked()
    }

    /// Whether the entry is opaque.
    pub fn is_opaque(&self) -> bool {
        self.lock().is_opaque()
    }

    /// Mark the entry tracked.
    pub fn set_tracked(&self) {
        self.lock().set_tracked();
    }

    /// Mark the entry opaque. Permanent.
    pub fn set_opaque(&self) {
        self.lock().set_opaque();
    }

    /// Make relations out of this entry propagate tracking.
    pub fn set_propagate(&self) {
        self.lock().set_propagate();
    }

    /// Flags as of now.
    pub fn flags(&self) -> EntryFlags {
        self.lock().flags()
    }
}

impl fmt::Debug for ProvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvEntry").field("state", &self.state).finish()
    }
}

fn check_persistent(prov_type: ProvType) -> Result<(), TaxonomyError> {
    if !prov_type.is_node() {
        return Err(TaxonomyError::NotANode(prov_type));
    }
    if prov_type.is_long() {
        return Err(TaxonomyError::InvalidFlags(prov_type.class_bits() & LONG));
    }
    Ok(())
}
