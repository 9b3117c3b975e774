//! Identifier allocation.

use prov_core::id::{NodeId, RelationId, Session};
use prov_core::taxonomy::ProvType;
use prov_sync::AtomicSequence;

/// Hands out node and relation identifiers for one boot session.
///
/// Sequence numbers start at 1 and are never reused within a session.
#[derive(Debug)]
pub struct IdAllocator {
    session: Session,
    nodes: AtomicSequence,
    relations: AtomicSequence,
}

impl IdAllocator {
    /// An allocator for the given session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            nodes: AtomicSequence::new(1),
            relations: AtomicSequence::new(1),
        }
    }

    /// The session stamped on every identifier.
    pub fn session(&self) -> Session {
        self.session
    }

    /// A fresh node identifier.
    pub fn node(&self, prov_type: ProvType) -> NodeId {
        NodeId::new(prov_type, self.nodes.next(), self.session)
    }

    /// A fresh relation identifier.
    pub fn relation(&self, prov_type: ProvType) -> RelationId {
        RelationId::new(prov_type, self.relations.next(), self.session)
    }
}
