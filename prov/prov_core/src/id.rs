//! Strongly-typed identifiers for graph nodes and relations.
//!
//! An identifier combines a taxonomy type, a sequence number unique within
//! the capture session, the boot session id and the machine id. Node and
//! relation identifiers share the same layout but are distinct types, so a
//! relation id can never be used where a node id is expected.
//!
//! # Examples
//!
//! ```
//! use prov_core::id::{NodeId, Session};
//! use prov_core::taxonomy::entity;
//!
//! let session = Session::new(7, 42);
//! let id = NodeId::new(entity::INODE_FILE, 1, session);
//! assert_eq!(id.boot_id(), 7);
//! assert_eq!(id.to_string(), "file:42:7:1.0");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::taxonomy::ProvType;

/// Boot session and machine that produced an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Session {
    /// Changes on every boot.
    pub boot_id: u32,
    /// Stable across boots.
    pub machine_id: u32,
}

impl Session {
    /// Create a session from known ids.
    pub fn new(boot_id: u32, machine_id: u32) -> Self {
        Self {
            boot_id,
            machine_id,
        }
    }

    /// Create a session with a random boot id.
    pub fn generate(machine_id: u32) -> Self {
        let bytes = Uuid::new_v4();
        let bytes = bytes.as_bytes();
        let boot_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Self::new(boot_id, machine_id)
    }
}

/// A type-safe graph identifier.
///
/// The phantom parameter `T` separates node identifiers from relation
/// identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier<T> {
    #[serde(rename = "type")]
    prov_type: ProvType,
    id: u64,
    boot_id: u32,
    machine_id: u32,
    version: u32,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Identifier<T> {
    /// Create version 0 of an identifier.
    pub fn new(prov_type: ProvType, id: u64, session: Session) -> Self {
        Self {
            prov_type,
            id,
            boot_id: session.boot_id,
            machine_id: session.machine_id,
            version: 0,
            _marker: PhantomData,
        }
    }

    /// Taxonomy type.
    pub fn prov_type(&self) -> ProvType {
        self.prov_type
    }

    /// Sequence number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Boot session id.
    pub fn boot_id(&self) -> u32 {
        self.boot_id
    }

    /// Machine id.
    pub fn machine_id(&self) -> u32 {
        self.machine_id
    }

    /// Version of the object this identifier names.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Same object, different taxonomy type.
    pub fn with_type(mut self, prov_type: ProvType) -> Self {
        self.prov_type = prov_type;
        self
    }

    /// Bump the version, returning the new one.
    pub fn next_version(&mut self) -> u32 {
        self.version = self.version.wrapping_add(1);
        self.version
    }

    /// Whether two identifiers name the same object, ignoring type and
    /// version.
    pub fn same_object(&self, other: &Self) -> bool {
        self.id == other.id && self.boot_id == other.boot_id && self.machine_id == other.machine_id
    }
}

impl<T> fmt::Display for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}.{}",
            self.prov_type, self.machine_id, self.boot_id, self.id, self.version
        )
    }
}

/// Marker type for nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeMarker;
/// Identifier for a graph node.
pub type NodeId = Identifier<NodeMarker>;

/// Marker type for relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationMarker;
/// Identifier for a graph relation.
pub type RelationId = Identifier<RelationMarker>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::{activity, relation};

    #[test]
    fn test_identifier_fields() {
        let session = Session::new(3, 9);
        let id = NodeId::new(activity::TASK, 17, session);
        assert_eq!(id.prov_type(), activity::TASK);
        assert_eq!(id.id(), 17);
        assert_eq!(id.boot_id(), 3);
        assert_eq!(id.machine_id(), 9);
        assert_eq!(id.version(), 0);
    }

    #[test]
    fn test_versioning() {
        let mut id = NodeId::new(activity::TASK, 1, Session::new(1, 1));
        let before = id;
        assert_eq!(id.next_version(), 1);
        assert_ne!(id, before);
        assert!(id.same_object(&before));
    }

    #[test]
    fn test_type_safety() {
        let session = Session::new(1, 1);
        let node = NodeId::new(activity::TASK, 5, session);
        let edge = RelationId::new(relation::READ, 5, session);
        // Same fields, different types:
        // let _: NodeId = edge;
        assert_eq!(node.id(), edge.id());
    }

    #[test]
    fn test_generated_sessions_differ() {
        let a = Session::generate(1);
        let b = Session::generate(1);
        assert_eq!(a.machine_id, b.machine_id);
        // 1 in 2^32 chance of a false failure
        assert_ne!(a.boot_id, b.boot_id);
    }

    #[test]
    fn test_id_serde() {
        let id = RelationId::new(relation::WRITE, 99, Session::new(2, 4));
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("\"type\""));
        let back: RelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
