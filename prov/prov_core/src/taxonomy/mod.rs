//! Provenance type taxonomy.
//!
//! Every node and relation kind is a single 64-bit identifier. The upper 16
//! bits (`TYPE_MASK`) hold the W3C PROV class (relation, activity, entity or
//! agent), the `LONG` node flag, the `ALLOWED`/`DISALLOWED` relation flags and,
//! for relations, one second-level class bit (derived, generated, used,
//! informed, influenced or associated). The lower 48 bits (`SUBTYPE_MASK`)
//! hold exactly one subtype bit.
//!
//! The layout is shared with tooling that decodes captured graphs, so the
//! values of the constants in [`relation`], [`activity`], [`agent`] and
//! [`entity`] are part of the wire format and must never be renumbered.
//!
//! # Examples
//!
//! ```
//! use prov_core::taxonomy::{relation, ProvType, RelationClass, RELATION};
//!
//! let rename = relation::RENAME;
//! assert!(rename.is_a(RELATION));
//! assert!(rename.is_a(relation::GENERATED.bits()));
//! assert_eq!(rename.relation_class(), Some(RelationClass::Generated));
//!
//! let same = ProvType::compose(rename.class_bits(), rename.subtype_bits()).unwrap();
//! assert_eq!(same, rename);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaxonomyError;

/// Class and flag half of an identifier.
pub const TYPE_MASK: u64 = 0xFFFF_0000_0000_0000;

/// Subtype half of an identifier.
pub const SUBTYPE_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// Number of usable subtype bits. A subtype bit index must stay below this
/// value so that it can never alias a class or flag bit.
pub const SUBTYPE_BITS: u32 = 48;

/// W3C PROV relation class.
pub const RELATION: u64 = 0x8000_0000_0000_0000;
/// W3C PROV activity class.
pub const ACTIVITY: u64 = 0x4000_0000_0000_0000;
/// W3C PROV entity class.
pub const ENTITY: u64 = 0x2000_0000_0000_0000;
/// W3C PROV agent class.
pub const AGENT: u64 = 0x1000_0000_0000_0000;

/// Node carries a variable-size payload and is never tracked.
pub const LONG: u64 = 0x0400_0000_0000_0000;
/// Relation was allowed by the access-control layer.
pub const ALLOWED: u64 = 0x0200_0000_0000_0000;
/// Relation was denied by the access-control layer.
pub const DISALLOWED: u64 = 0x0100_0000_0000_0000;

const PRIMARY_MASK: u64 = RELATION | ACTIVITY | ENTITY | AGENT;
const SECOND_LEVEL_MASK: u64 = 0x00FC_0000_0000_0000;
const FLOW_MASK: u64 = ALLOWED | DISALLOWED;
const KNOWN_CLASS_BITS: u64 = PRIMARY_MASK | LONG | FLOW_MASK | SECOND_LEVEL_MASK;

/// Declares the type constants of one taxonomy module together with their
/// presentation names.
macro_rules! prov_types {
    ($( $(#[$meta:meta])* $name:ident = $value:expr => $label:literal; )+) => {
        $(
            $(#[$meta])*
            pub const $name: $crate::taxonomy::ProvType = $value;
        )+

        pub(crate) const ENTRIES: &[$crate::taxonomy::TypeEntry] = &[
            $( $crate::taxonomy::TypeEntry::new($name, $label), )+
        ];

        const _: () = assert!(
            $crate::taxonomy::all_distinct(ENTRIES),
            "two taxonomy constants share a value"
        );
    };
}

pub mod activity;
pub mod agent;
pub mod entity;
pub mod relation;
mod table;

pub use table::{lookup, lookup_name, type_table, TypeEntry};

/// A validated provenance type identifier.
///
/// Values can only be obtained from the predefined constants, from
/// [`ProvType::compose`] or from [`ProvType::from_raw`], all of which reject
/// combinations that do not follow the class/subtype layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ProvType(u64);

/// Second-level class of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationClass {
    /// wasDerivedFrom
    Derived,
    /// wasGeneratedBy
    Generated,
    /// used
    Used,
    /// wasInformedBy
    Informed,
    /// wasInfluencedBy
    Influenced,
    /// wasAssociatedWith
    Associated,
}

impl RelationClass {
    /// All relation classes, in bit order.
    pub const ALL: [RelationClass; 6] = [
        Self::Derived,
        Self::Generated,
        Self::Used,
        Self::Informed,
        Self::Influenced,
        Self::Associated,
    ];

    /// The class mask (relation bit plus second-level bit).
    pub const fn mask(self) -> ProvType {
        match self {
            Self::Derived => relation::DERIVED,
            Self::Generated => relation::GENERATED,
            Self::Used => relation::USED,
            Self::Informed => relation::INFORMED,
            Self::Influenced => relation::INFLUENCED,
            Self::Associated => relation::ASSOCIATED,
        }
    }

    /// Lower-case name of the class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Derived => "derived",
            Self::Generated => "generated",
            Self::Used => "used",
            Self::Informed => "informed",
            Self::Influenced => "influenced",
            Self::Associated => "associated",
        }
    }
}

/// Decoded class of a type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvClass {
    /// An edge of the graph.
    Relation(RelationClass),
    /// A process-like node.
    Activity,
    /// A data-like node.
    Entity,
    /// A principal-like node.
    Agent,
}

/// Access-control decision stamped on a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDecision {
    /// No decision was recorded.
    #[default]
    Unknown,
    /// The flow was permitted.
    Allowed,
    /// The flow was denied.
    Disallowed,
}

/// `id & TYPE_MASK`
pub const fn class_of(id: u64) -> u64 {
    id & TYPE_MASK
}

/// `id & SUBTYPE_MASK`
pub const fn subtype_of(id: u64) -> u64 {
    id & SUBTYPE_MASK
}

/// Class membership by bit-AND equality.
pub const fn is_a(id: u64, mask: u64) -> bool {
    id & mask == mask
}

impl ProvType {
    /// Build a relation subtype constant. Panics during constant evaluation
    /// if the layout rules are broken.
    pub(crate) const fn relation_subtype(class: ProvType, bit: u32) -> ProvType {
        assert!(bit < SUBTYPE_BITS, "relation subtype bit outside SUBTYPE_MASK");
        assert!(class.0 & RELATION != 0, "relation subtype needs the relation class");
        assert!(
            (class.0 & SECOND_LEVEL_MASK).count_ones() == 1,
            "relation subtype needs exactly one second-level class"
        );
        ProvType(class.0 | (1u64 << bit))
    }

    /// Build a node subtype constant. Panics during constant evaluation if
    /// the layout rules are broken.
    pub(crate) const fn node_subtype(class: u64, bit: u32) -> ProvType {
        assert!(bit < SUBTYPE_BITS, "node subtype bit outside SUBTYPE_MASK");
        assert!(class & RELATION == 0, "node subtype cannot carry the relation class");
        assert!(
            (class & PRIMARY_MASK).count_ones() == 1,
            "node subtype needs exactly one class"
        );
        ProvType(class | (1u64 << bit))
    }

    /// Compose an identifier from a class half and a one-hot subtype.
    pub fn compose(class: u64, subtype: u64) -> Result<Self, TaxonomyError> {
        if class & SUBTYPE_MASK != 0 || class & !KNOWN_CLASS_BITS != 0 {
            return Err(TaxonomyError::InvalidClass(class));
        }
        if subtype & TYPE_MASK != 0 || subtype.count_ones() != 1 {
            return Err(TaxonomyError::InvalidSubtype(subtype));
        }
        if (class & PRIMARY_MASK).count_ones() != 1 {
            return Err(TaxonomyError::InvalidClass(class));
        }

        if class & RELATION != 0 {
            if (class & SECOND_LEVEL_MASK).count_ones() != 1 {
                return Err(TaxonomyError::InvalidClass(class));
            }
            if class & LONG != 0 || class & FLOW_MASK == FLOW_MASK {
                return Err(TaxonomyError::InvalidFlags(class));
            }
        } else {
            if class & SECOND_LEVEL_MASK != 0 {
                return Err(TaxonomyError::InvalidClass(class));
            }
            if class & FLOW_MASK != 0 {
                return Err(TaxonomyError::InvalidFlags(class));
            }
        }

        Ok(Self(class | subtype))
    }

    /// Validate a raw identifier read from the wire.
    pub fn from_raw(value: u64) -> Result<Self, TaxonomyError> {
        Self::compose(class_of(value), subtype_of(value))
    }

    /// Raw 64-bit value.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Class and flag half.
    pub const fn class_bits(self) -> u64 {
        class_of(self.0)
    }

    /// Subtype half.
    pub const fn subtype_bits(self) -> u64 {
        subtype_of(self.0)
    }

    /// Position of the subtype bit.
    pub const fn subtype_index(self) -> u32 {
        self.subtype_bits().trailing_zeros()
    }

    /// Class membership test, see [`is_a`].
    pub const fn is_a(self, mask: u64) -> bool {
        is_a(self.0, mask)
    }

    /// Whether this identifier denotes an edge.
    pub const fn is_relation(self) -> bool {
        self.is_a(RELATION)
    }

    /// Whether this identifier denotes a node.
    pub const fn is_node(self) -> bool {
        !self.is_relation()
    }

    /// Whether this identifier denotes a payload-bearing ephemeral node.
    pub const fn is_long(self) -> bool {
        self.is_a(LONG) && self.is_node()
    }

    /// wasDerivedFrom family
    pub const fn is_derived(self) -> bool {
        self.is_a(relation::DERIVED.0)
    }

    /// wasGeneratedBy family
    pub const fn is_generated(self) -> bool {
        self.is_a(relation::GENERATED.0)
    }

    /// used family
    pub const fn is_used(self) -> bool {
        self.is_a(relation::USED.0)
    }

    /// wasInformedBy family
    pub const fn is_informed(self) -> bool {
        self.is_a(relation::INFORMED.0)
    }

    /// wasInfluencedBy family
    pub const fn is_influenced(self) -> bool {
        self.is_a(relation::INFLUENCED.0)
    }

    /// wasAssociatedWith family
    pub const fn is_associated(self) -> bool {
        self.is_a(relation::ASSOCIATED.0)
    }

    /// Whether the relation ends the life of its object.
    pub fn is_close(self) -> bool {
        let kind = self.without_flow();
        kind == relation::TERMINATE_TASK
            || kind == relation::TERMINATE_PROC
            || kind == relation::FREED
    }

    /// Second-level class of a relation, `None` for nodes.
    pub fn relation_class(self) -> Option<RelationClass> {
        if !self.is_relation() {
            return None;
        }
        RelationClass::ALL
            .into_iter()
            .find(|class| self.is_a(class.mask().0))
    }

    /// Decode the class.
    pub fn class(self) -> ProvClass {
        if let Some(class) = self.relation_class() {
            ProvClass::Relation(class)
        } else if self.is_a(ACTIVITY) {
            ProvClass::Activity
        } else if self.is_a(ENTITY) {
            ProvClass::Entity
        } else {
            ProvClass::Agent
        }
    }

    /// Stamp an access-control decision on a relation. Nodes are returned
    /// unchanged.
    pub fn with_flow(self, decision: FlowDecision) -> Self {
        if !self.is_relation() {
            return self;
        }
        let base = self.0 & !FLOW_MASK;
        match decision {
            FlowDecision::Unknown => Self(base),
            FlowDecision::Allowed => Self(base | ALLOWED),
            FlowDecision::Disallowed => Self(base | DISALLOWED),
        }
    }

    /// Access-control decision carried by a relation.
    pub fn flow(self) -> FlowDecision {
        if self.is_a(ALLOWED) {
            FlowDecision::Allowed
        } else if self.is_a(DISALLOWED) {
            FlowDecision::Disallowed
        } else {
            FlowDecision::Unknown
        }
    }

    /// The identifier with its flow flags cleared.
    pub fn without_flow(self) -> Self {
        Self(self.0 & !FLOW_MASK)
    }

    /// Presentation name from the static table.
    pub fn name(self) -> Option<&'static str> {
        lookup(self).map(|entry| entry.name)
    }

    /// Whether nodes of this type carry uid/gid metadata.
    pub fn has_uid_gid(self) -> bool {
        matches!(
            self,
            entity::PROC
                | entity::INODE_UNKNOWN
                | entity::INODE_LINK
                | entity::INODE_FILE
                | entity::INODE_DIRECTORY
                | entity::INODE_CHAR
                | entity::INODE_BLOCK
                | entity::INODE_PIPE
                | entity::INODE_SOCKET
        )
    }

    /// Whether nodes of this type carry a security id.
    pub fn has_secid(self) -> bool {
        matches!(
            self,
            entity::PROC
                | entity::INODE_UNKNOWN
                | entity::INODE_LINK
                | entity::INODE_FILE
                | entity::INODE_DIRECTORY
                | entity::INODE_CHAR
                | entity::INODE_BLOCK
                | entity::INODE_PIPE
                | entity::INODE_SOCKET
        )
    }

    /// Whether this is one of the inode entity kinds.
    pub fn is_inode(self) -> bool {
        matches!(
            self,
            entity::INODE_UNKNOWN
                | entity::INODE_LINK
                | entity::INODE_FILE
                | entity::INODE_DIRECTORY
                | entity::INODE_CHAR
                | entity::INODE_BLOCK
                | entity::INODE_PIPE
                | entity::INODE_SOCKET
        )
    }
}

impl TryFrom<u64> for ProvType {
    type Error = TaxonomyError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl From<ProvType> for u64 {
    fn from(value: ProvType) -> Self {
        value.0
    }
}

impl fmt::Debug for ProvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "ProvType({:#018x} {})", self.0, name),
            None => write!(f, "ProvType({:#018x})", self.0),
        }
    }
}

impl fmt::Display for ProvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#018x}", self.0),
        }
    }
}

pub(crate) const fn all_distinct(entries: &[TypeEntry]) -> bool {
    let mut i = 0;
    while i < entries.len() {
        let mut j = i + 1;
        while j < entries.len() {
            if entries[i].id.0 == entries[j].id.0 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}
