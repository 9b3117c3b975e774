//! Records handed to the graph sink.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ifc::IfcContext;
use super::long::LongPayload;
use super::node::NodeInfo;
use crate::id::{NodeId, RelationId};
use crate::taxonomy::{FlowDecision, ProvType};

/// Nanoseconds since the UNIX epoch.
pub fn timestamp_ns() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// A persistent node as of emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identifier, carrying the node type.
    pub id: NodeId,
    /// Kind-specific metadata.
    pub info: NodeInfo,
    /// Labels.
    pub labels: IfcContext,
}

/// An ephemeral payload node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    /// Identifier, carrying the node type.
    pub id: NodeId,
    /// Content.
    pub payload: LongPayload,
}

/// An edge endpoint as of emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    /// Endpoint identifier.
    pub id: NodeId,
    /// Endpoint labels.
    pub labels: IfcContext,
}

/// One edge of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    /// Identifier, carrying the relation type.
    pub id: RelationId,
    /// Nanoseconds since the UNIX epoch.
    pub timestamp: i64,
    /// Source.
    pub from: EndpointSnapshot,
    /// Destination.
    pub to: EndpointSnapshot,
    /// Hook-specific flags, e.g. VM protection bits.
    pub flags: u64,
    /// Optional context, e.g. the path of the file involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Access-control decision.
    #[serde(default)]
    pub flow: FlowDecision,
}

impl RelationRecord {
    /// Relation type.
    pub fn kind(&self) -> ProvType {
        self.id.prov_type()
    }

    /// Emission time.
    pub fn time(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.timestamp)
    }
}

/// Anything the sink receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvRecord {
    /// A persistent node.
    Node(NodeRecord),
    /// An ephemeral node.
    Long(LongRecord),
    /// An edge.
    Relation(RelationRecord),
}

impl ProvRecord {
    /// Type of the node or relation.
    pub fn prov_type(&self) -> ProvType {
        match self {
            Self::Node(node) => node.id.prov_type(),
            Self::Long(long) => long.id.prov_type(),
            Self::Relation(relation) => relation.kind(),
        }
    }

    /// The relation, if this is one.
    pub fn as_relation(&self) -> Option<&RelationRecord> {
        match self {
            Self::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    /// Identifier of the node, if this is one.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Node(node) => Some(node.id),
            Self::Long(long) => Some(long.id),
            Self::Relation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Session;
    use crate::taxonomy::{activity, entity, relation};
    use crate::types::long::BoundedStr;

    fn sample_relation() -> RelationRecord {
        let session = Session::new(1, 2);
        let mut labels = IfcContext::default();
        labels.secrecy.add(77).unwrap();
        RelationRecord {
            id: RelationId::new(relation::READ, 10, session),
            timestamp: 1_700_000_000_000_000_000,
            from: EndpointSnapshot {
                id: NodeId::new(entity::INODE_FILE, 1, session),
                labels,
            },
            to: EndpointSnapshot {
                id: NodeId::new(activity::TASK, 2, session),
                labels: IfcContext::default(),
            },
            flags: 0,
            context: Some("/etc/passwd".to_string()),
            flow: FlowDecision::Allowed,
        }
    }

    #[test]
    fn test_relation_accessors() {
        let record = sample_relation();
        assert_eq!(record.kind(), relation::READ);
        assert_eq!(record.time().timestamp(), 1_700_000_000);
        let wrapped = ProvRecord::Relation(record);
        assert_eq!(wrapped.prov_type(), relation::READ);
        assert!(wrapped.node_id().is_none());
    }

    #[test]
    fn test_record_json_is_tagged() {
        let json = serde_json::to_value(ProvRecord::Relation(sample_relation())).unwrap();
        assert_eq!(json["kind"], "relation");
        assert_eq!(json["context"], "/etc/passwd");
        assert_eq!(json["flow"], "allowed");

        let long = ProvRecord::Long(LongRecord {
            id: NodeId::new(entity::ARG, 3, Session::new(1, 2)),
            payload: LongPayload::Arg {
                value: BoundedStr::new("-v"),
            },
        });
        let json = serde_json::to_value(&long).unwrap();
        assert_eq!(json["kind"], "long");
        assert_eq!(json["payload"]["payload"], "arg");
        let back: ProvRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, long);
    }

    #[test]
    fn test_timestamp_is_recent() {
        assert!(timestamp_ns() > 1_600_000_000_000_000_000);
    }
}
