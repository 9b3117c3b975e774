//! # Prov Core
//!
//! `prov_core` provides the data model of the provenance capture engine:
//! the bit-packed type taxonomy, typed identifiers, information-flow-control
//! labels, node metadata, ephemeral payloads and the records handed to a
//! graph sink.
//!
//! The capture engine observes security-relevant kernel operations and turns
//! them into a W3C PROV-like graph: nodes are activities (tasks), entities
//! (files, credentials, packets, ...) and agents (users, the machine); edges
//! are typed relations. Every node and edge type is a single 64-bit
//! identifier whose layout is shared with the tools that decode captured
//! graphs.
//!
//! ## Crate Structure
//!
//! - **taxonomy**: Type identifiers, their class hierarchy and names
//! - **id**: Strongly-typed node and relation identifiers
//! - **types**: Labels, node metadata, payloads and wire records
//! - **error**: Error types for all prov components
//! - **utils**: Shared helpers

pub mod error;
pub mod id;
pub mod taxonomy;
pub mod types;
pub mod utils;

pub use error::{ConfigError, Error, LabelError, RecordError, Result, TaxonomyError};
pub use id::{Identifier, NodeId, RelationId, Session};
pub use taxonomy::{FlowDecision, ProvClass, ProvType, RelationClass};
pub use types::{
    BoundedStr, EndpointSnapshot, IfcContext, IfcLabel, LabelSlot, LongPayload, LongRecord,
    MachineInfo, NodeInfo, NodeRecord, ProvRecord, RelationRecord,
};
pub use utils::LogLevel;
