//! Data structures for graph nodes, payloads, labels and records.

pub mod ifc;
pub mod long;
pub mod node;
pub mod record;

pub use ifc::{IfcContext, IfcLabel, LabelSlot, IFC_LABEL_MAX_SIZE};
pub use long::{BoundedStr, LongPayload, MachineInfo, MAX_PAYLOAD_LEN, PATH_MAX};
pub use node::{
    IattrInfo, InodeInfo, MsgInfo, Namespaces, NodeInfo, PacketInfo, ProcInfo, ShmInfo,
    SuperblockInfo, TaskInfo, KB, KB_MASK,
};
pub use record::{
    timestamp_ns, EndpointSnapshot, LongRecord, NodeRecord, ProvRecord, RelationRecord,
};
