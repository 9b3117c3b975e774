//! Kind-specific metadata carried by persistent provenance nodes.
//!
//! Which metadata block a node carries is decided by its taxonomy type;
//! see [`NodeInfo::for_type`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::{activity, entity, ProvType};

/// Kibibyte.
pub const KB: u64 = 1024;

/// Mask applied to I/O byte counters, rounding them down to whole KB.
pub const KB_MASK: u64 = !(KB - 1);

/// Namespace identifiers of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespaces {
    /// UTS namespace.
    pub utsns: u32,
    /// IPC namespace.
    pub ipcns: u32,
    /// Mount namespace.
    pub mntns: u32,
    /// PID namespace (of children).
    pub pidns: u32,
    /// Network namespace.
    pub netns: u32,
    /// Cgroup namespace.
    pub cgroupns: u32,
}

/// Task (activity) metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Global pid.
    pub pid: u32,
    /// Pid as seen from the task's namespace.
    pub vpid: u32,
    /// User CPU time in microseconds.
    pub utime: u64,
    /// System CPU time in microseconds.
    pub stime: u64,
    /// Virtual memory size in KB.
    pub vm: u64,
    /// Resident set size in KB.
    pub rss: u64,
    /// Virtual memory high-water mark in KB.
    pub hw_vm: u64,
    /// Resident set high-water mark in KB.
    pub hw_rss: u64,
    /// Bytes read, rounded down to KB.
    pub rbytes: u64,
    /// Bytes written, rounded down to KB.
    pub wbytes: u64,
    /// Cancelled write bytes, rounded down to KB.
    pub cancel_wbytes: u64,
    /// Namespace ids.
    pub namespaces: Namespaces,
}

/// Credential (process memory) metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcInfo {
    /// Thread group id.
    pub tgid: u32,
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
    /// Security id.
    pub secid: u32,
}

/// Inode metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// File mode bits.
    pub mode: u16,
    /// Security id.
    pub secid: u32,
    /// Inode number.
    pub ino: u64,
    /// Superblock the inode lives on.
    pub sb_uuid: Uuid,
}

/// Message queue message metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsgInfo {
    /// Message type.
    pub msg_type: i64,
}

/// Shared memory segment metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShmInfo {
    /// Permission bits.
    pub mode: u16,
}

/// Superblock metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuperblockInfo {
    /// File system UUID.
    pub uuid: Uuid,
}

/// Inode attribute change metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IattrInfo {
    /// Which attributes are valid.
    pub valid: u32,
    /// New mode.
    pub mode: u16,
    /// New owner.
    pub uid: u32,
    /// New group.
    pub gid: u32,
    /// New size.
    pub size: i64,
    /// Access time, seconds.
    pub atime: i64,
    /// Modification time, seconds.
    pub mtime: i64,
    /// Change time, seconds.
    pub ctime: i64,
}

/// Network packet metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketInfo {
    /// IP identification field.
    pub id: u16,
    /// Sender address.
    pub snd_ip: u32,
    /// Receiver address.
    pub rcv_ip: u32,
    /// Sender port.
    pub snd_port: u16,
    /// Receiver port.
    pub rcv_port: u16,
    /// IP protocol number.
    pub protocol: u8,
    /// Packet length.
    pub length: u32,
}

/// Metadata of a persistent node, one variant per object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum NodeInfo {
    /// Tasks.
    Task(TaskInfo),
    /// Credentials.
    Proc(ProcInfo),
    /// Every inode kind.
    Inode(InodeInfo),
    /// Message queue messages.
    Msg(MsgInfo),
    /// Shared memory segments.
    Shm(ShmInfo),
    /// Superblocks.
    Superblock(SuperblockInfo),
    /// Attribute changes.
    Iattr(IattrInfo),
    /// Packets.
    Packet(PacketInfo),
    /// Kinds without metadata (users, groups).
    Empty,
}

impl NodeInfo {
    /// Fresh metadata for a node of the given type.
    pub fn for_type(prov_type: ProvType) -> Self {
        if prov_type == activity::TASK {
            return Self::Task(TaskInfo::default());
        }
        if prov_type.is_inode() {
            return Self::Inode(InodeInfo::default());
        }
        match prov_type {
            entity::PROC => Self::Proc(ProcInfo::default()),
            entity::MSG => Self::Msg(MsgInfo::default()),
            entity::SHM => Self::Shm(ShmInfo::default()),
            entity::SUPERBLOCK => Self::Superblock(SuperblockInfo::default()),
            entity::IATTR => Self::Iattr(IattrInfo::default()),
            entity::PACKET => Self::Packet(PacketInfo::default()),
            _ => Self::Empty,
        }
    }

    /// Whether this metadata block is the right one for the given type.
    pub fn fits(&self, prov_type: ProvType) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::for_type(prov_type))
    }

    /// Task metadata, if this is a task.
    pub fn as_task(&self) -> Option<&TaskInfo> {
        match self {
            Self::Task(info) => Some(info),
            _ => None,
        }
    }

    /// Mutable task metadata, if this is a task.
    pub fn as_task_mut(&mut self) -> Option<&mut TaskInfo> {
        match self {
            Self::Task(info) => Some(info),
            _ => None,
        }
    }

    /// Credential metadata, if this is a credential.
    pub fn as_proc(&self) -> Option<&ProcInfo> {
        match self {
            Self::Proc(info) => Some(info),
            _ => None,
        }
    }

    /// Mutable credential metadata, if this is a credential.
    pub fn as_proc_mut(&mut self) -> Option<&mut ProcInfo> {
        match self {
            Self::Proc(info) => Some(info),
            _ => None,
        }
    }

    /// Inode metadata, if this is an inode.
    pub fn as_inode(&self) -> Option<&InodeInfo> {
        match self {
            Self::Inode(info) => Some(info),
            _ => None,
        }
    }

    /// Mutable inode metadata, if this is an inode.
    pub fn as_inode_mut(&mut self) -> Option<&mut InodeInfo> {
        match self {
            Self::Inode(info) => Some(info),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::agent;

    #[test]
    fn test_for_type() {
        assert!(matches!(NodeInfo::for_type(activity::TASK), NodeInfo::Task(_)));
        assert!(matches!(NodeInfo::for_type(entity::PROC), NodeInfo::Proc(_)));
        assert!(matches!(NodeInfo::for_type(entity::INODE_PIPE), NodeInfo::Inode(_)));
        assert!(matches!(NodeInfo::for_type(entity::SUPERBLOCK), NodeInfo::Superblock(_)));
        assert_eq!(NodeInfo::for_type(agent::USER), NodeInfo::Empty);
    }

    #[test]
    fn test_fits() {
        let info = NodeInfo::for_type(entity::INODE_FILE);
        assert!(info.fits(entity::INODE_DIRECTORY));
        assert!(!info.fits(entity::PROC));
        assert!(!info.fits(activity::TASK));
    }

    #[test]
    fn test_accessors() {
        let mut info = NodeInfo::for_type(activity::TASK);
        info.as_task_mut().unwrap().pid = 12;
        assert_eq!(info.as_task().unwrap().pid, 12);
        assert!(info.as_proc().is_none());
        assert!(info.as_inode().is_none());
    }

    #[test]
    fn test_kb_mask() {
        assert_eq!(4097 & KB_MASK, 4096);
        assert_eq!(1023 & KB_MASK, 0);
    }
}
