//! Entity node kinds.
//!
//! Bits 6 to 19 are persistent kernel objects; bits 20 to 27 are `LONG`
//! payload nodes that only live for one recording call.

use super::{ProvType, ENTITY, LONG};

const fn object(bit: u32) -> ProvType {
    ProvType::node_subtype(ENTITY, bit)
}

const fn payload(bit: u32) -> ProvType {
    ProvType::node_subtype(ENTITY | LONG, bit)
}

prov_types! {
    INODE_UNKNOWN = object(6) => "inode_unknown";
    INODE_LINK = object(7) => "link";
    INODE_FILE = object(8) => "file";
    INODE_DIRECTORY = object(9) => "directory";
    INODE_CHAR = object(10) => "char";
    INODE_BLOCK = object(11) => "block";
    INODE_PIPE = object(12) => "pipe";
    INODE_SOCKET = object(13) => "socket";
    MSG = object(14) => "msg";
    SHM = object(15) => "shm";
    SUPERBLOCK = object(16) => "sb";
    PACKET = object(17) => "packet";
    IATTR = object(18) => "iattr";
    /// Process memory; the credentials of a task.
    PROC = object(19) => "process_memory";

    STR = payload(20) => "string";
    ADDRESS = payload(21) => "address";
    PATH = payload(22) => "path";
    XATTR = payload(23) => "xattr";
    PACKET_CONTENT = payload(24) => "packet_payload";
    ARG = payload(25) => "argv";
    ENV = payload(26) => "envp";
    ENTITY_DISCLOSED = payload(27) => "entity_disclosed";
}
