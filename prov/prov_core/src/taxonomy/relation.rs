//! Relation (edge) kinds, grouped by second-level class.

use super::{ProvType, RELATION};

/// wasDerivedFrom
pub const DERIVED: ProvType = ProvType(RELATION | 0x0080_0000_0000_0000);
/// wasGeneratedBy
pub const GENERATED: ProvType = ProvType(RELATION | 0x0040_0000_0000_0000);
/// used
pub const USED: ProvType = ProvType(RELATION | 0x0020_0000_0000_0000);
/// wasInformedBy
pub const INFORMED: ProvType = ProvType(RELATION | 0x0010_0000_0000_0000);
/// wasInfluencedBy
pub const INFLUENCED: ProvType = ProvType(RELATION | 0x0008_0000_0000_0000);
/// wasAssociatedWith
pub const ASSOCIATED: ProvType = ProvType(RELATION | 0x0004_0000_0000_0000);

const fn derived(bit: u32) -> ProvType {
    ProvType::relation_subtype(DERIVED, bit)
}

const fn generated(bit: u32) -> ProvType {
    ProvType::relation_subtype(GENERATED, bit)
}

const fn used(bit: u32) -> ProvType {
    ProvType::relation_subtype(USED, bit)
}

const fn informed(bit: u32) -> ProvType {
    ProvType::relation_subtype(INFORMED, bit)
}

const fn influenced(bit: u32) -> ProvType {
    ProvType::relation_subtype(INFLUENCED, bit)
}

const fn associated(bit: u32) -> ProvType {
    ProvType::relation_subtype(ASSOCIATED, bit)
}

prov_types! {
    /// A name (path) was given to an object.
    NAMED = derived(0) => "named";
    /// New version of an entity.
    VERSION_ENTITY = derived(1) => "version_entity";
    SEND_PACKET = derived(2) => "send_packet";
    SEND_UNIX = derived(3) => "send_unix";
    RECEIVE_PACKET = derived(4) => "receive_packet";
    RECEIVE_UNIX = derived(5) => "receive_unix";
    /// Object was freed.
    FREED = derived(6) => "closed";
    SETATTR_INODE = derived(7) => "setattr_inode";
    ACCEPT_SOCKET = derived(8) => "accept_socket";
    GETXATTR_INODE = derived(9) => "getxattr_inode";
    SETXATTR_INODE = derived(10) => "setxattr_inode";
    REMOVEXATTR_INODE = derived(11) => "removexattr_inode";
    EXEC = derived(12) => "exec";
    /// Process memory went away.
    TERMINATE_PROC = derived(13) => "terminate_proc";
    /// Exec argument linked to the new credentials.
    ARG = derived(14) => "arg";
    /// Exec environment variable linked to the new credentials.
    ENV = derived(15) => "env";
    /// Read through a shared mapping.
    SH_READ = derived(16) => "sh_read";
    /// Write through a shared mapping.
    SH_WRITE = derived(17) => "sh_write";
    PACKET_CONTENT = derived(18) => "packet_content";
    ADDRESSED = derived(19) => "addressed";
    DERIVED_DISCLOSED = derived(20) => "derived_disclosed";

    CLONE_MEM = generated(0) => "clone_mem";
    MSG_CREATE = generated(1) => "msg_create";
    SOCKET_CREATE = generated(2) => "socket_create";
    SOCKET_PAIR_CREATE = generated(3) => "socket_pair_create";
    INODE_CREATE = generated(4) => "inode_create";
    WRITE = generated(5) => "write";
    WRITE_IOCTL = generated(6) => "write_ioctl";
    PROC_WRITE = generated(7) => "memory_write";
    CONNECT = generated(8) => "connect";
    CONNECT_UNIX_STREAM = generated(9) => "connect_unix_stream";
    LISTEN = generated(10) => "listen";
    BIND = generated(11) => "bind";
    SEND = generated(12) => "send";
    SEND_MSG = generated(13) => "send_msg";
    SEND_MSG_QUEUE = generated(14) => "send_msg_queue";
    LINK = generated(15) => "link";
    RENAME = generated(16) => "rename";
    UNLINK = generated(17) => "unlink";
    SYMLINK = generated(18) => "symlink";
    SETATTR = generated(19) => "setattr";
    SETXATTR = generated(20) => "setxattr";
    REMOVEXATTR = generated(21) => "removexattr";
    SHMDT = generated(22) => "shmdt";
    SETUID = generated(23) => "setuid";
    SETGID = generated(24) => "setgid";
    SH_ATTACH = generated(25) => "sh_attach";
    SH_CREATE = generated(26) => "sh_create";
    FILE_LOCK = generated(27) => "file_lock";
    MUNMAP = generated(28) => "munmap";
    SPLICE_OUT = generated(29) => "splice_out";
    EXEC_TASK = generated(30) => "exec_task";
    PTRACE_ATTACH = generated(31) => "ptrace_attach";
    GENERATED_DISCLOSED = generated(32) => "generated_disclosed";

    READ = used(0) => "read";
    READ_IOCTL = used(1) => "read_ioctl";
    PROC_READ = used(2) => "memory_read";
    ACCEPT = used(3) => "accept";
    RECEIVE = used(4) => "receive";
    RECEIVE_MSG = used(5) => "receive_msg";
    RECEIVE_MSG_QUEUE = used(6) => "receive_msg_queue";
    OPEN = used(7) => "open";
    FILE_RCV = used(8) => "file_rcv";
    FILE_SIGIO = used(9) => "file_sigio";
    SEARCH = used(10) => "search";
    GETATTR = used(11) => "getattr";
    READ_LINK = used(12) => "readlink";
    GETXATTR = used(13) => "getxattr";
    LISTXATTR = used(14) => "listxattr";
    LOG = used(15) => "log";
    PERM = used(16) => "perm_check";
    GETGID = used(17) => "getgid";
    SPLICE_IN = used(18) => "splice_in";
    MMAP = used(19) => "mmap";
    MMAP_PRIVATE = used(20) => "mmap_private";
    LOAD_FILE = used(21) => "load_file";
    PTRACE_READ = used(22) => "ptrace_read";
    USED_DISCLOSED = used(23) => "used_disclosed";

    CLONE = informed(0) => "clone";
    VERSION_TASK = informed(1) => "version_activity";
    /// Task exited.
    TERMINATE_TASK = informed(2) => "terminate_task";
    PTRACE_ATTACH_TASK = informed(3) => "ptrace_attach_task";
    PTRACE_READ_TASK = informed(4) => "ptrace_read_task";
    PTRACE_TRACEME = informed(5) => "ptrace_traceme";
    INFORMED_DISCLOSED = informed(6) => "informed_disclosed";

    LOAD_UNKNOWN = influenced(0) => "load_unknown";
    LOAD_FIRMWARE = influenced(1) => "load_firmware";
    LOAD_MODULE = influenced(2) => "load_module";
    LOAD_KEXEC_IMAGE = influenced(3) => "load_kexec_image";
    LOAD_KEXEC_INITRAMFS = influenced(4) => "load_kexec_initramfs";
    LOAD_POLICY = influenced(5) => "load_policy";
    LOAD_CERTIFICATE = influenced(6) => "load_certificate";
    LOAD_UNDEFINED = influenced(7) => "load_undefined";
    INFLUENCED_DISCLOSED = influenced(8) => "influenced_disclosed";

    /// Task ran on the machine.
    RAN_ON = associated(0) => "ran_on";
    ASSOCIATED_DISCLOSED = associated(1) => "associated_disclosed";
}
