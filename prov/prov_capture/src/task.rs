//! Views of the kernel task the recorder reads from.
//!
//! The recorder never walks kernel structures directly. Hook glue implements
//! [`TaskSource`] over the real task; tests and the CLI use
//! [`SimTask`](crate::sim::SimTask).

use bitflags::bitflags;
use std::sync::Arc;

use prov_core::types::Namespaces;

use crate::entry::ProvEntry;

/// Size of a memory page in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// Credentials of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
    /// Security id.
    pub secid: u32,
}

/// CPU time consumed by a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// User time in nanoseconds.
    pub utime_ns: u64,
    /// System time in nanoseconds.
    pub stime_ns: u64,
}

/// I/O accounting of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAccounting {
    /// Storage-level accounting is available.
    Storage {
        /// Bytes fetched from storage.
        read_bytes: u64,
        /// Bytes sent to storage.
        write_bytes: u64,
        /// Bytes whose write was cancelled, e.g. by truncation.
        cancelled_write_bytes: u64,
    },
    /// Only syscall-level character counts are available.
    Chars {
        /// Characters read.
        rchar: u64,
        /// Characters written.
        wchar: u64,
    },
}

impl Default for IoAccounting {
    fn default() -> Self {
        Self::Chars { rchar: 0, wchar: 0 }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Protection and sharing bits of a memory mapping
    pub struct VmFlags: u64 {
        /// Readable
        const READ = 0x0000_0001;
        /// Writable
        const WRITE = 0x0000_0002;
        /// Executable
        const EXEC = 0x0000_0004;
        /// Currently shared
        const SHARED = 0x0000_0008;
        /// May be shared
        const MAYSHARE = 0x0000_0080;
    }
}

/// A file object with its provenance entry.
#[derive(Debug)]
pub struct FileObject {
    /// Path the file was opened through.
    pub path: String,
    /// Provenance of the file's inode.
    pub prov: ProvEntry,
}

/// One memory mapping.
#[derive(Debug, Clone)]
pub struct VmArea {
    /// Start address.
    pub start: u64,
    /// End address.
    pub end: u64,
    /// Protection and sharing bits.
    pub flags: VmFlags,
    /// Mapped file, if any.
    pub file: Option<Arc<FileObject>>,
}

/// Memory state of a task. Sizes are in pages.
#[derive(Debug, Clone, Default)]
pub struct MmSnapshot {
    /// Total mapped pages.
    pub total_vm: u64,
    /// Resident pages.
    pub rss: u64,
    /// High-water mark of mapped pages.
    pub hiwater_vm: u64,
    /// High-water mark of resident pages.
    pub hiwater_rss: u64,
    /// Mappings.
    pub areas: Vec<VmArea>,
}

/// What the recorder needs to know about a running task.
pub trait TaskSource: Send + Sync {
    /// Global pid.
    fn pid(&self) -> u32;

    /// Pid inside the task's pid namespace.
    fn vpid(&self) -> u32;

    /// Thread group id.
    fn tgid(&self) -> u32;

    /// Current credentials.
    fn credentials(&self) -> Credentials;

    /// Namespace ids.
    fn namespaces(&self) -> Namespaces;

    /// CPU time consumed.
    fn cpu_times(&self) -> CpuTimes;

    /// I/O accounting.
    fn io(&self) -> IoAccounting;

    /// Memory state; `None` for kernel threads.
    fn mm(&self) -> Option<MmSnapshot>;

    /// Executable the task runs.
    fn exe_file(&self) -> Option<Arc<FileObject>>;
}

/// The exec argument area: `argc` NUL-terminated arguments followed by
/// `envc` NUL-terminated environment strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecArgs {
    buf: Vec<u8>,
    argc: usize,
    envc: usize,
}

impl ExecArgs {
    /// Pack arguments and environment strings.
    pub fn new<A, E>(argv: &[A], envp: &[E]) -> Self
    where
        A: AsRef<[u8]>,
        E: AsRef<[u8]>,
    {
        let mut buf = Vec::new();
        for s in argv.iter().map(AsRef::as_ref).chain(envp.iter().map(AsRef::as_ref)) {
            buf.extend_from_slice(s);
            buf.push(0);
        }
        Self {
            buf,
            argc: argv.len(),
            envc: envp.len(),
        }
    }

    /// Wrap an already packed area.
    pub fn from_packed(buf: Vec<u8>, argc: usize, envc: usize) -> Self {
        Self { buf, argc, envc }
    }

    /// Number of arguments.
    pub fn argc(&self) -> usize {
        self.argc
    }

    /// Number of environment strings.
    pub fn envc(&self) -> usize {
        self.envc
    }

    /// Whether the area holds nothing.
    pub fn is_empty(&self) -> bool {
        self.argc == 0 && self.envc == 0
    }

    /// Arguments, without their terminators.
    pub fn argv(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.strings().take(self.argc)
    }

    /// Environment strings, without their terminators.
    pub fn envp(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.strings().skip(self.argc).take(self.envc)
    }

    // A missing final terminator still yields the trailing string; a short
    // area yields fewer strings than argc + envc.
    fn strings(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let body = self.buf.strip_suffix(&[0]).unwrap_or(&self.buf);
        let empty = self.buf.is_empty();
        body.split(|b| *b == 0).filter(move |_| !empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_args_split() {
        let args = ExecArgs::new(&["/bin/ls", "-l"], &["HOME=/root"]);
        assert_eq!(args.argc(), 2);
        assert_eq!(args.envc(), 1);

        let argv: Vec<&[u8]> = args.argv().collect();
        assert_eq!(argv, vec![&b"/bin/ls"[..], &b"-l"[..]]);
        let envp: Vec<&[u8]> = args.envp().collect();
        assert_eq!(envp, vec![&b"HOME=/root"[..]]);
    }

    #[test]
    fn test_exec_args_packed() {
        let args = ExecArgs::from_packed(b"sh\0-c\0\0PATH=/bin\0".to_vec(), 3, 1);
        let argv: Vec<&[u8]> = args.argv().collect();
        assert_eq!(argv, vec![&b"sh"[..], &b"-c"[..], &b""[..]]);
        assert_eq!(args.envp().count(), 1);
    }

    #[test]
    fn test_exec_args_empty() {
        let args = ExecArgs::default();
        assert!(args.is_empty());
        assert_eq!(args.argv().count(), 0);
        assert_eq!(args.envp().count(), 0);
    }

    #[test]
    fn test_short_area_yields_fewer_strings() {
        let args = ExecArgs::from_packed(b"only\0".to_vec(), 2, 2);
        assert_eq!(args.argv().count(), 1);
        assert_eq!(args.envp().count(), 0);
    }
}
