//! In-memory task used by tests and the command-line driver.

use parking_lot::Mutex;
use std::sync::Arc;

use prov_core::types::Namespaces;

use crate::task::{Credentials, CpuTimes, FileObject, IoAccounting, MmSnapshot, TaskSource};

/// A task whose every property is set by the caller.
#[derive(Debug, Default)]
pub struct SimTask {
    pid: u32,
    vpid: u32,
    tgid: u32,
    credentials: Credentials,
    namespaces: Namespaces,
    cpu: CpuTimes,
    io: IoAccounting,
    mm: Mutex<Option<MmSnapshot>>,
    exe: Option<Arc<FileObject>>,
}

impl SimTask {
    /// A task with the given pid, used as vpid and tgid too.
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            vpid: pid,
            tgid: pid,
            ..Self::default()
        }
    }

    /// Set the namespace-local pid.
    pub fn with_vpid(mut self, vpid: u32) -> Self {
        self.vpid = vpid;
        self
    }

    /// Set the thread group id.
    pub fn with_tgid(mut self, tgid: u32) -> Self {
        self.tgid = tgid;
        self
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the namespace ids.
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Set the CPU times.
    pub fn with_cpu_times(mut self, cpu: CpuTimes) -> Self {
        self.cpu = cpu;
        self
    }

    /// Set the I/O accounting.
    pub fn with_io(mut self, io: IoAccounting) -> Self {
        self.io = io;
        self
    }

    /// Set the memory state.
    pub fn with_mm(self, mm: MmSnapshot) -> Self {
        *self.mm.lock() = Some(mm);
        self
    }

    /// Set the executable.
    pub fn with_exe(mut self, exe: Arc<FileObject>) -> Self {
        self.exe = Some(exe);
        self
    }

    /// Drop the memory state, as when a task exits.
    pub fn release_mm(&self) {
        *self.mm.lock() = None;
    }
}

impl TaskSource for SimTask {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn vpid(&self) -> u32 {
        self.vpid
    }

    fn tgid(&self) -> u32 {
        self.tgid
    }

    fn credentials(&self) -> Credentials {
        self.credentials
    }

    fn namespaces(&self) -> Namespaces {
        self.namespaces
    }

    fn cpu_times(&self) -> CpuTimes {
        self.cpu
    }

    fn io(&self) -> IoAccounting {
        self.io
    }

    fn mm(&self) -> Option<MmSnapshot> {
        self.mm.lock().clone()
    }

    fn exe_file(&self) -> Option<Arc<FileObject>> {
        self.exe.clone()
    }
}
