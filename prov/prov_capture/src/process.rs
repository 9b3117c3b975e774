//! Processes known to the recorder.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use prov_core::error::{RecordError, TaxonomyError};
use prov_core::taxonomy::{activity, entity};

use crate::entry::ProvEntry;
use crate::ids::IdAllocator;
use crate::task::TaskSource;

/// A task with its task and credential provenance entries.
pub struct Process {
    task: Arc<dyn TaskSource>,
    task_prov: ProvEntry,
    cred_prov: ProvEntry,
}

impl Process {
    /// Attach fresh, untracked entries to a task.
    pub fn new(task: Arc<dyn TaskSource>, ids: &IdAllocator) -> Result<Self, TaxonomyError> {
        Ok(Self {
            task,
            task_prov: ProvEntry::new(activity::TASK, ids)?,
            cred_prov: ProvEntry::new(entity::PROC, ids)?,
        })
    }

    /// The task.
    pub fn task(&self) -> &dyn TaskSource {
        self.task.as_ref()
    }

    /// Provenance of the task (activity).
    pub fn task_prov(&self) -> &ProvEntry {
        &self.task_prov
    }

    /// Provenance of the task's credentials (process memory).
    pub fn cred_prov(&self) -> &ProvEntry {
        &self.cred_prov
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.task.pid())
            .field("task_prov", &self.task_prov)
            .field("cred_prov", &self.cred_prov)
            .finish()
    }
}

/// Live processes indexed by pid as seen from their namespace.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: DashMap<u32, Arc<Process>>,
}

impl ProcessTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process under its vpid, replacing any previous one.
    pub fn insert(&self, process: Process) -> Arc<Process> {
        let vpid = process.task().vpid();
        let process = Arc::new(process);
        if self.processes.insert(vpid, Arc::clone(&process)).is_some() {
            debug!(vpid, "replaced process entry");
        }
        process
    }

    /// Forget a process.
    pub fn remove(&self, vpid: u32) -> Option<Arc<Process>> {
        self.processes.remove(&vpid).map(|(_, process)| process)
    }

    /// Look a process up by vpid.
    pub fn from_vpid(&self, vpid: u32) -> Result<Arc<Process>, RecordError> {
        self.processes
            .get(&vpid)
            .map(|process| Arc::clone(process.value()))
            .ok_or_else(|| RecordError::NotFound(format!("no process with vpid {vpid}")))
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
