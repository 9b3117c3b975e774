//! The recording protocol.
//!
//! Every operation consults the policy snapshot and the entry flags, then
//! either emits a fact to the sink or skips it. Facts are emitted as one
//! batch per relation: the endpoint node records that still need emitting,
//! then the relation itself.
//!
//! Entry locks are held only to read or claim flags and to snapshot labels.
//! No lock is held across long-entry allocation or sink emission, and two
//! entry locks are never held at once.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

use prov_core::error::{ConfigError, RecordError, Result};
use prov_core::id::{NodeId, Session};
use prov_core::taxonomy::{agent, entity, relation, ProvType};
use prov_core::types::{
    timestamp_ns, EndpointSnapshot, IfcContext, LongPayload, MachineInfo, ProvRecord,
    RelationRecord, KB, KB_MASK,
};
use prov_policy::{PolicyGate, PolicySnapshot};
use prov_sync::{AllocMode, AtomicCounter, PoolStats};

use crate::entry::{EntryFlags, EntryState, ProvEntry};
use crate::ids::IdAllocator;
use crate::long::{LongEntryPool, LongProvEntry};
use crate::outcome::{RecordResult, Recorded, SkipReason};
use crate::process::Process;
use crate::sink::GraphSink;
use crate::task::{ExecArgs, IoAccounting, TaskSource, VmFlags, PAGE_SIZE};

/// Recorder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Machine id stamped on every identifier
    #[serde(default)]
    pub machine_id: u32,

    /// Boot id; generated at start-up when absent
    #[serde(default)]
    pub boot_id: Option<u32>,

    /// Long entries available at once
    #[serde(default = "default_long_pool_capacity")]
    pub long_pool_capacity: usize,
}

fn default_long_pool_capacity() -> usize {
    64
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            machine_id: 0,
            boot_id: None,
            long_pool_capacity: default_long_pool_capacity(),
        }
    }
}

impl RecorderConfig {
    /// Check the settings are usable.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.long_pool_capacity == 0 {
            return Err(ConfigError::Invalid(
                "long_pool_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The boot session these settings describe.
    pub fn session(&self) -> Session {
        match self.boot_id {
            Some(boot_id) => Session::new(boot_id, self.machine_id),
            None => Session::generate(self.machine_id),
        }
    }
}

/// Counters of recording outcomes.
#[derive(Debug, Default)]
pub struct RecorderStats {
    emitted: AtomicCounter,
    skipped: AtomicCounter,
    failed: AtomicCounter,
    dropped_args: AtomicCounter,
}

impl RecorderStats {
    /// Relations emitted.
    pub fn emitted(&self) -> u64 {
        self.emitted.get()
    }

    /// Recordings skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped.get()
    }

    /// Recordings that failed.
    pub fn failed(&self) -> u64 {
        self.failed.get()
    }

    /// Exec arguments that could not be recorded.
    pub fn dropped_args(&self) -> u64 {
        self.dropped_args.get()
    }
}

/// One side of a relation.
#[derive(Debug, Clone, Copy)]
pub enum Endpoint<'a> {
    /// A persistent entry.
    Entry(&'a ProvEntry),
    /// A payload node living for this recording only.
    Long(&'a LongProvEntry),
}

impl<'a> From<&'a ProvEntry> for Endpoint<'a> {
    fn from(entry: &'a ProvEntry) -> Self {
        Endpoint::Entry(entry)
    }
}

impl<'a> From<&'a LongProvEntry> for Endpoint<'a> {
    fn from(entry: &'a LongProvEntry) -> Self {
        Endpoint::Long(entry)
    }
}

/// Which exec string an argument entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Command-line argument
    Arg,
    /// Environment string
    Env,
}

impl ArgKind {
    fn node_type(self) -> ProvType {
        match self {
            ArgKind::Arg => entity::ARG,
            ArgKind::Env => entity::ENV,
        }
    }

    fn relation_type(self) -> ProvType {
        match self {
            ArgKind::Arg => relation::ARG,
            ArgKind::Env => relation::ENV,
        }
    }
}

// An endpoint as seen at the start of a recording.
struct Observed {
    snapshot: EndpointSnapshot,
    record: ProvRecord,
    tracked: bool,
    opaque: bool,
    propagate: bool,
}

impl Observed {
    fn entry(state: &EntryState) -> Self {
        Self {
            snapshot: state.endpoint(),
            record: ProvRecord::Node(state.node_record()),
            tracked: state.is_tracked(),
            opaque: state.is_opaque(),
            propagate: state.is_propagating(),
        }
    }

    fn long(entry: &LongProvEntry) -> Self {
        Self {
            snapshot: EndpointSnapshot {
                id: entry.id(),
                labels: IfcContext::default(),
            },
            record: ProvRecord::Long(entry.to_record()),
            tracked: false,
            opaque: false,
            propagate: false,
        }
    }

    fn id(&self) -> NodeId {
        self.snapshot.id
    }
}

// Claims taken on the destination, undone if the sink refuses the batch.
struct DestinationClaim {
    first_record: bool,
    previous_incoming: Option<(NodeId, ProvType)>,
}

// Folds several recordings into one outcome: emitted if any was, else the
// first error, else the last skip reason.
#[derive(Default)]
struct Tally {
    emitted: bool,
    first_error: Option<RecordError>,
    last_skip: Option<SkipReason>,
}

impl Tally {
    fn add(&mut self, result: RecordResult) {
        match result {
            Ok(Recorded::Emitted) => self.emitted = true,
            Ok(Recorded::Skipped(reason)) => self.last_skip = Some(reason),
            Err(e) => {
                self.first_error.get_or_insert(e);
            }
        }
    }

    fn finish(self) -> RecordResult {
        if self.emitted {
            return Ok(Recorded::Emitted);
        }
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(Recorded::Skipped(
                self.last_skip.unwrap_or(SkipReason::NoSource),
            )),
        }
    }
}

/// Records provenance facts into a graph sink.
pub struct Recorder {
    policy: Arc<PolicyGate>,
    sink: Arc<dyn GraphSink>,
    ids: IdAllocator,
    longs: LongEntryPool,
    machine: LongProvEntry,
    stats: RecorderStats,
}

impl Recorder {
    /// Create a recorder.
    pub fn new(
        config: &RecorderConfig,
        policy: Arc<PolicyGate>,
        sink: Arc<dyn GraphSink>,
    ) -> Result<Self> {
        config.validate()?;
        let ids = IdAllocator::new(config.session());
        let mut machine = LongProvEntry::new(agent::MACHINE, &ids)?;
        machine.set_payload(LongPayload::Machine(MachineInfo::current()));

        info!(
            "Recorder started for session {:?} with {} long entries",
            ids.session(),
            config.long_pool_capacity
        );

        Ok(Self {
            policy,
            sink,
            ids,
            longs: LongEntryPool::new(config.long_pool_capacity),
            machine,
            stats: RecorderStats::default(),
        })
    }

    /// Identifier allocator of this recorder's session.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// The policy gate consulted on every call.
    pub fn policy(&self) -> &PolicyGate {
        &self.policy
    }

    /// The machine agent that `ran_on` relations start from.
    pub fn machine(&self) -> &LongProvEntry {
        &self.machine
    }

    /// Outcome counters.
    pub fn stats(&self) -> &RecorderStats {
        &self.stats
    }

    /// Long-entry pool statistics.
    pub fn long_pool_stats(&self) -> PoolStats {
        self.longs.stats()
    }

    /// A fresh, untracked entry in this recorder's session.
    pub fn create_entry(&self, prov_type: ProvType) -> Result<ProvEntry> {
        Ok(ProvEntry::new(prov_type, &self.ids)?)
    }

    /// A process with fresh task and credential entries.
    pub fn create_process(&self, task: Arc<dyn TaskSource>) -> Result<Process> {
        Ok(Process::new(task, &self.ids)?)
    }

    /// Run `f` on a long entry of the given type drawn from the pool.
    ///
    /// The entry only lives for the duration of `f`; hooks relate it to
    /// persistent entries from inside the closure.
    pub fn with_long_entry<R>(
        &self,
        prov_type: ProvType,
        mode: AllocMode,
        f: impl FnOnce(&mut LongProvEntry) -> R,
    ) -> std::result::Result<R, RecordError> {
        self.longs.with_long(&self.ids, prov_type, mode, f)
    }

    /// Record a relation of type `kind` from `from` to `to`.
    ///
    /// `context` travels with the relation, e.g. the path of the file
    /// involved; `flags` carries hook-specific bits.
    pub fn record_relation<'a, 'b>(
        &self,
        kind: ProvType,
        from: impl Into<Endpoint<'a>>,
        to: impl Into<Endpoint<'b>>,
        context: Option<&str>,
        flags: u64,
    ) -> RecordResult {
        if !kind.is_relation() {
            return Err(self.fail(kind, RecordError::InvalidRelation(kind)));
        }
        let policy = self.policy.snapshot();
        if !policy.enabled() {
            return self.skip(kind, SkipReason::Disabled);
        }
        if policy.filter_relation(kind) {
            return self.skip(kind, SkipReason::Filtered);
        }

        let from = from.into();
        let to = to.into();

        let source = match from {
            Endpoint::Entry(entry) => Observed::entry(&entry.lock()),
            Endpoint::Long(entry) => Observed::long(entry),
        };

        let (destination, claim) = match to {
            Endpoint::Entry(entry) => {
                let mut state = entry.lock();
                let destination = Observed::entry(&state);
                if let Some(reason) = gate(&policy, &source, &destination) {
                    return self.skip(kind, reason);
                }
                let incoming = (source.id(), kind);
                if policy.compress_edge() && state.last_incoming() == Some(incoming) {
                    return self.skip(kind, SkipReason::Duplicate);
                }
                let previous_incoming = state.last_incoming();
                state.set_last_incoming(Some(incoming));
                let first_record = state.claim(EntryFlags::RECORDED);
                (
                    destination,
                    Some(DestinationClaim {
                        first_record,
                        previous_incoming,
                    }),
                )
            }
            Endpoint::Long(entry) => {
                let destination = Observed::long(entry);
                if let Some(reason) = gate(&policy, &source, &destination) {
                    return self.skip(kind, reason);
                }
                (destination, None)
            }
        };

        let source_first = match from {
            Endpoint::Entry(entry) => entry.lock().claim(EntryFlags::RECORDED),
            Endpoint::Long(_) => true,
        };
        let destination_first = claim.as_ref().map_or(true, |c| c.first_record);

        let source_id = source.id();
        let destination_id = destination.id();
        let propagate = source.propagate;

        let mut batch = Vec::with_capacity(3);
        if source_first || !policy.compress_node() {
            batch.push(source.record);
        }
        if destination_first || !policy.compress_node() {
            batch.push(destination.record);
        }
        batch.push(ProvRecord::Relation(RelationRecord {
            id: self.ids.relation(kind.without_flow()),
            timestamp: timestamp_ns(),
            from: source.snapshot,
            to: destination.snapshot,
            flags,
            context: context.map(str::to_string),
            flow: kind.flow(),
        }));

        if let Err(e) = self.sink.emit(batch) {
            if let (Endpoint::Entry(entry), Some(claim)) = (to, claim) {
                let mut state = entry.lock();
                if claim.first_record {
                    state.release(EntryFlags::RECORDED);
                }
                // Another recording may have moved the marker on since.
                if state.last_incoming() == Some((source_id, kind)) {
                    state.set_last_incoming(claim.previous_incoming);
                }
            }
            if let Endpoint::Entry(entry) = from {
                if source_first {
                    entry.lock().release(EntryFlags::RECORDED);
                }
            }
            return Err(self.fail(kind, e.into()));
        }

        if propagate {
            if let Endpoint::Entry(entry) = to {
                let mut state = entry.lock();
                state.set_tracked();
                state.set_propagate();
            }
        }

        self.stats.emitted.increment();
        trace!("Recorded {} from {} to {}", kind, source_id, destination_id);
        Ok(Recorded::Emitted)
    }

    /// Record the path an entry is known by, at most once per entry.
    pub fn record_node_name(
        &self,
        entry: &ProvEntry,
        name: impl AsRef<[u8]>,
        is_link: bool,
    ) -> RecordResult {
        let policy = self.policy.snapshot();
        if !policy.enabled() {
            return self.skip(relation::NAMED, SkipReason::Disabled);
        }
        {
            let mut state = entry.lock();
            if state.is_opaque() {
                return self.skip(relation::NAMED, SkipReason::Opaque);
            }
            if state.is_name_recorded() {
                return self.skip(relation::NAMED, SkipReason::NameAlreadyRecorded);
            }
            if !policy.should_record(state.is_tracked()) {
                return self.skip(relation::NAMED, SkipReason::Untracked);
            }
            state.claim(EntryFlags::NAME_RECORDED);
        }

        let result = self.record_from_long(
            entity::PATH,
            relation::NAMED,
            entry,
            |path| path.set_path(name, is_link),
        );
        if !matches!(result, Ok(Recorded::Emitted)) {
            entry.lock().release(EntryFlags::NAME_RECORDED);
        }
        result
    }

    /// Record one exec argument or environment string of `entry`.
    pub fn record_arg(&self, entry: &ProvEntry, kind: ArgKind, value: &[u8]) -> RecordResult {
        self.record_from_long(kind.node_type(), kind.relation_type(), entry, |arg| {
            arg.set_value(value)
        })
    }

    /// Record every exec argument and environment string of `entry`.
    ///
    /// Each string is recorded on its own; failures are counted and the
    /// rest are still attempted. The policy is checked once, before any
    /// allocation. Never returns an error: an exec must not fail because
    /// its arguments could not be recorded.
    pub fn record_args(&self, entry: &ProvEntry, args: &ExecArgs) -> RecordResult {
        let policy = self.policy.snapshot();
        if !policy.enabled() {
            return self.skip(relation::ARG, SkipReason::Disabled);
        }
        {
            let state = entry.lock();
            if state.is_opaque() {
                return self.skip(relation::ARG, SkipReason::Opaque);
            }
            if !policy.should_record(state.is_tracked()) {
                return self.skip(relation::ARG, SkipReason::Untracked);
            }
        }
        if args.is_empty() {
            return self.skip(relation::ARG, SkipReason::NoSource);
        }

        let strings = args
            .argv()
            .map(|value| (ArgKind::Arg, value))
            .chain(args.envp().map(|value| (ArgKind::Env, value)));

        let mut tally = Tally::default();
        for (kind, value) in strings {
            match self.record_arg(entry, kind, value) {
                Err(e) => {
                    self.stats.dropped_args.increment();
                    debug!("Dropped exec {:?} of {}: {}", kind, entry.id(), e);
                    tally.add(Ok(Recorded::Skipped(SkipReason::Dropped)));
                }
                result => tally.add(result),
            }
        }
        tally.finish()
    }

    /// Name a credential entry after the executable its task runs.
    ///
    /// Only entries already recorded and not yet named are considered. An
    /// opaque executable makes the entry opaque.
    pub fn record_task_name(&self, task: &dyn TaskSource, entry: &ProvEntry) -> RecordResult {
        {
            let state = entry.lock();
            if state.is_opaque() {
                return self.skip(relation::NAMED, SkipReason::Opaque);
            }
            if state.is_name_recorded() {
                return self.skip(relation::NAMED, SkipReason::NameAlreadyRecorded);
            }
            if !state.is_recorded() {
                return self.skip(relation::NAMED, SkipReason::NotRecorded);
            }
        }

        let Some(exe) = task.exe_file() else {
            return self.skip(relation::NAMED, SkipReason::NoSource);
        };
        if exe.prov.is_opaque() {
            entry.set_opaque();
            debug!("{} runs an opaque executable, now opaque", entry.id());
            return self.skip(relation::NAMED, SkipReason::Opaque);
        }
        self.record_node_name(entry, &exe.path, false)
    }

    /// Link an entry to the machine it runs on, once, after its node record
    /// has been emitted.
    pub fn record_kernel_link(&self, entry: &ProvEntry) -> RecordResult {
        {
            let mut state = entry.lock();
            if state.is_opaque() {
                return self.skip(relation::RAN_ON, SkipReason::Opaque);
            }
            if state.flags().contains(EntryFlags::KERNEL_RECORDED) {
                return self.skip(relation::RAN_ON, SkipReason::Duplicate);
            }
            if !state.is_recorded() {
                return self.skip(relation::RAN_ON, SkipReason::NotRecorded);
            }
            state.claim(EntryFlags::KERNEL_RECORDED);
        }

        let result = self.record_relation(relation::RAN_ON, &self.machine, entry, None, 0);
        if !matches!(result, Ok(Recorded::Emitted)) {
            entry.lock().release(EntryFlags::KERNEL_RECORDED);
        }
        result
    }

    /// Record the files a task shares memory with.
    ///
    /// With `read`, shared readable or executable mappings yield `sh_read`
    /// from the file to `cred`; otherwise shared writable mappings yield
    /// `sh_write` from `cred` to the file. Every mapping is attempted.
    pub fn record_shared_mappings(
        &self,
        cred: &ProvEntry,
        task: &dyn TaskSource,
        read: bool,
    ) -> RecordResult {
        let Some(mm) = task.mm() else {
            let kind = if read { relation::SH_READ } else { relation::SH_WRITE };
            return self.skip(kind, SkipReason::NoSource);
        };

        let mut tally = Tally::default();
        for area in &mm.areas {
            let Some(file) = area.file.as_ref() else {
                continue;
            };
            if !area.flags.intersects(VmFlags::SHARED | VmFlags::MAYSHARE) {
                continue;
            }
            let context = Some(file.path.as_str());
            let flags = area.flags.bits();
            if read && area.flags.intersects(VmFlags::READ | VmFlags::EXEC) {
                tally.add(self.record_relation(relation::SH_READ, &file.prov, cred, context, flags));
            } else if !read && area.flags.contains(VmFlags::WRITE) {
                tally.add(self.record_relation(relation::SH_WRITE, cred, &file.prov, context, flags));
            }
        }
        tally.finish()
    }

    /// Refresh a task entry's namespace ids.
    pub fn update_task_namespaces(
        &self,
        entry: &ProvEntry,
        task: &dyn TaskSource,
    ) -> std::result::Result<(), RecordError> {
        let namespaces = task.namespaces();
        let mut state = entry.lock();
        let prov_type = state.prov_type();
        let info = state
            .info_mut()
            .as_task_mut()
            .ok_or(RecordError::InvalidNode(prov_type))?;
        info.namespaces = namespaces;
        Ok(())
    }

    /// Refresh a task entry's CPU, memory and I/O figures.
    ///
    /// CPU times are stored in microseconds, memory in KB and I/O byte
    /// counts rounded down to KB. Memory figures are left alone when the
    /// task has no memory map.
    pub fn update_task_perf(
        &self,
        entry: &ProvEntry,
        task: &dyn TaskSource,
    ) -> std::result::Result<(), RecordError> {
        let cpu = task.cpu_times();
        let io = task.io();
        let mm = task.mm();

        let mut state = entry.lock();
        let prov_type = state.prov_type();
        let info = state
            .info_mut()
            .as_task_mut()
            .ok_or(RecordError::InvalidNode(prov_type))?;

        info.utime = cpu.utime_ns / 1000;
        info.stime = cpu.stime_ns / 1000;

        if let Some(mm) = mm {
            info.vm = mm.total_vm * PAGE_SIZE / KB;
            info.rss = mm.rss * PAGE_SIZE / KB;
            info.hw_vm = mm.hiwater_vm * PAGE_SIZE / KB;
            info.hw_rss = mm.hiwater_rss * PAGE_SIZE / KB;
        }

        match io {
            IoAccounting::Storage {
                read_bytes,
                write_bytes,
                cancelled_write_bytes,
            } => {
                info.rbytes = read_bytes & KB_MASK;
                info.wbytes = write_bytes & KB_MASK;
                info.cancel_wbytes = cancelled_write_bytes & KB_MASK;
            }
            IoAccounting::Chars { rchar, wchar } => {
                info.rbytes = rchar & KB_MASK;
                info.wbytes = wchar & KB_MASK;
                info.cancel_wbytes = 0;
            }
        }
        Ok(())
    }

    /// Refresh a credential entry's ids.
    pub fn update_cred(
        &self,
        entry: &ProvEntry,
        task: &dyn TaskSource,
    ) -> std::result::Result<(), RecordError> {
        let tgid = task.tgid();
        let credentials = task.credentials();

        let mut state = entry.lock();
        let prov_type = state.prov_type();
        let info = state
            .info_mut()
            .as_proc_mut()
            .ok_or(RecordError::InvalidNode(prov_type))?;
        info.tgid = tgid;
        info.uid = credentials.uid;
        info.gid = credentials.gid;
        info.secid = credentials.secid;
        Ok(())
    }

    /// The credential entry of a process, named and refreshed.
    ///
    /// Opaque entries are returned untouched.
    pub fn cred_provenance<'p>(&self, process: &'p Process) -> &'p ProvEntry {
        let cred = process.cred_prov();
        if cred.is_opaque() {
            return cred;
        }
        if let Err(e) = self.record_task_name(process.task(), cred) {
            debug!("Could not name {}: {}", cred.id(), e);
        }
        if let Err(e) = self.update_cred(cred, process.task()) {
            debug!("Could not refresh {}: {}", cred.id(), e);
        }
        cred
    }

    /// The task entry of a process, refreshed, and linked to the machine
    /// when `link` is set.
    pub fn task_provenance<'p>(&self, process: &'p Process, link: bool) -> &'p ProvEntry {
        let task = process.task();
        let entry = process.task_prov();
        {
            let mut state = entry.lock();
            if let Some(info) = state.info_mut().as_task_mut() {
                info.pid = task.pid();
                info.vpid = task.vpid();
            }
        }
        if let Err(e) = self.update_task_perf(entry, task) {
            debug!("Could not refresh {}: {}", entry.id(), e);
        }
        if let Err(e) = self.update_task_namespaces(entry, task) {
            debug!("Could not refresh {}: {}", entry.id(), e);
        }
        if link && !entry.is_opaque() {
            if let Err(e) = self.record_kernel_link(entry) {
                debug!("Could not link {}: {}", entry.id(), e);
            }
        }
        entry
    }

    // Fill a long entry of `node_type` and relate it to `to`. Allocation
    // never waits.
    fn record_from_long(
        &self,
        node_type: ProvType,
        kind: ProvType,
        to: &ProvEntry,
        fill: impl FnOnce(&mut LongProvEntry),
    ) -> RecordResult {
        self.longs
            .with_long(&self.ids, node_type, AllocMode::NoWait, |long| {
                fill(long);
                self.record_relation(kind, &*long, to, None, 0)
            })
            .map_err(|e| self.fail(kind, e))?
    }

    fn skip(&self, kind: ProvType, reason: SkipReason) -> RecordResult {
        self.stats.skipped.increment();
        trace!("Skipped {}: {}", kind, reason);
        Ok(Recorded::Skipped(reason))
    }

    fn fail(&self, kind: ProvType, error: RecordError) -> RecordError {
        self.stats.failed.increment();
        debug!("Failed to record {}: {}", kind, error);
        error
    }
}

// Per-endpoint checks shared by every relation.
fn gate(policy: &PolicySnapshot, source: &Observed, destination: &Observed) -> Option<SkipReason> {
    if source.opaque || destination.opaque {
        return Some(SkipReason::Opaque);
    }
    if !policy.should_record(source.tracked || destination.tracked) {
        return Some(SkipReason::Untracked);
    }
    if policy.filter_node(source.id().prov_type()) || policy.filter_node(destination.id().prov_type())
    {
        return Some(SkipReason::Filtered);
    }
    None
}
