//! # Prov Capture
//!
//! `prov_capture` turns kernel events into provenance facts. Kernel objects
//! carry a [`ProvEntry`]; hook glue calls into a [`Recorder`], which checks
//! the published policy and the entry flags, then hands node and relation
//! records to a [`GraphSink`].
//!
//! Key concepts:
//!
//! 1. **Entries**: Per-object identity, metadata, IFC labels and recording
//!    flags behind one lock.
//!
//! 2. **Long entries**: Payload nodes (paths, exec arguments) drawn from a
//!    fixed pool and released as soon as the recording returns.
//!
//! 3. **Outcomes**: Every recording is emitted, skipped for a stated reason,
//!    or fails with a [`RecordError`](prov_core::RecordError); none of them
//!    affects the operation being observed.

pub mod entry;
pub mod ids;
pub mod long;
pub mod outcome;
pub mod process;
pub mod recorder;
pub mod sim;
pub mod sink;
pub mod task;

pub use entry::{EntryFlags, EntryState, ProvEntry};
pub use ids::IdAllocator;
pub use long::{LongEntryPool, LongProvEntry};
pub use outcome::{hook_code, RecordResult, Recorded, SkipReason};
pub use process::{Process, ProcessTable};
pub use recorder::{ArgKind, Endpoint, Recorder, RecorderConfig, RecorderStats};
pub use sim::SimTask;
pub use sink::{ChannelSink, GraphSink, MemorySink, SinkError};
pub use task::{
    Credentials, CpuTimes, ExecArgs, FileObject, IoAccounting, MmSnapshot, TaskSource, VmArea,
    VmFlags, PAGE_SIZE,
};
