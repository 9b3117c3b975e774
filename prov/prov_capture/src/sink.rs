//! Destinations for recorded provenance.
//!
//! The recorder hands each recording to the sink as one batch: the node
//! records it needs, then the relation. A sink either accepts the whole
//! batch or refuses it.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::fmt;
use thiserror::Error;

use prov_core::error::RecordError;
use prov_core::types::{ProvRecord, RelationRecord};

/// Error when handing records to a sink
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The sink cannot take more records right now
    #[error("sink is full")]
    Full,
    /// The consumer has gone away
    #[error("sink is disconnected")]
    Disconnected,
}

impl From<SinkError> for RecordError {
    fn from(err: SinkError) -> Self {
        RecordError::SinkUnavailable(err.to_string())
    }
}

/// Consumer of provenance records.
///
/// `emit` is called from hook context and must not block.
pub trait GraphSink: Send + Sync {
    /// Accept or refuse one batch.
    fn emit(&self, batch: Vec<ProvRecord>) -> Result<(), SinkError>;
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ProvRecord>>,
    capacity: Option<usize>,
}

impl MemorySink {
    /// An unbounded sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses batches once it holds `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(Vec::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Every record accepted so far.
    pub fn records(&self) -> Vec<ProvRecord> {
        self.records.lock().clone()
    }

    /// Relations accepted so far.
    pub fn relations(&self) -> Vec<RelationRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(ProvRecord::as_relation)
            .cloned()
            .collect()
    }

    /// Number of records accepted so far.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been accepted.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Remove and return every record.
    pub fn drain(&self) -> Vec<ProvRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl GraphSink for MemorySink {
    fn emit(&self, batch: Vec<ProvRecord>) -> Result<(), SinkError> {
        let mut records = self.records.lock();
        if let Some(capacity) = self.capacity {
            if records.len() + batch.len() > capacity {
                return Err(SinkError::Full);
            }
        }
        records.extend(batch);
        Ok(())
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Forwards batches over a bounded channel to a consumer thread.
#[derive(Clone)]
pub struct ChannelSink {
    sender: Sender<Vec<ProvRecord>>,
    capacity: usize,
}

impl ChannelSink {
    /// A sink holding at most `capacity` pending batches, and its receiving
    /// end.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Vec<ProvRecord>>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender, capacity }, receiver)
    }

    /// Maximum number of pending batches.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl GraphSink for ChannelSink {
    fn emit(&self, batch: Vec<ProvRecord>) -> Result<(), SinkError> {
        self.sender.try_send(batch).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Disconnected(_) => SinkError::Disconnected,
        })
    }
}

impl fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSink")
            .field("pending", &self.sender.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
