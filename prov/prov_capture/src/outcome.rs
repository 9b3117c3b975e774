//! Outcomes of recording operations.
//!
//! A recording either emits a fact, deliberately skips it, or fails. Skips
//! are not errors: the hook that asked for the recording carries on as if
//! the fact had been emitted.

use serde::Serialize;
use std::fmt;

use prov_core::error::RecordError;

/// Why nothing was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Recording is switched off
    Disabled,
    /// A node or relation type is filtered out
    Filtered,
    /// An endpoint is opaque
    Opaque,
    /// Neither endpoint is tracked and capture-all is off
    Untracked,
    /// The naming relation was already emitted
    NameAlreadyRecorded,
    /// The fact repeats one already emitted
    Duplicate,
    /// There was nothing to record from
    NoSource,
    /// The node itself has not been emitted yet
    NotRecorded,
    /// Best-effort recording lost every fact it attempted
    Dropped,
}

impl SkipReason {
    /// Short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Filtered => "filtered",
            Self::Opaque => "opaque",
            Self::Untracked => "untracked",
            Self::NameAlreadyRecorded => "name_already_recorded",
            Self::Duplicate => "duplicate",
            Self::NoSource => "no_source",
            Self::NotRecorded => "not_recorded",
            Self::Dropped => "dropped",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful recording outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recorded {
    /// The fact reached the sink
    Emitted,
    /// The fact was deliberately not recorded
    Skipped(SkipReason),
}

impl Recorded {
    /// Whether the fact reached the sink.
    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted)
    }

    /// The skip reason, if skipped.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Emitted => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Result of a recording operation.
pub type RecordResult = Result<Recorded, RecordError>;

/// `ENOENT`
pub const ENOENT: i32 = 2;
/// `EAGAIN`
pub const EAGAIN: i32 = 11;
/// `ENOMEM`
pub const ENOMEM: i32 = 12;
/// `EINVAL`
pub const EINVAL: i32 = 22;

/// Negative errno handed back to the hook.
pub fn hook_code(result: &RecordResult) -> i32 {
    match result {
        Ok(_) => 0,
        Err(RecordError::OutOfMemory) => -ENOMEM,
        Err(RecordError::SinkUnavailable(_)) => -EAGAIN,
        Err(RecordError::NotFound(_)) => -ENOENT,
        Err(RecordError::InvalidRelation(_)) | Err(RecordError::InvalidNode(_)) => -EINVAL,
    }
}
