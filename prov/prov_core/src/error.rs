//! Error types for the provenance capture system.
//!
//! Errors are organized by subsystem. The root error type, `Error`, wraps
//! each subsystem error so that callers at the top level can handle them
//! uniformly.
//!
//! None of these errors is fatal to the operation being observed: a failed
//! recording means one provenance fact was dropped.

use crate::taxonomy::ProvType;
use thiserror::Error;

/// Root error type for the provenance system.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid type identifiers
    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    /// IFC label errors
    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    /// Recording protocol errors
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Policy and configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised while building or decoding type identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    /// The class half does not name exactly one class
    #[error("invalid class bits: {0:#018x}")]
    InvalidClass(u64),

    /// The subtype half is not exactly one bit below the class half
    #[error("invalid subtype bits: {0:#018x}")]
    InvalidSubtype(u64),

    /// Flag bits that do not apply to the class
    #[error("invalid flag combination: {0:#018x}")]
    InvalidFlags(u64),

    /// A relation was required
    #[error("not a relation type: {0}")]
    NotARelation(ProvType),

    /// A node was required
    #[error("not a node type: {0}")]
    NotANode(ProvType),

    /// A payload-bearing node was required
    #[error("not a long node type: {0}")]
    NotLong(ProvType),

    /// No type carries the given name
    #[error("unknown type name: {0}")]
    UnknownName(String),
}

/// Errors raised by IFC label operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LabelError {
    /// The label already holds its maximum number of tags
    #[error("label capacity of {capacity} tags exceeded")]
    CapacityExceeded {
        /// Maximum number of tags
        capacity: usize,
    },

    /// Unknown label slot number
    #[error("unknown label slot: {0}")]
    UnknownSlot(u8),
}

/// Errors raised by the recording protocol.
///
/// Each one means the fact being recorded was dropped; existing state is
/// left intact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// No memory was available without blocking
    #[error("out of memory")]
    OutOfMemory,

    /// The graph sink refused the record
    #[error("graph sink unavailable: {0}")]
    SinkUnavailable(String),

    /// The kernel object has no provenance entry
    #[error("provenance entry not found: {0}")]
    NotFound(String),

    /// `record_relation` was given a node type
    #[error("invalid relation type: {0}")]
    InvalidRelation(ProvType),

    /// A node of the wrong family was requested, e.g. a long entry of a
    /// persistent type
    #[error("invalid node type: {0}")]
    InvalidNode(ProvType),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type used throughout the provenance system.
pub type Result<T> = std::result::Result<T, Error>;
