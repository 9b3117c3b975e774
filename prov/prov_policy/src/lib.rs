//! # Prov Policy
//!
//! `prov_policy` decides what the capture engine records. An operator
//! writes a [`PolicyConfig`]; it is resolved into an immutable
//! [`PolicySnapshot`] and published through a [`PolicyGate`].
//!
//! Key concepts:
//!
//! 1. **Enabled**: Master switch for all recording.
//!
//! 2. **Capture-all**: Record objects that no access-control decision has
//!    marked as tracked.
//!
//! 3. **Compression**: Emit each node once, and drop relations that repeat
//!    the last relation into the same object.
//!
//! 4. **Filters**: Node and relation types that are never recorded.
//!
//! Per-object tracked and opaque flags live on the provenance entries
//! themselves; the gate only carries process-wide settings.

pub mod config;
pub mod gate;
pub mod snapshot;

pub use config::PolicyConfig;
pub use gate::PolicyGate;
pub use snapshot::PolicySnapshot;
