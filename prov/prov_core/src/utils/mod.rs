//! Utility types shared across the workspace.

pub mod logging;

pub use logging::{LogLevel, ParseLogLevelError};
