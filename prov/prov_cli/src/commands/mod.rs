//! Subcommand implementations.

pub mod demo;
pub mod policy;
pub mod types;
