//! Policy file checks.

use anyhow::Result;
use std::path::Path;

use prov_core::ProvType;
use prov_policy::{PolicyConfig, PolicySnapshot};

fn names(types: &[ProvType]) -> String {
    if types.is_empty() {
        return "(none)".to_string();
    }
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `provctl policy`
pub fn check(path: &Path) -> Result<()> {
    let config = PolicyConfig::load(Some(path))?;
    let snapshot = PolicySnapshot::from_config(&config)?;

    println!("policy:          {}", path.display());
    println!("enabled:         {}", snapshot.enabled());
    println!("capture_all:     {}", snapshot.capture_all());
    println!("compress_node:   {}", snapshot.compress_node());
    println!("compress_edge:   {}", snapshot.compress_edge());
    println!("node_filter:     {}", names(&config.node_filter_types()?));
    println!("relation_filter: {}", names(&config.relation_filter_types()?));
    Ok(())
}
