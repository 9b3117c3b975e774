//! Type identifier commands.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use prov_core::taxonomy::{lookup_name, type_table, FlowDecision, ProvClass, RelationClass};
use prov_core::ProvType;

#[derive(Serialize)]
struct Decoded {
    id: String,
    name: Option<&'static str>,
    class: ProvClass,
    relation_class: Option<RelationClass>,
    flow: FlowDecision,
    long: bool,
}

fn parse_id(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => raw.replace('_', "").parse(),
    };
    parsed.with_context(|| format!("'{raw}' is not a number"))
}

/// `provctl decode`
pub fn decode(raw: &str, json: bool) -> Result<()> {
    let id = ProvType::from_raw(parse_id(raw)?)?;
    let decoded = Decoded {
        id: format!("{:#018x}", id.bits()),
        name: id.without_flow().name(),
        class: id.class(),
        relation_class: id.relation_class(),
        flow: id.flow(),
        long: id.is_long(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
        return Ok(());
    }

    println!("id:    {}", decoded.id);
    println!("name:  {}", decoded.name.unwrap_or("(unnamed)"));
    match decoded.class {
        ProvClass::Relation(class) => println!("class: relation ({})", class.as_str()),
        ProvClass::Activity => println!("class: activity"),
        ProvClass::Entity => println!("class: entity"),
        ProvClass::Agent => println!("class: agent"),
    }
    if id.is_relation() {
        println!("flow:  {:?}", decoded.flow);
    } else {
        println!("long:  {}", decoded.long);
    }
    Ok(())
}

/// `provctl lookup`
pub fn lookup(name: &str) -> Result<()> {
    let entry = lookup_name(name).ok_or_else(|| anyhow!("unknown type name '{name}'"))?;
    println!("{:#018x}", entry.id.bits());
    Ok(())
}

/// `provctl types`
pub fn list(relations_only: bool, nodes_only: bool) -> Result<()> {
    let rows = type_table()
        .iter()
        .filter(|entry| !relations_only || entry.is_relation)
        .filter(|entry| !nodes_only || !entry.is_relation);
    for entry in rows {
        println!("{:#018x}  {}", entry.id.bits(), entry.name);
    }
    Ok(())
}
