//! Resolved, immutable policy view consulted by every recording call.

use prov_core::error::ConfigError;
use prov_core::taxonomy::{ProvType, RelationClass};

use crate::config::PolicyConfig;

/// A validated policy with its filters resolved to bit masks.
///
/// Node subtypes are unique across node classes, so one mask covers every
/// node filter. Relation subtypes are only unique within a second-level
/// class, so relation filters keep one mask per class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySnapshot {
    enabled: bool,
    capture_all: bool,
    compress_node: bool,
    compress_edge: bool,
    node_filter: u64,
    relation_filter: [u64; RelationClass::ALL.len()],
}

impl PolicySnapshot {
    /// Resolve a configuration.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let node_filter = config
            .node_filter_types()?
            .into_iter()
            .fold(0, |mask, id| mask | id.subtype_bits());

        let mut relation_filter = [0; RelationClass::ALL.len()];
        for id in config.relation_filter_types()? {
            if let Some(index) = class_index(id) {
                relation_filter[index] |= id.subtype_bits();
            }
        }

        Ok(Self {
            enabled: config.enabled,
            capture_all: config.capture_all,
            compress_node: config.compress_node,
            compress_edge: config.compress_edge,
            node_filter,
            relation_filter,
        })
    }

    /// Whether recording is switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether untracked objects are recorded too.
    pub fn capture_all(&self) -> bool {
        self.capture_all
    }

    /// Whether node records are emitted once per node.
    pub fn compress_node(&self) -> bool {
        self.compress_node
    }

    /// Whether repeated identical relations are dropped.
    pub fn compress_edge(&self) -> bool {
        self.compress_edge
    }

    /// Whether a node type is filtered out.
    pub fn filter_node(&self, id: ProvType) -> bool {
        id.is_node() && self.node_filter & id.subtype_bits() != 0
    }

    /// Whether a relation type is filtered out.
    pub fn filter_relation(&self, id: ProvType) -> bool {
        match class_index(id) {
            Some(index) => self.relation_filter[index] & id.subtype_bits() != 0,
            None => false,
        }
    }

    /// Whether an entry with the given tracked flag should be recorded.
    pub fn should_record(&self, tracked: bool) -> bool {
        self.enabled && (tracked || self.capture_all)
    }
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        let config = PolicyConfig::default();
        Self {
            enabled: config.enabled,
            capture_all: config.capture_all,
            compress_node: config.compress_node,
            compress_edge: config.compress_edge,
            node_filter: 0,
            relation_filter: [0; RelationClass::ALL.len()],
        }
    }
}

fn class_index(id: ProvType) -> Option<usize> {
    let class = id.relation_class()?;
    RelationClass::ALL.iter().position(|c| *c == class)
}
