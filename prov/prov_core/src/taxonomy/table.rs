//! Read-only presentation table for type identifiers.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use super::{activity, agent, entity, relation, ProvType};

/// One row of the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeEntry {
    /// The identifier.
    pub id: ProvType,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether `id` is a relation.
    pub is_relation: bool,
}

impl TypeEntry {
    /// Create a table row.
    pub const fn new(id: ProvType, name: &'static str) -> Self {
        Self {
            id,
            name,
            is_relation: id.is_relation(),
        }
    }
}

static TABLE: Lazy<Vec<TypeEntry>> = Lazy::new(|| {
    [
        relation::ENTRIES,
        activity::ENTRIES,
        agent::ENTRIES,
        entity::ENTRIES,
    ]
    .concat()
});

static BY_ID: Lazy<HashMap<u64, usize>> = Lazy::new(|| {
    TABLE
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry.id.bits(), index))
        .collect()
});

static BY_NAME: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    TABLE
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry.name, index))
        .collect()
});

/// Every named type, relations first.
pub fn type_table() -> &'static [TypeEntry] {
    &TABLE
}

/// Look an identifier up, ignoring any flow flags it carries.
pub fn lookup(id: ProvType) -> Option<&'static TypeEntry> {
    BY_ID
        .get(&id.without_flow().bits())
        .map(|index| &TABLE[*index])
}

/// Look a type up by its presentation name.
pub fn lookup_name(name: &str) -> Option<&'static TypeEntry> {
    BY_NAME.get(name).map(|index| &TABLE[*index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = type_table().iter().map(|entry| entry.name).collect();
        assert_eq!(names.len(), type_table().len());
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = type_table().iter().map(|entry| entry.id).collect();
        assert_eq!(ids.len(), type_table().len());
    }

    #[test]
    fn test_lookup() {
        let entry = lookup(relation::SH_WRITE).unwrap();
        assert_eq!(entry.name, "sh_write");
        assert!(entry.is_relation);

        let entry = lookup_name("argv").unwrap();
        assert_eq!(entry.id, entity::ARG);
        assert!(!entry.is_relation);

        assert!(lookup_name("no_such_type").is_none());
    }

    #[test]
    fn test_relation_flag_matches_class() {
        for entry in type_table() {
            assert_eq!(entry.is_relation, entry.id.is_relation(), "{}", entry.name);
        }
    }

    #[test]
    fn test_subtype_ceiling() {
        for entry in type_table() {
            assert!(entry.id.subtype_index() < crate::taxonomy::SUBTYPE_BITS);
        }
    }
}
