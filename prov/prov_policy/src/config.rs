//! Capture policy configuration.
//!
//! Policies are written by an operator as TOML or JSON and name node and
//! relation types by their presentation names:
//!
//! ```toml
//! enabled = true
//! capture_all = false
//! compress_edge = true
//! node_filter = ["directory", "char"]
//! relation_filter = ["search", "perm_check"]
//! ```

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use prov_core::error::{ConfigError, Result};
use prov_core::taxonomy::{lookup_name, ProvType};

/// Operator-facing policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Master switch; nothing is recorded while off
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Record relations even when neither endpoint is tracked
    #[serde(default)]
    pub capture_all: bool,

    /// Emit a node record only the first time the node takes part in a relation
    #[serde(default = "default_compress_node")]
    pub compress_node: bool,

    /// Drop a relation identical (same kind, same source) to the last one
    /// recorded into the same destination
    #[serde(default = "default_compress_edge")]
    pub compress_edge: bool,

    /// Node types never recorded
    #[serde(default)]
    pub node_filter: Vec<String>,

    /// Relation types never recorded
    #[serde(default)]
    pub relation_filter: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_compress_node() -> bool {
    true
}

fn default_compress_edge() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capture_all: false,
            compress_node: default_compress_node(),
            compress_edge: default_compress_edge(),
            node_filter: Vec::new(),
            relation_filter: Vec::new(),
        }
    }
}

impl PolicyConfig {
    /// Load configuration from a file, falling back to defaults when no path
    /// is given. The format is picked from the extension (`.json` or TOML).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No policy file specified, using defaults");
            return Ok(Self::default());
        };

        info!("Loading policy from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json(content: &str) -> std::result::Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.node_filter_types()?;
        self.relation_filter_types()?;

        if self.capture_all && !self.enabled {
            warn!("capture_all has no effect while the policy is disabled");
        }

        Ok(())
    }

    /// Resolve the node filter names.
    pub fn node_filter_types(&self) -> std::result::Result<Vec<ProvType>, ConfigError> {
        resolve(&self.node_filter, false)
    }

    /// Resolve the relation filter names.
    pub fn relation_filter_types(&self) -> std::result::Result<Vec<ProvType>, ConfigError> {
        resolve(&self.relation_filter, true)
    }

    /// Merge with another configuration. Switches are taken from `other`;
    /// filters are combined.
    pub fn merge(&mut self, other: PolicyConfig) {
        self.enabled = other.enabled;
        self.capture_all = other.capture_all;
        self.compress_node = other.compress_node;
        self.compress_edge = other.compress_edge;

        for name in other.node_filter {
            if !self.node_filter.contains(&name) {
                self.node_filter.push(name);
            }
        }
        for name in other.relation_filter {
            if !self.relation_filter.contains(&name) {
                self.relation_filter.push(name);
            }
        }
    }
}

fn resolve(names: &[String], relations: bool) -> std::result::Result<Vec<ProvType>, ConfigError> {
    names
        .iter()
        .map(|name| {
            let entry = lookup_name(name)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown type name: {}", name)))?;
            if entry.is_relation != relations {
                let expected = if relations { "relation" } else { "node" };
                return Err(ConfigError::Invalid(format!(
                    "{} is not a {} type",
                    name, expected
                )));
            }
            Ok(entry.id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prov_core::taxonomy::{entity, relation};
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_default_config() {
        let config = PolicyConfig::load(None).unwrap();
        assert!(config.enabled);
        assert!(!config.capture_all);
        assert!(config.compress_node);
        assert!(config.compress_edge);
        assert!(config.node_filter.is_empty());
    }

    #[test]
    fn test_load_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            capture_all = true
            compress_edge = false
            node_filter = ["directory"]
            relation_filter = ["search"]
            "#
        )
        .unwrap();

        let config = PolicyConfig::load(Some(file.path())).unwrap();
        assert!(config.enabled);
        assert!(config.capture_all);
        assert!(!config.compress_edge);
        assert_eq!(config.node_filter_types().unwrap(), vec![entity::INODE_DIRECTORY]);
        assert_eq!(config.relation_filter_types().unwrap(), vec![relation::SEARCH]);
    }

    #[test]
    fn test_load_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "enabled": false, "relation_filter": ["read"] }}"#).unwrap();

        let config = PolicyConfig::load(Some(file.path())).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.relation_filter, vec!["read".to_string()]);
    }

    #[test]
    fn test_missing_file_fails() {
        let err = PolicyConfig::load(Some(Path::new("/nonexistent/policy.toml"))).unwrap_err();
        assert!(matches!(
            err,
            prov_core::Error::Config(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        let err = PolicyConfig::from_toml("enabled = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let config = PolicyConfig {
            node_filter: vec!["no_such_type".to_string()],
            ..PolicyConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = PolicyConfig {
            node_filter: vec!["read".to_string()],
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PolicyConfig {
            relation_filter: vec!["file".to_string()],
            ..PolicyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_config() {
        let mut base = PolicyConfig {
            node_filter: vec!["directory".to_string()],
            ..PolicyConfig::default()
        };
        let other = PolicyConfig {
            capture_all: true,
            compress_node: false,
            node_filter: vec!["directory".to_string(), "char".to_string()],
            relation_filter: vec!["search".to_string()],
            ..PolicyConfig::default()
        };

        base.merge(other);
        assert!(base.capture_all);
        assert!(!base.compress_node);
        assert_eq!(base.node_filter, vec!["directory", "char"]);
        assert_eq!(base.relation_filter, vec!["search"]);
    }
}
