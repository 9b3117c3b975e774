//! The policy gate shared by all recording paths.
//!
//! Recording code takes one [`PolicySnapshot`] per call and consults only
//! that snapshot, so a concurrent policy change never produces a half-applied
//! decision. Only the external controller replaces the snapshot.

use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

use prov_core::error::ConfigError;

use crate::config::PolicyConfig;
use crate::snapshot::PolicySnapshot;

/// Holder of the current policy.
#[derive(Debug, Default)]
pub struct PolicyGate {
    current: RwLock<Arc<PolicySnapshot>>,
}

impl PolicyGate {
    /// A gate holding the given snapshot.
    pub fn new(snapshot: PolicySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// A gate holding a resolved configuration.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(PolicySnapshot::from_config(config)?))
    }

    /// The policy in force right now.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the policy. Calls already holding a snapshot keep using it.
    pub fn replace(&self, snapshot: PolicySnapshot) {
        *self.current.write() = Arc::new(snapshot);
        info!("Capture policy replaced");
    }

    /// Resolve and install a configuration. The current policy is kept if
    /// the configuration is invalid.
    pub fn apply(&self, config: &PolicyConfig) -> Result<(), ConfigError> {
        let snapshot = PolicySnapshot::from_config(config)?;
        self.replace(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_old_snapshots() {
        let gate = PolicyGate::default();
        let before = gate.snapshot();
        assert!(!before.capture_all());

        let config = PolicyConfig {
            capture_all: true,
            ..PolicyConfig::default()
        };
        gate.apply(&config).unwrap();

        assert!(!before.capture_all());
        assert!(gate.snapshot().capture_all());
    }

    #[test]
    fn test_invalid_apply_keeps_policy() {
        let gate = PolicyGate::from_config(&PolicyConfig {
            capture_all: true,
            ..PolicyConfig::default()
        })
        .unwrap();

        let bad = PolicyConfig {
            node_filter: vec!["read".to_string()],
            ..PolicyConfig::default()
        };
        assert!(gate.apply(&bad).is_err());
        assert!(gate.snapshot().capture_all());
    }
}
