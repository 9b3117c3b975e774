//! Policy gate behaviour across threads and configuration sources.

use std::io::Write;
use std::sync::Arc;
use std::thread;

use prov_core::taxonomy::{entity, relation};
use prov_policy::{PolicyConfig, PolicyGate, PolicySnapshot};
use tempfile::NamedTempFile;

#[test]
fn test_snapshot_is_stable_during_replacement() {
    // The default policy has capture_all off and compress_edge on.
    let gate = Arc::new(PolicyGate::default());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..1000 {
                    let snapshot = gate.snapshot();
                    // Both switches flip together; a snapshot never mixes them.
                    assert_eq!(snapshot.capture_all(), !snapshot.compress_edge());
                }
            })
        })
        .collect();

    let writer = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            for round in 0..200 {
                let config = PolicyConfig {
                    capture_all: round % 2 == 0,
                    compress_edge: round % 2 != 0,
                    ..PolicyConfig::default()
                };
                gate.apply(&config).unwrap();
            }
        })
    };

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_file_to_gate() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "capture_all = true\nnode_filter = [\"msg\", \"shm\"]\nrelation_filter = [\"ran_on\"]"
    )
    .unwrap();

    let mut config = PolicyConfig::load(Some(file.path())).unwrap();
    config.merge(PolicyConfig {
        capture_all: true,
        relation_filter: vec!["perm_check".to_string()],
        ..PolicyConfig::default()
    });

    let gate = PolicyGate::from_config(&config).unwrap();
    let snapshot = gate.snapshot();
    assert!(snapshot.capture_all());
    assert!(snapshot.filter_node(entity::MSG));
    assert!(snapshot.filter_node(entity::SHM));
    assert!(!snapshot.filter_node(entity::PROC));
    assert!(snapshot.filter_relation(relation::RAN_ON));
    assert!(snapshot.filter_relation(relation::PERM));
    assert!(!snapshot.filter_relation(relation::READ));

    gate.replace(PolicySnapshot::default());
    assert!(!gate.snapshot().capture_all());
    assert!(snapshot.capture_all());
}
