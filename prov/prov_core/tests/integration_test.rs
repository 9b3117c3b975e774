//! Integration tests for the prov core library.
//!
//! These exercise the taxonomy, labels and records together through the
//! public API, the way graph decoders and the capture engine use them.

use prov_core::error::{LabelError, TaxonomyError};
use prov_core::taxonomy::{
    self, activity, entity, lookup, lookup_name, relation, type_table, ProvClass, ProvType,
    RelationClass, ACTIVITY, AGENT, ENTITY, RELATION, SUBTYPE_BITS,
};
use prov_core::types::{IfcContext, IfcLabel, LabelSlot, IFC_LABEL_MAX_SIZE};
use prov_core::{EndpointSnapshot, FlowDecision, NodeId, ProvRecord, RelationId, RelationRecord, Session};

#[test]
fn test_every_composition_round_trips() {
    let node_classes = [ACTIVITY, ENTITY, AGENT, ENTITY | taxonomy::LONG];
    for class in node_classes {
        for bit in 0..SUBTYPE_BITS {
            let id = ProvType::compose(class, 1 << bit).unwrap();
            assert_eq!(taxonomy::class_of(id.bits()), class);
            assert_eq!(taxonomy::subtype_of(id.bits()), 1 << bit);
            assert_eq!(ProvType::compose(id.class_bits(), id.subtype_bits()).unwrap(), id);
        }
    }

    for class in RelationClass::ALL {
        for bit in 0..SUBTYPE_BITS {
            let id = ProvType::compose(class.mask().bits(), 1 << bit).unwrap();
            assert_eq!(id.class_bits(), class.mask().bits());
            assert_eq!(id.subtype_bits(), 1 << bit);
            assert_eq!(ProvType::from_raw(id.bits()).unwrap(), id);
        }
    }
}

#[test]
fn test_relations_belong_to_exactly_one_class() {
    for entry in type_table().iter().filter(|entry| entry.is_relation) {
        let id = entry.id;
        assert!(id.is_a(RELATION));
        let own = match id.class() {
            ProvClass::Relation(class) => class,
            other => panic!("{} decoded as {:?}", entry.name, other),
        };
        for class in RelationClass::ALL {
            assert_eq!(id.is_a(class.mask().bits()), class == own, "{}", entry.name);
        }
    }
}

#[test]
fn test_node_types_are_not_relations() {
    for entry in type_table().iter().filter(|entry| !entry.is_relation) {
        assert!(entry.id.is_node());
        assert!(entry.id.relation_class().is_none());
        assert!(matches!(
            entry.id.class(),
            ProvClass::Activity | ProvClass::Entity | ProvClass::Agent
        ));
    }
}

#[test]
fn test_decoder_lookup() {
    let raw = relation::WRITE.with_flow(FlowDecision::Disallowed).bits();
    let id = ProvType::from_raw(raw).unwrap();
    assert_eq!(lookup(id).unwrap().name, "write");
    assert_eq!(id.flow(), FlowDecision::Disallowed);

    assert_eq!(lookup_name("task").unwrap().id, activity::TASK);
    assert!(matches!(
        ProvType::from_raw(0x0000_0000_0000_0001),
        Err(TaxonomyError::InvalidClass(_))
    ));
}

#[test]
fn test_full_label_rejects_add() {
    let mut label = IfcLabel::new();
    for tag in 0..IFC_LABEL_MAX_SIZE as u64 {
        label.add(0xdead_0000 + tag).unwrap();
    }
    let snapshot: Vec<u64> = label.iter().collect();

    assert_eq!(
        label.add(1),
        Err(LabelError::CapacityExceeded {
            capacity: IFC_LABEL_MAX_SIZE
        })
    );
    assert_eq!(label.size(), IFC_LABEL_MAX_SIZE);
    assert_eq!(label.iter().collect::<Vec<_>>(), snapshot);
}

#[test]
fn test_relation_record_carries_label_snapshot() {
    let session = Session::generate(1);
    let mut labels = IfcContext::default();
    labels.label_mut(LabelSlot::Integrity).add(9).unwrap();

    let from = EndpointSnapshot {
        id: NodeId::new(entity::INODE_FILE, 1, session),
        labels,
    };
    // Later label changes on the live context do not reach the copy.
    labels.label_mut(LabelSlot::Integrity).clear();

    let record = RelationRecord {
        id: RelationId::new(relation::READ, 1, session),
        timestamp: prov_core::types::timestamp_ns(),
        from,
        to: EndpointSnapshot {
            id: NodeId::new(activity::TASK, 2, session),
            labels: IfcContext::default(),
        },
        flags: 0,
        context: None,
        flow: FlowDecision::Unknown,
    };

    let json = serde_json::to_string(&ProvRecord::Relation(record.clone())).unwrap();
    let back: ProvRecord = serde_json::from_str(&json).unwrap();
    let back = back.as_relation().unwrap();
    assert!(back.from.labels.integrity.contains(9));
    assert_eq!(back, &record);
}
