use contact_ghosting::algs::wire::{RingBatch, decode_entity, encode_entity};
use contact_ghosting::overlap::accumulator::{GhostAccumulator, GhostSets};
use contact_ghosting::topology::entity::{
    Element, EntityKind, FrictionState, Node, NodeKind, Side,
};
use contact_ghosting::topology::gid::Gid;
use proptest::prelude::*;

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Slave), Just(Side::Master)]
}

fn node() -> impl Strategy<Value = Node> {
    let friction = (
        prop::array::uniform3(-1e3f64..1e3),
        prop::array::uniform3(-1e3f64..1e3),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(jump, traction, slip, active)| FrictionState {
            jump,
            traction,
            slip,
            active,
        });
    (
        any::<u64>(),
        0usize..64,
        side(),
        prop::array::uniform3(-1e6f64..1e6),
        prop::option::of(friction),
    )
        .prop_map(|(id, owner, side, coords, state)| match state {
            Some(s) => Node::friction(id, owner, side, coords, s),
            None => Node::plain(id, owner, side, coords),
        })
}

fn element() -> impl Strategy<Value = Element> {
    (
        any::<u64>(),
        0usize..64,
        side(),
        prop::collection::vec(any::<u64>(), 0..9),
    )
        .prop_map(|(id, owner, side, nodes)| Element::new(id, owner, side, nodes))
}

proptest! {
    #[test]
    fn node_payload_keeps_id_and_kind(n in node()) {
        let back: Node = decode_entity(&encode_entity(&n).unwrap()).unwrap();
        prop_assert_eq!(back.id, n.id);
        prop_assert_eq!(back.kind.is_friction(), n.kind.is_friction());
        if let (NodeKind::Friction(a), NodeKind::Friction(b)) = (&back.kind, &n.kind) {
            prop_assert_eq!(a, b);
        }
        prop_assert_eq!(back, n);
    }

    #[test]
    fn element_payload_keeps_connectivity(e in element()) {
        let back: Element = decode_entity(&encode_entity(&e).unwrap()).unwrap();
        prop_assert_eq!(&back.node_ids, &e.node_ids);
        prop_assert_eq!(back, e);
    }

    #[test]
    fn batch_preserves_records_and_bits(
        nodes in prop::collection::vec((node(), any::<bool>()), 0..16),
        round in any::<u32>(),
    ) {
        let mut batch = RingBatch::new(EntityKind::Node, round);
        for (n, owned) in &nodes {
            batch.push(encode_entity(n).unwrap(), *owned);
        }
        let back = RingBatch::decode(batch.encode().unwrap().into()).unwrap();
        prop_assert_eq!(back.round, round);
        prop_assert_eq!(back.len(), nodes.len());
        for (rec, (n, owned)) in back.records.iter().zip(&nodes) {
            prop_assert_eq!(rec.owned, *owned);
            let decoded: Node = decode_entity(&rec.payload).unwrap();
            prop_assert_eq!(&decoded, n);
        }
    }

    #[test]
    fn accumulator_only_grows(
        first in prop::collection::btree_set(0u64..200, 0..20),
        rounds in prop::collection::vec(
            (prop::collection::btree_set(0u64..200, 0..20),
             prop::collection::btree_set(0u64..200, 0..20)),
            0..8,
        ),
    ) {
        let mut acc = GhostAccumulator::new();
        acc.initialize(first.iter().map(|&g| Gid::new(g)), std::iter::empty());
        let mut prev: GhostSets = acc.sets().unwrap().clone();
        for (e, n) in rounds {
            acc.extend(e.into_iter().map(Gid::new), n.into_iter().map(Gid::new)).unwrap();
            let now = acc.sets().unwrap().clone();
            prop_assert!(now.is_superset(&prev));
            prev = now;
        }
        let drained = acc.drain().unwrap();
        prop_assert_eq!(drained, prev);
        prop_assert!(!acc.is_initialized());
    }
}
