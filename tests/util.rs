#![allow(dead_code)]
use contact_ghosting::{
    algs::communicator::ThreadComm,
    algs::distribute::InterfaceMesh,
    topology::entity::{Element, EntityKind, Node, Side},
    topology::gid::Gid,
    topology::store::InterfaceStore,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

pub fn gid(u: u64) -> Gid {
    Gid::new(u)
}

pub fn gids(v: &[u64]) -> BTreeSet<Gid> {
    v.iter().copied().map(Gid::new).collect()
}

/// Run `f` once per rank of a `size`-rank thread universe and collect the
/// results in rank order.
pub fn run_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&ThreadComm) -> T + Sync,
{
    let comms = ThreadComm::universe(size);
    std::thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = comms.iter().map(|c| s.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// Add a two-node segment `[x0, x1]` at height `y`, with its own nodes.
pub fn segment(mesh: &mut InterfaceMesh, side: Side, id: u64, owner: usize, x0: f64, x1: f64, y: f64) {
    let (a, b) = (10 * id, 10 * id + 1);
    mesh.push_node(Node::plain(a, owner, side, [x0, y, 0.0]))
        .push_node(Node::plain(b, owner, side, [x1, y, 0.0]))
        .push_element(Element::new(id, owner, side, [a, b]));
}

/// Three ranks; master elements 10, 11 on rank 0, 12, 13 on rank 1 and 14
/// on rank 2, laid out left to right. Rank 0's slave element 1 hovers over
/// element 12; rank 2's slave element 2 hovers over element 10.
pub fn literal_scenario() -> InterfaceMesh {
    let mut m = InterfaceMesh::new();
    for (i, owner) in [0usize, 0, 1, 1, 2].into_iter().enumerate() {
        let x = 2.0 * i as f64;
        segment(&mut m, Side::Master, 10 + i as u64, owner, x, x + 1.0, 0.0);
    }
    segment(&mut m, Side::Slave, 1, 0, 4.2, 4.8, 0.1);
    segment(&mut m, Side::Slave, 2, 2, 0.2, 0.8, 0.1);
    m
}

/// A master strip of `n_master` unit segments sharing nodes, and a slave strip
/// of `n_slave` segments hovering above it at a different pitch. Owners are
/// drawn uniformly from `0..size`, independently for nodes and elements.
pub fn random_strips(n_master: u64, n_slave: u64, size: usize, seed: u64) -> InterfaceMesh {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut m = InterfaceMesh::new();
    for i in 0..=n_master {
        m.push_node(Node::plain(10_000 + i, 0, Side::Master, [i as f64, 0.0, 0.0]));
    }
    for i in 0..n_master {
        m.push_element(Element::new(1_000 + i, 0, Side::Master, [10_000 + i, 10_001 + i]));
    }
    let pitch = n_master as f64 / n_slave.max(1) as f64;
    for i in 0..=n_slave {
        let x = i as f64 * pitch + 0.37;
        m.push_node(Node::plain(20_000 + i, 0, Side::Slave, [x, 0.05, 0.0]));
    }
    for i in 0..n_slave {
        m.push_element(Element::new(2_000 + i, 0, Side::Slave, [20_000 + i, 20_001 + i]));
    }
    m.assign_owners(|_, _| rng.gen_range(0..size));
    m
}

/// Master row/col sets of one store, elements then nodes.
pub fn master_sets(store: &InterfaceStore) -> [BTreeSet<Gid>; 4] {
    let e = store.partition(Side::Master, EntityKind::Element);
    let n = store.partition(Side::Master, EntityKind::Node);
    [e.row().clone(), e.col().clone(), n.row().clone(), n.col().clone()]
}

/// Assert that no ID appears in two of the given row sets.
pub fn assert_disjoint(rows: &[BTreeSet<Gid>]) {
    for (i, a) in rows.iter().enumerate() {
        for b in &rows[i + 1..] {
            let both: Vec<_> = a.intersection(b).collect();
            assert!(both.is_empty(), "owned twice: {both:?}");
        }
    }
}
