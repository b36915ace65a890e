//! Committing rotated or final partitions to the interface store.
//!
//! A commit merges the (rotating) master partitions with the (fixed) slave
//! partitions into one row/column view, checks it with
//! [`InterfaceStore::fill_complete`], and then hands it to the caller's
//! [`PartitionFinalize`] hook, which may rebuild arbitrarily expensive
//! derived data.

use crate::contact_error::ContactError;
use crate::debug_invariants::DebugInvariants;
use crate::overlap::accumulator::GhostSets;
use crate::topology::entity::{EntityKind, Side};
use crate::topology::gid::Gid;
use crate::topology::ownership::PartitionView;
use crate::topology::store::InterfaceStore;
use std::collections::BTreeSet;

/// Caller-supplied step that makes a newly assigned partition usable by
/// downstream consumers. Invoked once per round and once at the end.
pub trait PartitionFinalize {
    fn finalize(&mut self, rank: usize, view: &PartitionView) -> Result<(), ContactError>;
}

/// Finalize hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFinalize;

impl PartitionFinalize for NoopFinalize {
    fn finalize(&mut self, _rank: usize, _view: &PartitionView) -> Result<(), ContactError> {
        Ok(())
    }
}

impl<F> PartitionFinalize for F
where
    F: FnMut(usize, &PartitionView) -> Result<(), ContactError>,
{
    fn finalize(&mut self, rank: usize, view: &PartitionView) -> Result<(), ContactError> {
        self(rank, view)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartitionCommitter {
    check_invariants: bool,
}

impl PartitionCommitter {
    pub fn new(check_invariants: bool) -> Self {
        Self { check_invariants }
    }

    /// Merge the current slave and master partitions and finalize them.
    pub fn commit_round(
        &self,
        store: &mut InterfaceStore,
        finalize: &mut dyn PartitionFinalize,
    ) -> Result<(), ContactError> {
        if self.check_invariants {
            store.validate_invariants()?;
        }
        let view = PartitionView::merge(
            store.partition(Side::Slave, EntityKind::Node),
            store.partition(Side::Slave, EntityKind::Element),
            store.partition(Side::Master, EntityKind::Node),
            store.partition(Side::Master, EntityKind::Element),
        );
        store.fill_complete(view)?;
        store.debug_assert_invariants();
        finalize.finalize(store.rank(), store.view())
    }

    /// Install `ghosts` as the authoritative column sets and finalize.
    ///
    /// Each ID is routed to the column set of the side it belongs to; row
    /// sets are left as they are and stay visible.
    ///
    /// # Errors
    /// `DanglingReference` if an ID was never seen on this rank.
    pub fn commit_ghosts(
        &self,
        store: &mut InterfaceStore,
        ghosts: GhostSets,
        finalize: &mut dyn PartitionFinalize,
    ) -> Result<(), ContactError> {
        for (kind, ids) in [
            (EntityKind::Element, ghosts.elements),
            (EntityKind::Node, ghosts.nodes),
        ] {
            let (slave, master) = split_by_side(store, kind, ids)?;
            store.set_col(Side::Slave, kind, slave);
            store.set_col(Side::Master, kind, master);
        }
        self.commit_round(store, finalize)
    }
}

fn split_by_side(
    store: &InterfaceStore,
    kind: EntityKind,
    ids: BTreeSet<Gid>,
) -> Result<(BTreeSet<Gid>, BTreeSet<Gid>), ContactError> {
    let mut slave = BTreeSet::new();
    let mut master = BTreeSet::new();
    for gid in ids {
        match store.side_of(kind, gid) {
            Some(Side::Slave) => slave.insert(gid),
            Some(Side::Master) => master.insert(gid),
            None => {
                return Err(ContactError::DanglingReference {
                    side: Side::Master,
                    kind,
                    gid,
                });
            }
        };
    }
    Ok((slave, master))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::entity::{Element, Node};

    fn store() -> InterfaceStore {
        let mut s = InterfaceStore::new(0, 1);
        s.add_node(Node::plain(1u64, 0, Side::Slave, [0.0; 3])).unwrap();
        s.add_element(Element::new(2u64, 0, Side::Slave, [1u64])).unwrap();
        s.add_node(Node::plain(3u64, 0, Side::Master, [0.0; 3])).unwrap();
        s.add_element(Element::new(4u64, 0, Side::Master, [3u64])).unwrap();
        s
    }

    #[test]
    fn commit_round_merges_and_calls_hook() {
        let mut s = store();
        let mut calls = Vec::new();
        let mut hook = |rank: usize, view: &PartitionView| -> Result<(), ContactError> {
            calls.push((rank, view.col_elements.len(), view.col_nodes.len()));
            Ok(())
        };
        PartitionCommitter::new(true)
            .commit_round(&mut s, &mut hook)
            .unwrap();
        assert_eq!(calls, vec![(0, 2, 2)]);
        assert!(s.is_filled());
    }

    #[test]
    fn hook_error_propagates() {
        let mut s = store();
        let mut hook = |_: usize, _: &PartitionView| -> Result<(), ContactError> {
            Err(ContactError::InvalidConfig("boom".into()))
        };
        assert!(
            PartitionCommitter::default()
                .commit_round(&mut s, &mut hook)
                .is_err()
        );
    }

    #[test]
    fn ghosts_are_routed_by_side() {
        let mut s = store();
        let ghosts = GhostSets {
            elements: [Gid::new(2), Gid::new(4)].into(),
            nodes: [Gid::new(1), Gid::new(3)].into(),
        };
        PartitionCommitter::new(true)
            .commit_ghosts(&mut s, ghosts, &mut NoopFinalize)
            .unwrap();
        assert!(s.partition(Side::Slave, EntityKind::Element).is_visible(Gid::new(2)));
        assert!(s.partition(Side::Master, EntityKind::Element).is_visible(Gid::new(4)));
    }

    #[test]
    fn unknown_ghost_is_dangling() {
        let mut s = store();
        let ghosts = GhostSets {
            elements: [Gid::new(99)].into(),
            nodes: BTreeSet::new(),
        };
        assert!(matches!(
            PartitionCommitter::default().commit_ghosts(&mut s, ghosts, &mut NoopFinalize),
            Err(ContactError::DanglingReference { .. })
        ));
    }

    #[test]
    fn ghost_element_without_its_nodes_is_dangling() {
        // rank 0 of 2: node 3 is a ghost, so it only stays visible if requested
        let mut s = InterfaceStore::new(0, 2);
        s.add_node(Node::plain(3u64, 1, Side::Master, [0.0; 3])).unwrap();
        s.add_element(Element::new(4u64, 1, Side::Master, [3u64])).unwrap();
        let ghosts = GhostSets {
            elements: [Gid::new(4)].into(),
            nodes: BTreeSet::new(),
        };
        let err = PartitionCommitter::default()
            .commit_ghosts(&mut s, ghosts, &mut NoopFinalize)
            .unwrap_err();
        assert_eq!(
            err,
            ContactError::DanglingReference {
                side: Side::Master,
                kind: EntityKind::Node,
                gid: Gid::new(3),
            }
        );
    }
}
