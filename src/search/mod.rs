//! Proximity search between slave and master interface elements.
//!
//! The round-robin protocol only needs *candidate* pairs: for every slave
//! element visible on this rank, the master elements whose inflated bounding
//! boxes overlap it. Exact contact detection happens downstream.
//!
//! Two strategies are provided:
//! - [`BruteForceSearch`]: every slave box against every master box.
//! - [`BinaryTreeSearch`]: a bounding-volume tree over the master column
//!   elements, which must be [`rebuild`](ProximitySearch::rebuild)t whenever
//!   the master column set changes.

pub mod aabb;
pub mod binary_tree;
pub mod brute_force;

pub use aabb::Aabb;
pub use binary_tree::BinaryTreeSearch;
pub use brute_force::BruteForceSearch;

use crate::contact_error::ContactError;
use crate::topology::entity::{EntityKind, Side};
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;
use std::collections::{BTreeMap, BTreeSet};

/// Candidate master elements per slave element, both ordered by ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
    candidates: BTreeMap<Gid, Vec<Gid>>,
}

impl SearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the candidates of one slave element; duplicates are dropped and
    /// the list is kept sorted. Empty lists are not stored.
    pub fn insert(&mut self, slave: Gid, masters: impl IntoIterator<Item = Gid>) {
        let mut v: Vec<Gid> = masters.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        if !v.is_empty() {
            self.candidates.insert(slave, v);
        }
    }

    pub fn candidates(&self, slave: Gid) -> &[Gid] {
        self.candidates.get(&slave).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Gid, &[Gid])> + '_ {
        self.candidates.iter().map(|(s, m)| (*s, m.as_slice()))
    }

    /// Every master element that is a candidate of some slave element.
    pub fn master_elements(&self) -> BTreeSet<Gid> {
        self.candidates.values().flatten().copied().collect()
    }

    /// Number of (slave, master) pairs.
    pub fn pair_count(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Pluggable proximity search.
///
/// Implementations must be deterministic for a fixed store state and must
/// tolerate repeated calls as the master column set rotates.
pub trait ProximitySearch: Send {
    fn name(&self) -> &'static str;

    /// Rebuild any acceleration structure over the current master column set.
    fn rebuild(&mut self, store: &InterfaceStore) -> Result<(), ContactError>;

    /// Candidates for every slave column element.
    fn search(&self, store: &InterfaceStore) -> Result<SearchResult, ContactError>;
}

/// Bounding box of one column element on `side`.
pub(crate) fn element_box(
    store: &InterfaceStore,
    side: Side,
    gid: Gid,
) -> Result<Aabb, ContactError> {
    let element = store.element_or_err(side, gid)?;
    let mut bb = Aabb::empty();
    for &nid in &element.node_ids {
        let node = store.node_or_err(side, nid)?;
        bb.grow(node.coords);
    }
    Ok(bb)
}

/// Boxes of every column element on `side`, in ID order.
pub(crate) fn column_boxes(
    store: &InterfaceStore,
    side: Side,
) -> Result<Vec<(Gid, Aabb)>, ContactError> {
    store
        .partition(side, EntityKind::Element)
        .col()
        .iter()
        .map(|&gid| element_box(store, side, gid).map(|bb| (gid, bb)))
        .collect()
}

/// Slave boxes inflated by `factor` times their own diameter.
pub(crate) fn inflated_slave_boxes(
    store: &InterfaceStore,
    factor: f64,
) -> Result<Vec<(Gid, Aabb)>, ContactError> {
    let mut boxes = column_boxes(store, Side::Slave)?;
    for (_, bb) in &mut boxes {
        let margin = factor * bb.diameter();
        bb.inflate(margin);
    }
    Ok(boxes)
}
