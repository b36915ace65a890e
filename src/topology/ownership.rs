//! Row/column ownership sets for one entity collection.
//!
//! A [`Partition`] records, for a single (side, entity kind) pair on the
//! current rank, the *row* set (entities this rank owns) and the *column* set
//! (every entity this rank can see, owned or ghosted). Row sets are pairwise
//! disjoint across ranks; column sets overlap.

use crate::topology::gid::Gid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How an entity is held on the current rank.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Ownership {
    /// Owned by the current rank.
    Owned,
    /// Read-only replica of an entity owned elsewhere.
    Ghost,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    row: BTreeSet<Gid>,
    col: BTreeSet<Gid>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit sets; `row` is folded into `col`.
    pub fn from_sets(row: BTreeSet<Gid>, mut col: BTreeSet<Gid>) -> Self {
        col.extend(row.iter().copied());
        Self { row, col }
    }

    /// Owned IDs.
    pub fn row(&self) -> &BTreeSet<Gid> {
        &self.row
    }

    /// Locally visible IDs (owned and ghost).
    pub fn col(&self) -> &BTreeSet<Gid> {
        &self.col
    }

    /// Take ownership of `gid`; it becomes visible as well.
    pub fn insert_owned(&mut self, gid: Gid) {
        self.row.insert(gid);
        self.col.insert(gid);
    }

    /// Make `gid` visible without taking ownership.
    ///
    /// A ghost insert never demotes an entity this rank already owns.
    pub fn insert_ghost(&mut self, gid: Gid) {
        self.col.insert(gid);
    }

    pub fn is_owned(&self, gid: Gid) -> bool {
        self.row.contains(&gid)
    }

    pub fn is_visible(&self, gid: Gid) -> bool {
        self.col.contains(&gid)
    }

    pub fn ownership(&self, gid: Gid) -> Option<Ownership> {
        if self.row.contains(&gid) {
            Some(Ownership::Owned)
        } else if self.col.contains(&gid) {
            Some(Ownership::Ghost)
        } else {
            None
        }
    }

    /// Iterate over visible IDs that are not owned here.
    pub fn ghosts(&self) -> impl Iterator<Item = Gid> + '_ {
        self.col.difference(&self.row).copied()
    }

    /// Replace the column set, keeping every owned ID visible.
    pub fn set_col(&mut self, col: BTreeSet<Gid>) {
        self.col = col;
        self.col.extend(self.row.iter().copied());
    }

    /// Drop everything, returning the previous partition.
    pub fn take(&mut self) -> Partition {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.col.is_empty()
    }

    /// Returns the first owned ID that is not visible, if any.
    pub fn first_row_outside_col(&self) -> Option<Gid> {
        self.row.difference(&self.col).next().copied()
    }
}

/// Merged slave+master row/column maps of one rank, as handed to the
/// partition-finalize hook.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionView {
    pub row_nodes: BTreeSet<Gid>,
    pub col_nodes: BTreeSet<Gid>,
    pub row_elements: BTreeSet<Gid>,
    pub col_elements: BTreeSet<Gid>,
}

impl PartitionView {
    /// Union of the slave and master partitions for each collection.
    pub fn merge(
        slave_nodes: &Partition,
        slave_elements: &Partition,
        master_nodes: &Partition,
        master_elements: &Partition,
    ) -> Self {
        let union = |a: &BTreeSet<Gid>, b: &BTreeSet<Gid>| a.union(b).copied().collect();
        Self {
            row_nodes: union(master_nodes.row(), slave_nodes.row()),
            col_nodes: union(master_nodes.col(), slave_nodes.col()),
            row_elements: union(master_elements.row(), slave_elements.row()),
            col_elements: union(master_elements.col(), slave_elements.col()),
        }
    }
}
