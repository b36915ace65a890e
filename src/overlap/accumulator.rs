//! Running union of the entity IDs a rank must end up ghosting.
//!
//! Lifecycle per protocol run:
//! `initialize` (first discovery) → `extend`* (later discoveries) →
//! `union_baseline` → `drain` (hands the sets over and resets).

use crate::contact_error::ContactError;
use crate::topology::entity::{EntityKind, Side};
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;
use std::collections::BTreeSet;

/// Column sets visible before any ownership rotation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Baseline {
    pub slave_elements: BTreeSet<Gid>,
    pub slave_nodes: BTreeSet<Gid>,
    pub master_elements: BTreeSet<Gid>,
    pub master_nodes: BTreeSet<Gid>,
}

impl Baseline {
    /// Snapshot the current column sets of `store`.
    pub fn capture(store: &InterfaceStore) -> Self {
        let col = |side, kind| store.partition(side, kind).col().clone();
        Self {
            slave_elements: col(Side::Slave, EntityKind::Element),
            slave_nodes: col(Side::Slave, EntityKind::Node),
            master_elements: col(Side::Master, EntityKind::Element),
            master_nodes: col(Side::Master, EntityKind::Node),
        }
    }
}

/// The element/node ID sets a rank must ghost at the end of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GhostSets {
    pub elements: BTreeSet<Gid>,
    pub nodes: BTreeSet<Gid>,
}

impl GhostSets {
    pub fn len(&self) -> (usize, usize) {
        (self.elements.len(), self.nodes.len())
    }

    pub fn is_superset(&self, other: &GhostSets) -> bool {
        self.elements.is_superset(&other.elements) && self.nodes.is_superset(&other.nodes)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GhostAccumulator {
    state: Option<GhostSets>,
}

impl GhostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// First-round discovery; replaces any previous content.
    pub fn initialize<E, N>(&mut self, elements: E, nodes: N)
    where
        E: IntoIterator<Item = Gid>,
        N: IntoIterator<Item = Gid>,
    {
        self.state = Some(GhostSets {
            elements: elements.into_iter().collect(),
            nodes: nodes.into_iter().collect(),
        });
    }

    /// Union newly discovered IDs into the running sets.
    pub fn extend<E, N>(&mut self, elements: E, nodes: N) -> Result<(), ContactError>
    where
        E: IntoIterator<Item = Gid>,
        N: IntoIterator<Item = Gid>,
    {
        let state = self
            .state
            .as_mut()
            .ok_or(ContactError::AccumulatorNotInitialized)?;
        state.elements.extend(elements);
        state.nodes.extend(nodes);
        Ok(())
    }

    /// Add every baseline column ID, slave and master alike.
    pub fn union_baseline(&mut self, baseline: &Baseline) -> Result<(), ContactError> {
        self.extend(
            baseline
                .slave_elements
                .iter()
                .chain(&baseline.master_elements)
                .copied(),
            baseline
                .slave_nodes
                .iter()
                .chain(&baseline.master_nodes)
                .copied(),
        )
    }

    /// Current content, if initialized.
    pub fn sets(&self) -> Option<&GhostSets> {
        self.state.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Hand the accumulated sets over and leave the accumulator reset.
    pub fn drain(&mut self) -> Result<GhostSets, ContactError> {
        self.state
            .take()
            .ok_or(ContactError::AccumulatorNotInitialized)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
