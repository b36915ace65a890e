//! Per-rank storage of a contact interface: entity arena plus partitions.
//!
//! Entities live in an arena keyed by [`Gid`]. Whether an entity is owned or
//! ghosted on this rank is decided solely by the four [`Partition`]s; the
//! arena keeps every entity this rank has ever seen so that a later ghosting
//! request can be resolved locally. Removing an entity from a row set is how
//! ownership is given away; arena data is never freed during a protocol run.

use crate::contact_error::ContactError;
use crate::debug_invariants::DebugInvariants;
use crate::topology::entity::{Element, EntityKind, InterfaceEntity, Node, Side};
use crate::topology::gid::Gid;
use crate::topology::ownership::{Partition, PartitionView};
use hashbrown::HashMap;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default)]
pub struct InterfaceStore {
    rank: usize,
    size: usize,
    nodes: HashMap<Gid, Node>,
    elements: HashMap<Gid, Element>,
    slave_nodes: Partition,
    slave_elements: Partition,
    master_nodes: Partition,
    master_elements: Partition,
    view: PartitionView,
    filled: bool,
}

impl InterfaceStore {
    /// Empty store for `rank` out of `size` cooperating ranks.
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size: size.max(1),
            ..Self::default()
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Insert a node; it is owned here iff `node.owner == rank`.
    pub fn add_node(&mut self, node: Node) -> Result<(), ContactError> {
        self.check_side(node.id, node.side, EntityKind::Node)?;
        let owned = node.owner == self.rank;
        let part = self.partition_mut(node.side, EntityKind::Node);
        if owned {
            part.insert_owned(node.id);
        } else {
            part.insert_ghost(node.id);
        }
        self.nodes.insert(node.id, node);
        self.filled = false;
        Ok(())
    }

    /// Insert an element; it is owned here iff `element.owner == rank`.
    pub fn add_element(&mut self, element: Element) -> Result<(), ContactError> {
        self.check_side(element.id, element.side, EntityKind::Element)?;
        let owned = element.owner == self.rank;
        let part = self.partition_mut(element.side, EntityKind::Element);
        if owned {
            part.insert_owned(element.id);
        } else {
            part.insert_ghost(element.id);
        }
        self.elements.insert(element.id, element);
        self.filled = false;
        Ok(())
    }

    fn check_side(&self, gid: Gid, side: Side, kind: EntityKind) -> Result<(), ContactError> {
        let existing = match kind {
            EntityKind::Node => self.nodes.get(&gid).map(|n| n.side),
            EntityKind::Element => self.elements.get(&gid).map(|e| e.side),
        };
        match existing {
            Some(s) if s != side => Err(ContactError::SideCollision(gid)),
            _ => Ok(()),
        }
    }

    pub fn partition(&self, side: Side, kind: EntityKind) -> &Partition {
        match (side, kind) {
            (Side::Slave, EntityKind::Node) => &self.slave_nodes,
            (Side::Slave, EntityKind::Element) => &self.slave_elements,
            (Side::Master, EntityKind::Node) => &self.master_nodes,
            (Side::Master, EntityKind::Element) => &self.master_elements,
        }
    }

    pub(crate) fn partition_mut(&mut self, side: Side, kind: EntityKind) -> &mut Partition {
        match (side, kind) {
            (Side::Slave, EntityKind::Node) => &mut self.slave_nodes,
            (Side::Slave, EntityKind::Element) => &mut self.slave_elements,
            (Side::Master, EntityKind::Node) => &mut self.master_nodes,
            (Side::Master, EntityKind::Element) => &mut self.master_elements,
        }
    }

    pub fn node(&self, gid: Gid) -> Option<&Node> {
        self.nodes.get(&gid)
    }

    pub fn element(&self, gid: Gid) -> Option<&Element> {
        self.elements.get(&gid)
    }

    /// Mutable access for geometry or friction updates between protocol runs.
    pub fn node_mut(&mut self, gid: Gid) -> Option<&mut Node> {
        self.filled = false;
        self.nodes.get_mut(&gid)
    }

    /// Look up a node, treating a miss as a bookkeeping defect.
    pub fn node_or_err(&self, side: Side, gid: Gid) -> Result<&Node, ContactError> {
        self.nodes
            .get(&gid)
            .ok_or(ContactError::DanglingReference {
                side,
                kind: EntityKind::Node,
                gid,
            })
    }

    /// Look up an element, treating a miss as a bookkeeping defect.
    pub fn element_or_err(&self, side: Side, gid: Gid) -> Result<&Element, ContactError> {
        self.elements
            .get(&gid)
            .ok_or(ContactError::DanglingReference {
                side,
                kind: EntityKind::Element,
                gid,
            })
    }

    /// Side of a known entity, or `None` if the arena has never seen it.
    pub fn side_of(&self, kind: EntityKind, gid: Gid) -> Option<Side> {
        match kind {
            EntityKind::Node => self.nodes.get(&gid).map(|n| n.side),
            EntityKind::Element => self.elements.get(&gid).map(|e| e.side),
        }
    }

    /// Merged row/column maps installed by the last commit.
    pub fn view(&self) -> &PartitionView {
        &self.view
    }

    /// True once `fill_complete` has succeeded and nothing changed since.
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    // ----- ring exchange support -------------------------------------------

    /// Borrow an arena entity of the given collection.
    pub(crate) fn entity<E: StoredEntity>(&self, gid: Gid) -> Option<&E> {
        E::arena(self).get(&gid)
    }

    /// Detach the master partition of a collection, leaving it empty.
    ///
    /// After this call the rank neither owns nor sees any master entity of
    /// that collection until the incoming batch is applied.
    pub(crate) fn take_master(&mut self, kind: EntityKind) -> Partition {
        self.filled = false;
        self.partition_mut(Side::Master, kind).take()
    }

    /// Advance the recorded owner of every master-side arena entry by one
    /// ring hop. Called once per collection per round, before incoming
    /// entities are applied.
    pub(crate) fn advance_master_owners(&mut self, kind: EntityKind) {
        let size = self.size;
        match kind {
            EntityKind::Node => advance(&mut self.nodes, size),
            EntityKind::Element => advance(&mut self.elements, size),
        }
    }

    /// Store a received master entity and record it as owned or ghosted.
    ///
    /// # Errors
    /// `SideCollision` if the ID is already known here as a slave entity.
    pub(crate) fn apply_received<E: StoredEntity>(
        &mut self,
        entity: E,
        owned: bool,
    ) -> Result<(), ContactError> {
        let gid = entity.gid();
        self.check_side(gid, Side::Master, E::KIND)?;
        let part = self.partition_mut(Side::Master, E::KIND);
        if owned {
            part.insert_owned(gid);
        } else {
            part.insert_ghost(gid);
        }
        E::arena_mut(self).insert(gid, entity);
        Ok(())
    }

    /// Replace a column set wholesale (final ghost commit).
    pub(crate) fn set_col(&mut self, side: Side, kind: EntityKind, col: BTreeSet<Gid>) {
        self.filled = false;
        self.partition_mut(side, kind).set_col(col);
    }

    /// Make the current partitions consistent and install `view`.
    ///
    /// Every column element must resolve in the arena and find each of its
    /// nodes in the column node set of its side.
    pub fn fill_complete(&mut self, view: PartitionView) -> Result<(), ContactError> {
        for side in [Side::Slave, Side::Master] {
            let col_nodes = self.partition(side, EntityKind::Node).col();
            for &eid in self.partition(side, EntityKind::Element).col() {
                let element = self.element_or_err(side, eid)?;
                if let Some(&nid) = element.node_ids.iter().find(|n| !col_nodes.contains(n)) {
                    return Err(ContactError::DanglingReference {
                        side,
                        kind: EntityKind::Node,
                        gid: nid,
                    });
                }
            }
        }
        self.view = view;
        self.filled = true;
        log::trace!(
            "[rank {}] fill_complete: {} row / {} col nodes, {} row / {} col elements",
            self.rank,
            self.view.row_nodes.len(),
            self.view.col_nodes.len(),
            self.view.row_elements.len(),
            self.view.col_elements.len()
        );
        Ok(())
    }

    /// Number of arena entries (all entities ever seen).
    pub fn arena_len(&self) -> (usize, usize) {
        (self.nodes.len(), self.elements.len())
    }
}

fn advance<E: InterfaceEntity>(arena: &mut HashMap<Gid, E>, size: usize) {
    for entity in arena.values_mut() {
        if entity.side() == Side::Master {
            let next = (entity.owner() + 1) % size;
            entity.set_owner(next);
        }
    }
}

/// Entity types that have an arena in [`InterfaceStore`].
pub(crate) trait StoredEntity: InterfaceEntity {
    fn arena(store: &InterfaceStore) -> &HashMap<Gid, Self>;
    fn arena_mut(store: &mut InterfaceStore) -> &mut HashMap<Gid, Self>;
}

impl StoredEntity for Node {
    fn arena(store: &InterfaceStore) -> &HashMap<Gid, Self> {
        &store.nodes
    }
    fn arena_mut(store: &mut InterfaceStore) -> &mut HashMap<Gid, Self> {
        &mut store.nodes
    }
}

impl StoredEntity for Element {
    fn arena(store: &InterfaceStore) -> &HashMap<Gid, Self> {
        &store.elements
    }
    fn arena_mut(store: &mut InterfaceStore) -> &mut HashMap<Gid, Self> {
        &mut store.elements
    }
}

impl DebugInvariants for InterfaceStore {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "InterfaceStore");
    }

    fn validate_invariants(&self) -> Result<(), ContactError> {
        for side in [Side::Slave, Side::Master] {
            for kind in [EntityKind::Node, EntityKind::Element] {
                let part = self.partition(side, kind);
                if let Some(gid) = part.first_row_outside_col() {
                    return Err(ContactError::DanglingReference { side, kind, gid });
                }
                for &gid in part.col() {
                    match self.side_of(kind, gid) {
                        Some(s) if s == side => {}
                        Some(_) => return Err(ContactError::SideCollision(gid)),
                        None => return Err(ContactError::DanglingReference { side, kind, gid }),
                    }
                }
            }
            let col_nodes = self.partition(side, EntityKind::Node).col();
            for &eid in self.partition(side, EntityKind::Element).col() {
                let element = self.element_or_err(side, eid)?;
                if let Some(&nid) = element.node_ids.iter().find(|n| !col_nodes.contains(n)) {
                    return Err(ContactError::DanglingReference {
                        side,
                        kind: EntityKind::Node,
                        gid: nid,
                    });
                }
            }
        }
        Ok(())
    }
}
