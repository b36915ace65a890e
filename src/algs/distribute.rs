//! Build one rank's [`InterfaceStore`] from a global interface description.
//!
//! Every entity carries its owner rank. A rank's row sets are the entities it
//! owns; its element column sets add any explicitly requested ghosts, and its
//! node column sets are closed over the nodes of every column element.

use crate::contact_error::ContactError;
use crate::topology::entity::{Element, EntityKind, InterfaceEntity, Node};
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The full slave and master interface, as known before distribution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InterfaceMesh {
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    /// Elements each rank should see as ghosts from the start.
    pub ghosts: BTreeMap<usize, BTreeSet<Gid>>,
}

impl InterfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn push_element(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    /// Make `element` visible on `rank` without ownership.
    pub fn add_ghost(&mut self, rank: usize, element: Gid) -> &mut Self {
        self.ghosts.entry(rank).or_default().insert(element);
        self
    }

    /// Reassign every entity's owner with `f(kind, gid)`.
    pub fn assign_owners(&mut self, mut f: impl FnMut(EntityKind, Gid) -> usize) {
        for n in &mut self.nodes {
            n.owner = f(EntityKind::Node, n.id);
        }
        for e in &mut self.elements {
            e.owner = f(EntityKind::Element, e.id);
        }
    }
}

/// Extract the local store of `rank` out of `size` ranks.
///
/// # Errors
/// - `InvalidConfig` if an owner is not a valid rank.
/// - `UnknownGhost` if a ghost request names an element not in the mesh.
/// - `DanglingReference` if a connectivity ID is unknown, or if an element
///   refers to a node on the other side.
/// - `SideCollision` if one ID is used on both sides.
pub fn distribute_interface(
    mesh: &InterfaceMesh,
    rank: usize,
    size: usize,
) -> Result<InterfaceStore, ContactError> {
    let size = size.max(1);
    if rank >= size {
        return Err(ContactError::InvalidConfig(format!(
            "rank {rank} out of range for {size} ranks"
        )));
    }
    check_owners(&mesh.nodes, size)?;
    check_owners(&mesh.elements, size)?;

    let nodes: HashMap<Gid, &Node> = mesh.nodes.iter().map(|n| (n.id, n)).collect();
    let elements: HashMap<Gid, &Element> = mesh.elements.iter().map(|e| (e.id, e)).collect();

    // 1) column elements: owned plus requested ghosts
    let mut col_elements: BTreeSet<Gid> = mesh
        .elements
        .iter()
        .filter(|e| e.owner == rank)
        .map(|e| e.id)
        .collect();
    if let Some(extra) = mesh.ghosts.get(&rank) {
        col_elements.extend(extra.iter().copied());
    }

    // 2) column nodes: owned plus the closure of the column elements
    let mut col_nodes: BTreeSet<Gid> = mesh
        .nodes
        .iter()
        .filter(|n| n.owner == rank)
        .map(|n| n.id)
        .collect();
    let mut store = InterfaceStore::new(rank, size);
    for gid in &col_elements {
        let element = elements
            .get(gid)
            .ok_or(ContactError::UnknownGhost { rank, gid: *gid })?;
        for nid in &element.node_ids {
            match nodes.get(nid) {
                Some(node) if node.side == element.side => {
                    col_nodes.insert(*nid);
                }
                _ => {
                    return Err(ContactError::DanglingReference {
                        side: element.side,
                        kind: EntityKind::Node,
                        gid: *nid,
                    });
                }
            }
        }
        store.add_element((*element).clone())?;
    }
    for nid in &col_nodes {
        if let Some(node) = nodes.get(nid) {
            store.add_node((*node).clone())?;
        }
    }

    log::debug!(
        "[rank {rank}] distributed interface: {} elements, {} nodes visible",
        col_elements.len(),
        col_nodes.len()
    );
    Ok(store)
}

fn check_owners<E: InterfaceEntity>(entities: &[E], size: usize) -> Result<(), ContactError> {
    match entities.iter().find(|e| e.owner() >= size) {
        Some(e) => Err(ContactError::InvalidConfig(format!(
            "{} {} is owned by rank {}, but there are only {size} ranks",
            E::KIND,
            e.gid(),
            e.owner()
        ))),
        None => Ok(()),
    }
}
