//! Interface entities: nodes and elements on either side of the contact interface.
//!
//! Nodes come in two kinds. A plain node carries only its reference geometry;
//! a friction node additionally carries its frictional state, which must
//! travel with the node when its ownership moves. The kind is a tagged variant
//! so that (de)serialization dispatches on the tag.

use crate::topology::gid::Gid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two independently partitioned surfaces an entity belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Slave,
    Master,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Slave => f.write_str("slave"),
            Side::Master => f.write_str("master"),
        }
    }
}

/// The two entity collections kept per side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum EntityKind {
    Element = 1,
    Node = 2,
}

impl EntityKind {
    /// Wire discriminator used in ring batch headers.
    pub fn to_wire(self) -> u16 {
        self as u16
    }

    pub fn from_wire(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(EntityKind::Element),
            2 => Some(EntityKind::Node),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Element => f.write_str("element"),
            EntityKind::Node => f.write_str("node"),
        }
    }
}

/// Per-node frictional history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionState {
    /// Accumulated tangential slip increment.
    pub jump: [f64; 3],
    /// Tangential traction from the last converged step.
    pub traction: [f64; 3],
    pub slip: bool,
    pub active: bool,
}

/// Node kind discriminator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Plain,
    Friction(FrictionState),
}

impl NodeKind {
    pub fn is_friction(&self) -> bool {
        matches!(self, NodeKind::Friction(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Gid,
    pub owner: usize,
    pub side: Side,
    /// Reference coordinates.
    pub coords: [f64; 3],
    pub kind: NodeKind,
}

impl Node {
    pub fn plain(id: impl Into<Gid>, owner: usize, side: Side, coords: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            owner,
            side,
            coords,
            kind: NodeKind::Plain,
        }
    }

    pub fn friction(
        id: impl Into<Gid>,
        owner: usize,
        side: Side,
        coords: [f64; 3],
        state: FrictionState,
    ) -> Self {
        Self {
            id: id.into(),
            owner,
            side,
            coords,
            kind: NodeKind::Friction(state),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: Gid,
    pub owner: usize,
    pub side: Side,
    /// Connectivity: global IDs of the element's nodes, in local order.
    pub node_ids: Vec<Gid>,
}

impl Element {
    pub fn new<I, G>(id: impl Into<Gid>, owner: usize, side: Side, node_ids: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<Gid>,
    {
        Self {
            id: id.into(),
            owner,
            side,
            node_ids: node_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Common surface of [`Node`] and [`Element`] used by the ring exchange.
pub trait InterfaceEntity: Clone + Serialize + for<'de> Deserialize<'de> {
    const KIND: EntityKind;

    fn gid(&self) -> Gid;
    fn owner(&self) -> usize;
    fn set_owner(&mut self, rank: usize);
    fn side(&self) -> Side;
}

impl InterfaceEntity for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn gid(&self) -> Gid {
        self.id
    }
    fn owner(&self) -> usize {
        self.owner
    }
    fn set_owner(&mut self, rank: usize) {
        self.owner = rank;
    }
    fn side(&self) -> Side {
        self.side
    }
}

impl InterfaceEntity for Element {
    const KIND: EntityKind = EntityKind::Element;

    fn gid(&self) -> Gid {
        self.id
    }
    fn owner(&self) -> usize {
        self.owner
    }
    fn set_owner(&mut self, rank: usize) {
        self.owner = rank;
    }
    fn side(&self) -> Side {
        self.side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_roundtrip() {
        for kind in [EntityKind::Element, EntityKind::Node] {
            assert_eq!(EntityKind::from_wire(kind.to_wire()), Some(kind));
        }
        assert_eq!(EntityKind::from_wire(0), None);
        assert_eq!(EntityKind::from_wire(7), None);
    }

    #[test]
    fn element_new_converts_ids() {
        let e = Element::new(10u64, 1, Side::Master, [1u64, 2, 3]);
        assert_eq!(e.gid(), Gid::new(10));
        assert_eq!(e.node_ids, vec![Gid::new(1), Gid::new(2), Gid::new(3)]);
    }

    #[test]
    fn friction_discriminator() {
        let n = Node::friction(4u64, 0, Side::Slave, [0.0; 3], FrictionState::default());
        assert!(n.kind.is_friction());
        assert!(!Node::plain(5u64, 0, Side::Slave, [0.0; 3]).kind.is_friction());
    }
}
