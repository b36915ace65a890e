//! Interface entities, their ownership partitions, and the per-rank store.
//!
//! - [`gid`]: global entity IDs.
//! - [`entity`]: slave/master nodes and elements.
//! - [`ownership`]: row (owned) and column (visible) ID sets.
//! - [`store`]: the entity arena plus the four partitions of one rank.

pub mod entity;
pub mod gid;
pub mod ownership;
pub mod store;

pub use entity::{Element, EntityKind, Node, NodeKind, Side};
pub use gid::Gid;
pub use ownership::{Ownership, Partition, PartitionView};
pub use store::InterfaceStore;
