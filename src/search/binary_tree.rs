//! Bounding-volume tree over the master column elements.
//!
//! The tree is built top-down: a node's items are sorted by box center along
//! the longest axis of the node's box and split at the median. Leaves hold at
//! most [`LEAF_SIZE`] elements. The tree indexes one snapshot of the master
//! column set and has to be rebuilt after every ownership rotation.

use super::{Aabb, ProximitySearch, SearchResult, column_boxes, inflated_slave_boxes};
use crate::contact_error::ContactError;
use crate::topology::entity::Side;
use crate::topology::gid::Gid;
use crate::topology::store::InterfaceStore;
use itertools::Itertools;

pub const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        bbox: Aabb,
        items: Vec<(Gid, Aabb)>,
    },
    Inner {
        bbox: Aabb,
        left: usize,
        right: usize,
    },
}

impl TreeNode {
    fn bbox(&self) -> &Aabb {
        match self {
            TreeNode::Leaf { bbox, .. } | TreeNode::Inner { bbox, .. } => bbox,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryTreeSearch {
    search_param: f64,
    nodes: Vec<TreeNode>,
    root: Option<usize>,
    built: bool,
}

impl BinaryTreeSearch {
    pub fn new(search_param: f64) -> Self {
        Self {
            search_param,
            nodes: Vec::new(),
            root: None,
            built: false,
        }
    }

    /// Number of tree nodes (leaves and inner nodes).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn build(&mut self, items: Vec<(Gid, Aabb)>) -> usize {
        let mut bbox = Aabb::empty();
        for (_, b) in &items {
            bbox.merge(b);
        }
        if items.len() <= LEAF_SIZE {
            self.nodes.push(TreeNode::Leaf { bbox, items });
            return self.nodes.len() - 1;
        }
        let axis = bbox.longest_axis();
        let mut sorted: Vec<_> = items
            .into_iter()
            .sorted_by(|(ga, a), (gb, b)| {
                a.center(axis)
                    .total_cmp(&b.center(axis))
                    .then(ga.cmp(gb))
            })
            .collect();
        let upper = sorted.split_off(sorted.len() / 2);
        let left = self.build(sorted);
        let right = self.build(upper);
        self.nodes.push(TreeNode::Inner { bbox, left, right });
        self.nodes.len() - 1
    }

    fn query(&self, query_box: &Aabb, out: &mut Vec<Gid>) {
        let Some(root) = self.root else { return };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.bbox().intersects(query_box) {
                continue;
            }
            match node {
                TreeNode::Leaf { items, .. } => out.extend(
                    items
                        .iter()
                        .filter(|(_, b)| b.intersects(query_box))
                        .map(|(g, _)| *g),
                ),
                TreeNode::Inner { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
    }
}

impl ProximitySearch for BinaryTreeSearch {
    fn name(&self) -> &'static str {
        "binarytree"
    }

    fn rebuild(&mut self, store: &InterfaceStore) -> Result<(), ContactError> {
        let items = column_boxes(store, Side::Master)?;
        self.nodes.clear();
        self.root = if items.is_empty() {
            None
        } else {
            Some(self.build(items))
        };
        self.built = true;
        log::trace!(
            "[rank {}] binary search tree rebuilt with {} nodes",
            store.rank(),
            self.nodes.len()
        );
        Ok(())
    }

    fn search(&self, store: &InterfaceStore) -> Result<SearchResult, ContactError> {
        if !self.built {
            return Err(ContactError::InvalidConfig(
                "binary tree search used before the tree was built".into(),
            ));
        }
        let mut result = SearchResult::new();
        let mut hits = Vec::new();
        for (sid, sbox) in inflated_slave_boxes(store, self.search_param)? {
            hits.clear();
            self.query(&sbox, &mut hits);
            result.insert(sid, hits.iter().copied());
        }
        Ok(result)
    }
}
