//! Per-comparison lookup tables.

use indextree::NodeId;

use crate::node::Tree;
use crate::options::AttributeOrder;
use crate::signature::NodeSignature;
use crate::weight::NodeWeight;

/// Signature, weight, depth, sibling position and pre-order rank for every
/// node of one tree, indexed by arena slot.
///
/// Built once per comparison since signatures depend on the attribute order
/// policy.
#[derive(Debug)]
pub struct TreeIndex {
    signatures: Vec<NodeSignature>,
    weights: Vec<NodeWeight>,
    depths: Vec<usize>,
    positions: Vec<usize>,
    ranks: Vec<usize>,
    preorder: Vec<NodeId>,
}

#[inline(always)]
fn slot(id: NodeId) -> usize {
    usize::from(id)
}

impl TreeIndex {
    /// Index every node reachable from the root.
    pub fn build(tree: &Tree, order: AttributeOrder) -> Self {
        let cap = tree.capacity();
        let mut signatures = vec![NodeSignature::default(); cap];
        let mut weights = vec![NodeWeight::default(); cap];
        let mut depths = vec![0; cap];
        let mut positions = vec![0; cap];
        let mut ranks = vec![0; cap];

        for id in tree.post_order() {
            let child_ids: Vec<NodeId> = tree.children(id).collect();
            let signature = NodeSignature::combine(
                tree.get(id),
                child_ids.iter().map(|&c| signatures[slot(c)]),
                order,
            );
            let weight = NodeWeight::from_children(child_ids.iter().map(|&c| weights[slot(c)]));
            signatures[slot(id)] = signature;
            weights[slot(id)] = weight;
        }

        let preorder: Vec<NodeId> = tree.iter().collect();
        for (rank, &id) in preorder.iter().enumerate() {
            ranks[slot(id)] = rank;
            if let Some(parent) = tree.parent(id) {
                depths[slot(id)] = depths[slot(parent)] + 1;
            }
            for (pos, child) in tree.children(id).enumerate() {
                positions[slot(child)] = pos;
            }
        }

        Self {
            signatures,
            weights,
            depths,
            positions,
            ranks,
            preorder,
        }
    }

    /// Signature of the subtree at `id`.
    #[inline]
    pub fn signature(&self, id: NodeId) -> NodeSignature {
        self.signatures[slot(id)]
    }

    /// Weight of the subtree at `id`.
    #[inline]
    pub fn weight(&self, id: NodeId) -> NodeWeight {
        self.weights[slot(id)]
    }

    /// Distance from the root.
    #[inline]
    pub fn depth(&self, id: NodeId) -> usize {
        self.depths[slot(id)]
    }

    /// Position among siblings.
    #[inline]
    pub fn position(&self, id: NodeId) -> usize {
        self.positions[slot(id)]
    }

    /// Pre-order rank, used to break ties deterministically.
    #[inline]
    pub fn rank(&self, id: NodeId) -> usize {
        self.ranks[slot(id)]
    }

    /// Nodes in document order.
    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.preorder.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.preorder.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TreeNode;

    #[test]
    fn test_index_matches_tree_queries() {
        let mut tree = Tree::new(TreeNode::element("root"));
        let a = tree.add_child(tree.root, TreeNode::element("a"));
        let a1 = tree.add_child(a, TreeNode::text("x"));
        let b = tree.add_child(tree.root, TreeNode::element("b"));

        let index = TreeIndex::build(&tree, AttributeOrder::Strict);

        assert_eq!(index.len(), 4);
        assert_eq!(index.weight(tree.root), NodeWeight(4.0));
        assert_eq!(index.weight(a), NodeWeight(2.0));
        assert_eq!(index.weight(b), NodeWeight::LEAF);
        assert_eq!(index.depth(a1), 2);
        assert_eq!(index.position(b), 1);
        assert_eq!(index.rank(b), 3);
        assert_eq!(index.preorder(), &[tree.root, a, a1, b]);
        for id in tree.iter() {
            assert_eq!(
                index.signature(id),
                NodeSignature::of(&tree, id, AttributeOrder::Strict)
            );
            assert_eq!(index.depth(id), tree.depth(id));
            assert_eq!(index.position(id), tree.position(id));
        }
    }
}
