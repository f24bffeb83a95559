//! Structural fingerprints.
//!
//! A signature hashes the node kind, label, attributes and the children's
//! signatures (Merkle style). Values are left out, so a signature is a shape
//! bucket: equal signatures only make two subtrees *candidates* for equality.

use core::fmt;
use core::hash::{Hash, Hasher};

use indextree::NodeId;
use rapidhash::RapidHasher;

use crate::node::{Tree, TreeNode};
use crate::options::AttributeOrder;

/// Structural fingerprint of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeSignature(pub u64);

impl fmt::Display for NodeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl NodeSignature {
    /// Combine a node's own data with its children's signatures.
    ///
    /// Under `AttributeOrder::Ignore` attributes are hashed sorted by key, and
    /// the children of keyed containers are hashed as a sorted set.
    pub fn combine(
        node: &TreeNode,
        children: impl IntoIterator<Item = NodeSignature>,
        order: AttributeOrder,
    ) -> Self {
        let mut hasher = RapidHasher::default();
        node.kind.hash(&mut hasher);
        node.label.hash(&mut hasher);

        match order {
            AttributeOrder::Strict => {
                for (k, v) in &node.attributes {
                    k.hash(&mut hasher);
                    v.hash(&mut hasher);
                }
            }
            AttributeOrder::Ignore => {
                let mut sorted: Vec<_> = node.attributes.iter().collect();
                sorted.sort_unstable();
                for (k, v) in sorted {
                    k.hash(&mut hasher);
                    v.hash(&mut hasher);
                }
            }
        }

        let mut children: Vec<NodeSignature> = children.into_iter().collect();
        if order == AttributeOrder::Ignore && node.kind.is_keyed() {
            children.sort_unstable();
        }
        children.len().hash(&mut hasher);
        for child in children {
            child.0.hash(&mut hasher);
        }

        NodeSignature(hasher.finish())
    }

    /// Signature of the subtree rooted at `id`, computed recursively.
    ///
    /// Comparisons use the precomputed table in [`TreeIndex`](crate::index::TreeIndex);
    /// this is the standalone form.
    pub fn of(tree: &Tree, id: NodeId, order: AttributeOrder) -> Self {
        let children: Vec<_> = tree
            .children(id)
            .map(|child| NodeSignature::of(tree, child, order))
            .collect();
        NodeSignature::combine(tree.get(id), children, order)
    }
}
