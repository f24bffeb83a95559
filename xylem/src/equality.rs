//! Full node and subtree equality, used to confirm signature candidates.

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::attributes::attributes_equivalent;
use crate::node::{Tree, TreeNode};
use crate::options::{AttributeOrder, TextContent};
use crate::text::values_equal;

/// Kind, label, value and attributes agree. Children are not looked at.
pub(crate) fn nodes_equal(
    a: &TreeNode,
    b: &TreeNode,
    order: AttributeOrder,
    text: TextContent,
) -> bool {
    a.kind == b.kind
        && a.label == b.label
        && values_equal(a.value.as_deref(), b.value.as_deref(), text)
        && attributes_equivalent(&a.attributes, &b.attributes, order)
}

/// Pair up the children of `a` and `b` for a lockstep walk.
///
/// Children pair by position, except for keyed containers under
/// `AttributeOrder::Ignore`, which pair by label (first unused occurrence).
/// Children left over on either side are not returned.
pub(crate) fn pair_children(
    tree_a: &Tree,
    a: NodeId,
    tree_b: &Tree,
    b: NodeId,
    order: AttributeOrder,
) -> Vec<(NodeId, NodeId)> {
    let keyed = order == AttributeOrder::Ignore
        && tree_a.get(a).kind.is_keyed()
        && tree_b.get(b).kind.is_keyed();

    if !keyed {
        return tree_a.children(a).zip(tree_b.children(b)).collect();
    }

    let mut by_label: HashMap<&str, Vec<NodeId>> = HashMap::default();
    for child in tree_b.children(b).collect::<Vec<_>>().into_iter().rev() {
        by_label
            .entry(tree_b.get(child).label.as_str())
            .or_default()
            .push(child);
    }
    tree_a
        .children(a)
        .filter_map(|child| {
            by_label
                .get_mut(tree_a.get(child).label.as_str())
                .and_then(|stack| stack.pop())
                .map(|partner| (child, partner))
        })
        .collect()
}

/// Recursive equality of two subtrees.
pub(crate) fn subtrees_equal(
    tree_a: &Tree,
    a: NodeId,
    tree_b: &Tree,
    b: NodeId,
    order: AttributeOrder,
    text: TextContent,
) -> bool {
    if !nodes_equal(tree_a.get(a), tree_b.get(b), order, text) {
        return false;
    }
    let count = tree_a.child_count(a);
    if count != tree_b.child_count(b) {
        return false;
    }
    let pairs = pair_children(tree_a, a, tree_b, b, order);
    pairs.len() == count
        && pairs
            .into_iter()
            .all(|(ca, cb)| subtrees_equal(tree_a, ca, tree_b, cb, order, text))
}
