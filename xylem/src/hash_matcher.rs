//! Phase 1: exact subtree matching.
//!
//! Tree-B nodes are visited heaviest first so large identical regions claim
//! their counterpart before small, ambiguous subtrees compete for the same
//! signature bucket.

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::equality::{nodes_equal, pair_children, subtrees_equal};
use crate::matching::{MatchContext, Matching};
use crate::signature::NodeSignature;
use crate::tracing_macros::{debug, trace};

/// Run the hash phase. Returns the number of pairs it added.
pub(crate) fn run(ctx: &MatchContext<'_>, matching: &mut Matching) -> usize {
    let before = matching.len();
    let options = ctx.options;

    // Candidates per bucket in tree-A pre-order: ties go to the earliest node.
    let mut by_signature: HashMap<NodeSignature, Vec<NodeId>> = HashMap::default();
    for &a in ctx.index_a.preorder() {
        by_signature
            .entry(ctx.index_a.signature(a))
            .or_default()
            .push(a);
    }

    let mut order_b = ctx.index_b.preorder().to_vec();
    order_b.sort_by(|x, y| {
        ctx.index_b
            .weight(*y)
            .0
            .total_cmp(&ctx.index_b.weight(*x).0)
    });

    for b in order_b {
        if matching.contains_b(b) {
            continue;
        }
        let Some(candidates) = by_signature.get(&ctx.index_b.signature(b)) else {
            continue;
        };

        let found = candidates.iter().copied().find(|&a| {
            !matching.contains_a(a)
                && subtrees_equal(
                    ctx.tree_a,
                    a,
                    ctx.tree_b,
                    b,
                    options.attribute_order,
                    options.text_content,
                )
        });

        if let Some(a) = found {
            trace!(
                a = usize::from(a),
                b = usize::from(b),
                weight = ctx.index_b.weight(b).0,
                "hash: subtree match"
            );
            match_subtrees(ctx, a, b, matching);
            match_ancestors(ctx, a, b, matching);
        }
    }

    let added = matching.len() - before;
    debug!(added, "hash phase done");
    added
}

/// Match two identical subtrees node by node.
fn match_subtrees(ctx: &MatchContext<'_>, a: NodeId, b: NodeId, matching: &mut Matching) {
    let order = ctx.options.attribute_order;
    let mut stack = vec![(a, b)];
    while let Some((a, b)) = stack.pop() {
        // A descendant may already be taken by an earlier, heavier match.
        if !matching.add(a, b) {
            continue;
        }
        stack.extend(pair_children(ctx.tree_a, a, ctx.tree_b, b, order));
    }
}

/// Climb from a fresh match while both parents are unmatched, share a
/// signature and are equal as nodes.
fn match_ancestors(ctx: &MatchContext<'_>, mut a: NodeId, mut b: NodeId, matching: &mut Matching) {
    let options = ctx.options;
    while let (Some(pa), Some(pb)) = (ctx.tree_a.parent(a), ctx.tree_b.parent(b)) {
        if matching.contains_a(pa) || matching.contains_b(pb) {
            break;
        }
        if ctx.index_a.signature(pa) != ctx.index_b.signature(pb) {
            break;
        }
        if !nodes_equal(
            ctx.tree_a.get(pa),
            ctx.tree_b.get(pb),
            options.attribute_order,
            options.text_content,
        ) {
            break;
        }
        trace!(a = usize::from(pa), b = usize::from(pb), "hash: ancestor match");
        matching.add(pa, pb);
        a = pa;
        b = pb;
    }
}

#[cfg(test)]
mod tests {
    use crate::matching::{MatchContext, Matching};
    use crate::node::{Tree, TreeNode};
    use crate::options::MatchOptions;
    use facet_testhelpers::test;

    fn hash_only(a: &Tree, b: &Tree, options: &MatchOptions) -> Matching {
        let ctx = MatchContext::new(a, b, options);
        let mut matching = Matching::new();
        super::run(&ctx, &mut matching);
        matching
    }

    #[test]
    fn test_identical_subtree_matched_as_a_whole() {
        let mut a = Tree::new(TreeNode::element("root"));
        let sec_a = a.add_child(a.root, TreeNode::element("section"));
        let p_a = a.add_child(sec_a, TreeNode::element("p"));
        a.add_child(p_a, TreeNode::text("same"));
        a.add_child(a.root, TreeNode::element("old"));

        let mut b = Tree::new(TreeNode::element("root"));
        b.add_child(b.root, TreeNode::element("new"));
        let sec_b = b.add_child(b.root, TreeNode::element("section"));
        let p_b = b.add_child(sec_b, TreeNode::element("p"));
        b.add_child(p_b, TreeNode::text("same"));

        let matching = hash_only(&a, &b, &MatchOptions::default());

        assert_eq!(matching.get_b(sec_a), Some(sec_b));
        assert_eq!(matching.get_b(p_a), Some(p_b));
        assert!(!matching.contains_a(a.root), "roots differ in shape");
        assert_eq!(matching.len(), 3);
    }

    #[test]
    fn test_same_signature_different_value_not_matched() {
        let mut a = Tree::new(TreeNode::element("root"));
        let ca = a.add_child(a.root, TreeNode::element("child").with_value("old value"));
        let mut b = Tree::new(TreeNode::element("root"));
        b.add_child(b.root, TreeNode::element("child").with_value("new value"));

        let matching = hash_only(&a, &b, &MatchOptions::default());
        assert!(!matching.contains_a(ca));
        assert!(matching.is_empty());
    }

    #[test]
    fn test_ties_resolve_in_document_order() {
        let mut a = Tree::new(TreeNode::element("root"));
        let a_items: Vec<_> = (0..3)
            .map(|_| a.add_child(a.root, TreeNode::element("item").with_value("x")))
            .collect();
        let mut b = Tree::new(TreeNode::element("list"));
        let b_items: Vec<_> = (0..3)
            .map(|_| b.add_child(b.root, TreeNode::element("item").with_value("x")))
            .collect();

        let matching = hash_only(&a, &b, &MatchOptions::default());
        for (ia, ib) in a_items.iter().zip(&b_items) {
            assert_eq!(matching.get_b(*ia), Some(*ib));
        }
    }

    #[test]
    fn test_ancestor_propagation_stops_at_unequal_parent() {
        // Parents share the shape but carry different values.
        let mut a = Tree::new(TreeNode::element("root"));
        let wrap_a = a.add_child(a.root, TreeNode::element("wrap").with_value("a"));
        let leaf_a = a.add_child(wrap_a, TreeNode::element("leaf").with_value("same"));
        let mut b = Tree::new(TreeNode::element("root"));
        let wrap_b = b.add_child(b.root, TreeNode::element("wrap").with_value("b"));
        let leaf_b = b.add_child(wrap_b, TreeNode::element("leaf").with_value("same"));

        let matching = hash_only(&a, &b, &MatchOptions::default());
        assert_eq!(matching.get_b(leaf_a), Some(leaf_b));
        assert!(!matching.contains_a(wrap_a));
    }

    #[test]
    fn test_ancestor_propagation_climbs_equal_parents() {
        // The roots have identical shape and data; only a deep leaf differs.
        let mut a = Tree::new(TreeNode::element("root"));
        let wrap_a = a.add_child(a.root, TreeNode::element("wrap"));
        let keep_a = a.add_child(wrap_a, TreeNode::element("keep").with_value("k"));
        a.add_child(wrap_a, TreeNode::element("edit").with_value("old"));
        let mut b = Tree::new(TreeNode::element("root"));
        let wrap_b = b.add_child(b.root, TreeNode::element("wrap"));
        let keep_b = b.add_child(wrap_b, TreeNode::element("keep").with_value("k"));
        b.add_child(wrap_b, TreeNode::element("edit").with_value("new"));

        let matching = hash_only(&a, &b, &MatchOptions::default());
        assert_eq!(matching.get_b(keep_a), Some(keep_b));
        assert_eq!(matching.get_b(wrap_a), Some(wrap_b));
        assert_eq!(matching.get_b(a.root), Some(b.root));
    }
}
