//! Phase 3: structural propagation.
//!
//! Extends the matching through the tree topology without further content
//! comparison:
//! - bottom-up, parents of matched pairs whose labels agree
//! - top-down, children whose label is unique among the unmatched children
//!   of an already matched pair
//!
//! Each propagated pair records its distance (level) from the nearest pair
//! found by content. A step is allowed while that level stays within the
//! candidate's depth budget `1 + floor(weight / W0)`, so light nodes only
//! propagate one step and heavy containers may carry a match further.

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::attributes::attribute_similarity;
use crate::matching::{MatchContext, Matching};
use crate::tracing_macros::{debug, trace};

/// Minimum attribute similarity for a bottom-up parent match.
pub const PARENT_ATTRIBUTE_SIMILARITY: f64 = 0.5;

/// Propagation distance of tree-A nodes matched in this phase; absent means 0.
type Levels = HashMap<NodeId, usize>;

/// Run the propagation phase. Returns the number of pairs it added.
pub(crate) fn run(ctx: &MatchContext<'_>, matching: &mut Matching) -> usize {
    let before = matching.len();
    let mut levels = Levels::default();

    anchor_roots(ctx, matching);
    bottom_up(ctx, matching, &mut levels);
    top_down(ctx, matching, &mut levels);

    let added = matching.len() - before;
    debug!(added, "propagation phase done");
    added
}

fn level_of(levels: &Levels, a: NodeId) -> usize {
    levels.get(&a).copied().unwrap_or(0)
}

fn within_budget(ctx: &MatchContext<'_>, candidate_a: NodeId, level: usize) -> bool {
    let budget = ctx
        .index_a
        .weight(candidate_a)
        .depth_budget(ctx.options.propagation_base_weight);
    level <= budget
}

/// Two unmatched roots with the same kind and label belong together.
fn anchor_roots(ctx: &MatchContext<'_>, matching: &mut Matching) {
    let (ra, rb) = (ctx.tree_a.root, ctx.tree_b.root);
    if matching.contains_a(ra) || matching.contains_b(rb) {
        return;
    }
    let (na, nb) = (ctx.tree_a.get(ra), ctx.tree_b.get(rb));
    if na.kind == nb.kind && na.label == nb.label {
        trace!("propagation: root anchor");
        matching.add(ra, rb);
    }
}

/// Children before parents: post-order of tree A.
fn bottom_up(ctx: &MatchContext<'_>, matching: &mut Matching, levels: &mut Levels) {
    let (tree_a, tree_b) = (ctx.tree_a, ctx.tree_b);

    for a in tree_a.post_order() {
        let Some(b) = matching.get_b(a) else {
            continue;
        };
        let (Some(pa), Some(pb)) = (tree_a.parent(a), tree_b.parent(b)) else {
            continue;
        };
        if matching.contains_a(pa) || matching.contains_b(pb) {
            continue;
        }

        let (na, nb) = (tree_a.get(pa), tree_b.get(pb));
        if na.kind != nb.kind || na.label != nb.label {
            continue;
        }
        if attribute_similarity(&na.attributes, &nb.attributes) < PARENT_ATTRIBUTE_SIMILARITY {
            continue;
        }
        let children_agree = tree_a
            .children(pa)
            .filter_map(|child| matching.get_b(child))
            .all(|partner| tree_b.parent(partner) == Some(pb));
        if !children_agree {
            continue;
        }

        let level = level_of(levels, a) + 1;
        if !within_budget(ctx, pa, level) {
            trace!(a = usize::from(pa), level, "propagation: bottom-up over budget");
            continue;
        }

        trace!(
            a = usize::from(pa),
            b = usize::from(pb),
            level,
            "propagation: bottom-up match"
        );
        matching.add(pa, pb);
        levels.insert(pa, level);
    }
}

/// Parents before children: pre-order of tree A.
fn top_down(ctx: &MatchContext<'_>, matching: &mut Matching, levels: &mut Levels) {
    let (tree_a, tree_b) = (ctx.tree_a, ctx.tree_b);

    for &a in ctx.index_a.preorder() {
        let Some(b) = matching.get_b(a) else {
            continue;
        };

        let unmatched_a: Vec<NodeId> = tree_a
            .children(a)
            .filter(|&c| !matching.contains_a(c))
            .collect();
        if unmatched_a.is_empty() {
            continue;
        }
        let unmatched_b: Vec<NodeId> = tree_b
            .children(b)
            .filter(|&c| !matching.contains_b(c))
            .collect();

        let mut count_a: HashMap<&str, usize> = HashMap::default();
        for &c in &unmatched_a {
            *count_a.entry(tree_a.get(c).label.as_str()).or_default() += 1;
        }
        let mut by_label_b: HashMap<&str, Vec<NodeId>> = HashMap::default();
        for &c in &unmatched_b {
            by_label_b
                .entry(tree_b.get(c).label.as_str())
                .or_default()
                .push(c);
        }

        for &ca in &unmatched_a {
            let label = tree_a.get(ca).label.as_str();
            if count_a.get(label) != Some(&1) {
                continue;
            }
            let Some([cb]) = by_label_b.get(label).map(Vec::as_slice) else {
                continue;
            };
            if tree_a.get(ca).kind != tree_b.get(*cb).kind {
                continue;
            }

            let level = level_of(levels, a) + 1;
            if !within_budget(ctx, ca, level) {
                trace!(a = usize::from(ca), level, "propagation: top-down over budget");
                continue;
            }

            trace!(
                a = usize::from(ca),
                b = usize::from(*cb),
                level,
                "propagation: top-down match"
            );
            matching.add(ca, *cb);
            levels.insert(ca, level);
        }
    }
}
