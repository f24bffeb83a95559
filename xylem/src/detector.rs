//! Turns a matching into edit operations.
//!
//! Operations come out in a fixed order: updates, hierarchy and position
//! changes, merges and splits, inserts (tree-B pre-order), deletes (tree-A
//! post-order).

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::attributes::{attribute_changes, order_differs};
use crate::matching::Matching;
use crate::node::Tree;
use crate::operation::{ChangeDetail, NodeRun, Operation};
use crate::options::{AttributeOrder, MatchOptions};
use crate::text::{normalize_whitespace, values_equal};
use crate::tracing_macros::{debug, trace};

/// Wrapper for collecting operations with automatic tracing.
struct Ops {
    inner: Vec<Operation>,
}

impl Ops {
    fn new() -> Self {
        Self { inner: Vec::new() }
    }

    fn push(&mut self, op: Operation) {
        debug!(%op, "emit");
        self.inner.push(op);
    }

    fn into_inner(self) -> Vec<Operation> {
        self.inner
    }
}

/// Per-arena-slot flags.
pub(crate) struct NodeSet(Vec<bool>);

impl NodeSet {
    pub(crate) fn new(tree: &Tree) -> Self {
        Self(vec![false; tree.capacity()])
    }

    pub(crate) fn insert(&mut self, id: NodeId) {
        self.0[usize::from(id)] = true;
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.0.get(usize::from(id)).copied().unwrap_or(false)
    }
}

/// Emit the operations that turn `tree_a` into `tree_b` under `matching`.
pub fn detect_operations(
    tree_a: &Tree,
    tree_b: &Tree,
    matching: &Matching,
    options: &MatchOptions,
) -> Vec<Operation> {
    trace!(matched_pairs = matching.len(), "detect_operations start");
    let mut ops = Ops::new();

    detect_updates(tree_a, tree_b, matching, options, &mut ops);
    detect_hierarchy(tree_a, tree_b, matching, &mut ops);
    detect_reorders(tree_a, tree_b, matching, options, &mut ops);

    let mut consumed_a = NodeSet::new(tree_a);
    let mut consumed_b = NodeSet::new(tree_b);
    detect_merges(tree_a, tree_b, matching, &mut consumed_a, &mut consumed_b, &mut ops);
    detect_splits(tree_a, tree_b, matching, &mut consumed_a, &mut consumed_b, &mut ops);

    for b in tree_b.iter() {
        if !matching.contains_b(b) && !consumed_b.contains(b) {
            ops.push(Operation::Insert {
                node_b: b,
                parent_b: tree_b.parent(b),
                position: tree_b.position(b),
            });
        }
    }
    for a in tree_a.post_order() {
        if !matching.contains_a(a) && !consumed_a.contains(a) {
            ops.push(Operation::Delete {
                node_a: a,
                parent_a: tree_a.parent(a),
                position: tree_a.position(a),
            });
        }
    }

    debug!(total_ops = ops.inner.len(), "detect_operations done");
    ops.into_inner()
}

fn detect_updates(
    tree_a: &Tree,
    tree_b: &Tree,
    matching: &Matching,
    options: &MatchOptions,
    ops: &mut Ops,
) {
    for (a, b) in matching.pairs() {
        let (na, nb) = (tree_a.get(a), tree_b.get(b));
        let mut changes = Vec::new();

        if na.label != nb.label {
            changes.push(ChangeDetail::Label {
                old: na.label.clone(),
                new: nb.label.clone(),
            });
        }
        if !values_equal(na.value.as_deref(), nb.value.as_deref(), options.text_content) {
            changes.push(ChangeDetail::Value {
                old: na.value.clone(),
                new: nb.value.clone(),
            });
        }

        let (added, removed, changed) = attribute_changes(&na.attributes, &nb.attributes);
        if !(added.is_empty() && removed.is_empty() && changed.is_empty()) {
            changes.push(ChangeDetail::Attributes {
                added,
                removed,
                changed,
            });
        } else if options.attribute_order == AttributeOrder::Strict
            && order_differs(&na.attributes, &nb.attributes)
        {
            changes.push(ChangeDetail::AttributeOrder {
                old: na.attributes.keys().cloned().collect(),
                new: nb.attributes.keys().cloned().collect(),
            });
        }

        if !changes.is_empty() {
            ops.push(Operation::Update {
                node_a: a,
                node_b: b,
                changes,
            });
        }
    }
}

/// Matched pairs whose parents do not correspond.
fn detect_hierarchy(tree_a: &Tree, tree_b: &Tree, matching: &Matching, ops: &mut Ops) {
    for (a, b) in matching.pairs() {
        let parent_kept = match (tree_a.parent(a), tree_b.parent(b)) {
            (None, None) => true,
            (Some(pa), Some(pb)) => matching.get_b(pa) == Some(pb),
            _ => false,
        };
        if parent_kept {
            continue;
        }

        let (from_depth, to_depth) = (tree_a.depth(a), tree_b.depth(b));
        trace!(
            a = usize::from(a),
            b = usize::from(b),
            from_depth,
            to_depth,
            "hierarchy: parent changed"
        );
        let op = if to_depth < from_depth {
            Operation::Upgrade {
                node_a: a,
                node_b: b,
                from_depth,
                to_depth,
            }
        } else if to_depth > from_depth {
            Operation::Downgrade {
                node_a: a,
                node_b: b,
                from_depth,
                to_depth,
            }
        } else {
            Operation::Move {
                node_a: a,
                node_b: b,
                from_position: tree_a.position(a),
                to_position: tree_b.position(b),
            }
        };
        ops.push(op);
    }
}

/// Siblings that stayed under the same parent but changed relative order.
///
/// Positions are compared among the children kept on both sides, so inserts
/// and deletes around a node do not make it move. The longest run of kept
/// children already in order stays put; every other kept child is a move.
fn detect_reorders(
    tree_a: &Tree,
    tree_b: &Tree,
    matching: &Matching,
    options: &MatchOptions,
    ops: &mut Ops,
) {
    for pa in tree_a.iter() {
        let Some(pb) = matching.get_b(pa) else {
            continue;
        };
        if options.attribute_order == AttributeOrder::Ignore
            && tree_a.get(pa).kind.is_keyed()
            && tree_b.get(pb).kind.is_keyed()
        {
            continue;
        }

        let kept: Vec<(NodeId, NodeId)> = tree_a
            .children(pa)
            .filter_map(|ca| matching.get_b(ca).map(|cb| (ca, cb)))
            .filter(|&(_, cb)| tree_b.parent(cb) == Some(pb))
            .collect();
        if kept.len() < 2 {
            continue;
        }

        let positions_b: Vec<usize> = kept.iter().map(|&(_, cb)| tree_b.position(cb)).collect();
        let stable = longest_increasing(&positions_b);
        for (i, &(ca, cb)) in kept.iter().enumerate() {
            if !stable[i] {
                ops.push(Operation::Move {
                    node_a: ca,
                    node_b: cb,
                    from_position: tree_a.position(ca),
                    to_position: positions_b[i],
                });
            }
        }
    }
}

/// Flags the members of one longest strictly increasing subsequence.
fn longest_increasing(values: &[usize]) -> Vec<bool> {
    // tails[k]: index of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &v) in values.iter().enumerate() {
        let k = tails.partition_point(|&t| values[t] < v);
        if k > 0 {
            prev[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut keep = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = prev[i];
    }
    keep
}

/// Maximal runs of consecutive unmatched siblings sharing a label.
fn unmatched_runs(tree: &Tree, is_free: impl Fn(NodeId) -> bool) -> Vec<Vec<NodeId>> {
    let mut runs = Vec::new();
    for parent in tree.iter() {
        let mut current: Vec<NodeId> = Vec::new();
        for child in tree.children(parent) {
            let continues = is_free(child)
                && current
                    .last()
                    .is_some_and(|&last| tree.get(last).label == tree.get(child).label);
            if continues {
                current.push(child);
                continue;
            }
            if current.len() >= 2 {
                runs.push(core::mem::take(&mut current));
            }
            current.clear();
            if is_free(child) {
                current.push(child);
            }
        }
        if current.len() >= 2 {
            runs.push(current);
        }
    }
    runs
}

fn joined_text(tree: &Tree, nodes: &[NodeId]) -> String {
    let parts: Vec<String> = nodes.iter().map(|&id| tree.text_content(id)).collect();
    normalize_whitespace(&parts.join(" "))
}

/// Candidate single nodes keyed by `(label, text_content)`, in pre-order.
fn single_candidates(
    tree: &Tree,
    is_free: impl Fn(NodeId) -> bool,
) -> HashMap<(String, String), Vec<NodeId>> {
    let mut candidates: HashMap<(String, String), Vec<NodeId>> = HashMap::default();
    for id in tree.iter() {
        if !is_free(id) {
            continue;
        }
        let text = tree.text_content(id);
        if text.is_empty() {
            continue;
        }
        candidates
            .entry((tree.get(id).label.clone(), text))
            .or_default()
            .push(id);
    }
    candidates
}

/// Within a run, find the longest sub-run (at least two nodes) starting at
/// each position whose joined text names a free single node.
fn match_runs(
    tree_runs: &Tree,
    runs: Vec<Vec<NodeId>>,
    mut take_single: impl FnMut(&str, &str) -> Option<NodeId>,
    mut commit: impl FnMut(NodeRun, NodeId),
) {
    for run in runs {
        let mut start = 0;
        while start + 1 < run.len() {
            let label = tree_runs.get(run[start]).label.as_str();
            let found = (start + 2..=run.len()).rev().find_map(|end| {
                let text = joined_text(tree_runs, &run[start..end]);
                if text.is_empty() {
                    return None;
                }
                take_single(label, &text).map(|single| (end, single))
            });
            match found {
                Some((end, single)) => {
                    commit(run[start..end].iter().copied().collect(), single);
                    start = end;
                }
                None => start += 1,
            }
        }
    }
}

fn detect_merges(
    tree_a: &Tree,
    tree_b: &Tree,
    matching: &Matching,
    consumed_a: &mut NodeSet,
    consumed_b: &mut NodeSet,
    ops: &mut Ops,
) {
    let runs = unmatched_runs(tree_a, |a| !matching.contains_a(a));
    if runs.is_empty() {
        return;
    }
    let mut targets = single_candidates(tree_b, |b| !matching.contains_b(b));

    let mut merges = Vec::new();
    match_runs(
        tree_a,
        runs,
        |label, text| {
            let slot = targets.get_mut(&(label.to_string(), text.to_string()))?;
            (!slot.is_empty()).then(|| slot.remove(0))
        },
        |sources, target| merges.push((sources, target)),
    );

    for (sources_a, target_b) in merges {
        for &a in &sources_a {
            consumed_a.insert(a);
        }
        consumed_b.insert(target_b);
        ops.push(Operation::Merge {
            sources_a,
            target_b,
        });
    }
}

fn detect_splits(
    tree_a: &Tree,
    tree_b: &Tree,
    matching: &Matching,
    consumed_a: &mut NodeSet,
    consumed_b: &mut NodeSet,
    ops: &mut Ops,
) {
    let runs = unmatched_runs(tree_b, |b| !matching.contains_b(b) && !consumed_b.contains(b));
    if runs.is_empty() {
        return;
    }
    let mut sources = single_candidates(tree_a, |a| {
        !matching.contains_a(a) && !consumed_a.contains(a)
    });

    let mut splits = Vec::new();
    match_runs(
        tree_b,
        runs,
        |label, text| {
            let slot = sources.get_mut(&(label.to_string(), text.to_string()))?;
            (!slot.is_empty()).then(|| slot.remove(0))
        },
        |targets, source| splits.push((source, targets)),
    );

    for (source_a, targets_b) in splits {
        consumed_a.insert(source_a);
        for &b in &targets_b {
            consumed_b.insert(b);
        }
        ops.push(Operation::Split {
            source_a,
            targets_b,
        });
    }
}
