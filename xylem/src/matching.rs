//! Node matching between two trees.
//!
//! Runs three phases over a shared [`Matching`]:
//! 1. Hash: identical subtrees by signature, heaviest first
//! 2. Similarity: remaining nodes by Jaccard content score
//! 3. Propagation: parents and unique children through the tree topology

use facet::Facet;
use indextree::NodeId;

use crate::error::DiffError;
use crate::index::TreeIndex;
use crate::node::Tree;
use crate::options::MatchOptions;
use crate::similarity::{ContentTokenizer, Tokenizer};
use crate::tracing_macros::debug;
use crate::{hash_matcher, propagation, similarity};

/// A bidirectional, at-most-one-to-one mapping between nodes of two trees.
/// Uses Vec for O(1) lookups indexed by arena slot.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    /// Map from tree A node to tree B node (indexed by A's NodeId)
    a_to_b: Vec<Option<NodeId>>,
    /// Map from tree B node to tree A node (indexed by B's NodeId)
    b_to_a: Vec<Option<NodeId>>,
    /// All matched pairs in registration order
    pairs: Vec<(NodeId, NodeId)>,
}

impl Matching {
    /// Create a new empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new matching with preallocated capacity.
    pub fn with_capacity(max_a: usize, max_b: usize) -> Self {
        Self {
            a_to_b: vec![None; max_a],
            b_to_a: vec![None; max_b],
            pairs: Vec::new(),
        }
    }

    /// Register a pair. Returns `false` and changes nothing if either side is
    /// already matched.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> bool {
        if self.contains_a(a) || self.contains_b(b) {
            return false;
        }

        let a_idx = usize::from(a);
        let b_idx = usize::from(b);
        if a_idx >= self.a_to_b.len() {
            self.a_to_b.resize(a_idx + 1, None);
        }
        if b_idx >= self.b_to_a.len() {
            self.b_to_a.resize(b_idx + 1, None);
        }

        self.a_to_b[a_idx] = Some(b);
        self.b_to_a[b_idx] = Some(a);
        self.pairs.push((a, b));
        true
    }

    /// Check if a node from tree A is matched.
    #[inline(always)]
    pub fn contains_a(&self, a: NodeId) -> bool {
        self.get_b(a).is_some()
    }

    /// Check if a node from tree B is matched.
    #[inline(always)]
    pub fn contains_b(&self, b: NodeId) -> bool {
        self.get_a(b).is_some()
    }

    /// Get the match for a node from tree A.
    #[inline(always)]
    pub fn get_b(&self, a: NodeId) -> Option<NodeId> {
        self.a_to_b.get(usize::from(a)).copied().flatten()
    }

    /// Get the match for a node from tree B.
    #[inline(always)]
    pub fn get_a(&self, b: NodeId) -> Option<NodeId> {
        self.b_to_a.get(usize::from(b)).copied().flatten()
    }

    /// All matched pairs in the order they were registered.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if there are no matches.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Counters gathered while matching.
#[derive(Debug, Clone, PartialEq, Default, Facet)]
pub struct MatchStatistics {
    /// Nodes in tree A
    pub tree1_nodes: usize,
    /// Nodes in tree B
    pub tree2_nodes: usize,
    /// Pairs found by the hash phase
    pub hash_matches: usize,
    /// Pairs found by the similarity phase
    pub similarity_matches: usize,
    /// Pairs found by the propagation phase
    pub propagation_matches: usize,
    /// Sum of the three phases
    pub total_matches: usize,
    /// `total_matches / tree1_nodes`
    pub match_ratio_tree1: f64,
    /// `total_matches / tree2_nodes`
    pub match_ratio_tree2: f64,
}

/// Everything a phase needs to look at, borrowed for one comparison.
pub(crate) struct MatchContext<'a> {
    pub tree_a: &'a Tree,
    pub tree_b: &'a Tree,
    pub index_a: TreeIndex,
    pub index_b: TreeIndex,
    pub options: &'a MatchOptions,
}

impl<'a> MatchContext<'a> {
    pub(crate) fn new(tree_a: &'a Tree, tree_b: &'a Tree, options: &'a MatchOptions) -> Self {
        Self {
            tree_a,
            tree_b,
            index_a: TreeIndex::build(tree_a, options.attribute_order),
            index_b: TreeIndex::build(tree_b, options.attribute_order),
            options,
        }
    }
}

/// Match two trees with the default tokenizer.
///
/// Returns the matching and per-phase statistics, or a configuration error
/// when `options` do not validate.
pub fn compute_matching(
    tree_a: &Tree,
    tree_b: &Tree,
    options: &MatchOptions,
) -> Result<(Matching, MatchStatistics), DiffError> {
    compute_matching_with(tree_a, tree_b, options, &ContentTokenizer)
}

/// Like [`compute_matching`], with a custom similarity tokenizer.
pub fn compute_matching_with(
    tree_a: &Tree,
    tree_b: &Tree,
    options: &MatchOptions,
    tokenizer: &dyn Tokenizer,
) -> Result<(Matching, MatchStatistics), DiffError> {
    options.validate()?;
    let ctx = MatchContext::new(tree_a, tree_b, options);
    Ok(run_phases(&ctx, tokenizer))
}

pub(crate) fn run_phases(
    ctx: &MatchContext<'_>,
    tokenizer: &dyn Tokenizer,
) -> (Matching, MatchStatistics) {
    let options = ctx.options;
    let mut stats = MatchStatistics {
        tree1_nodes: ctx.index_a.len(),
        tree2_nodes: ctx.index_b.len(),
        ..MatchStatistics::default()
    };
    debug!(
        nodes_a = stats.tree1_nodes,
        nodes_b = stats.tree2_nodes,
        "compute_matching start"
    );

    let mut matching = Matching::with_capacity(ctx.tree_a.capacity(), ctx.tree_b.capacity());

    if options.enable_hash_matching {
        stats.hash_matches = hash_matcher::run(ctx, &mut matching);
        debug!(matched = stats.hash_matches, "after hash phase");
    }

    if options.enable_similarity_matching {
        stats.similarity_matches = similarity::run(ctx, &mut matching, tokenizer);
        debug!(matched = stats.similarity_matches, "after similarity phase");
    }

    if options.enable_propagation {
        stats.propagation_matches = propagation::run(ctx, &mut matching);
        debug!(matched = stats.propagation_matches, "after propagation phase");
    }

    stats.total_matches = stats.hash_matches + stats.similarity_matches + stats.propagation_matches;
    debug_assert_eq!(stats.total_matches, matching.len());
    stats.match_ratio_tree1 = ratio(stats.total_matches, stats.tree1_nodes);
    stats.match_ratio_tree2 = ratio(stats.total_matches, stats.tree2_nodes);

    (matching, stats)
}

fn ratio(matches: usize, nodes: usize) -> f64 {
    if nodes == 0 {
        0.0
    } else {
        matches as f64 / nodes as f64
    }
}
