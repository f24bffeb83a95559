//! # Xylem
//!
//! Semantic diffing of document trees with XyDiff-style matching.
//!
//! Named after the tissue that carries water up through a tree.
//!
//! ## Algorithm Overview
//!
//! Two documents (from XML, HTML, JSON or YAML adapters) are compared as
//! [`Tree`]s of [`TreeNode`]s. Matching runs in three phases:
//!
//! 1. **Hash matching**: identical subtrees by signature, heaviest first
//! 2. **Similarity matching**: leftover nodes by Jaccard score over content tokens
//! 3. **Propagation**: parents and uniquely labeled children through the topology
//!
//! The resulting [`Matching`] is turned into [`Operation`]s (insert, delete,
//! update, move, merge, split, upgrade, downgrade), which a [`DiffConverter`]
//! classifies by [`Dimension`] as normative or informative.
//!
//! ## Usage
//!
//! ```rust
//! use xylem::{MatchOptions, OperationType, Tree, TreeNode, diff_trees};
//!
//! let mut old = Tree::new(TreeNode::element("root"));
//! old.add_child(old.root, TreeNode::element("child").with_value("hello"));
//!
//! let mut new = old.clone();
//! new.add_child(new.root, TreeNode::element("child").with_value("world"));
//!
//! let result = diff_trees(&old, &new, &MatchOptions::default()).unwrap();
//! assert_eq!(result.operations.len(), 1);
//! assert_eq!(result.operations[0].kind(), OperationType::Insert);
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;

/// Native document conversion traits
pub mod adapter;
mod attributes;
/// Operation detection
pub mod detector;
/// Dimension classification of operations
pub mod difference;
mod equality;
mod error;
mod hash_matcher;
/// Precomputed per-node tables
pub mod index;
/// Matching primitives and the phase orchestrator
pub mod matching;
/// Tree representation
pub mod node;
/// Edit operation model
pub mod operation;
mod options;
mod propagation;
/// Signature fingerprints
pub mod signature;
/// Content similarity scoring
pub mod similarity;
mod text;
/// Subtree weights
pub mod weight;

use facet::Facet;
use rayon::prelude::*;

use crate::tracing_macros::debug;

pub use adapter::{FromTree, ToTree};
pub use attributes::{attribute_similarity, attributes_equivalent, order_differs};
pub use detector::detect_operations;
pub use difference::{
    Behavior, ConverterOptions, DiffConverter, Difference, Dimension, DimensionBehaviors,
};
pub use error::DiffError;
pub use matching::{MatchStatistics, Matching, compute_matching, compute_matching_with};
pub use node::{Attributes, NodeKind, ScalarType, SourceRef, Tree, TreeNode};
pub use operation::{ChangeDetail, NodeRun, Operation, OperationType};
pub use options::{AttributeOrder, MatchOptions, TextContent};
pub use similarity::{ContentTokenizer, TokenBag, Tokenizer};
pub use text::normalize_whitespace;

/// Operations and matching statistics of one comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    /// Edit operations in detection order
    pub operations: Vec<Operation>,
    /// Counters from the matching phases
    pub statistics: MatchStatistics,
}

/// Counts of a [`DiffResult`]'s operations per type, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Facet)]
pub struct OperationCounts {
    /// Insert operations
    pub insert: usize,
    /// Delete operations
    pub delete: usize,
    /// Update operations
    pub update: usize,
    /// Move operations
    pub moves: usize,
    /// Merge operations
    pub merge: usize,
    /// Split operations
    pub split: usize,
    /// Upgrade operations
    pub upgrade: usize,
    /// Downgrade operations
    pub downgrade: usize,
}

impl DiffResult {
    /// Whether the two trees compared equal.
    pub fn is_identical(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations per type.
    pub fn counts(&self) -> OperationCounts {
        let mut counts = OperationCounts::default();
        for op in &self.operations {
            let slot = match op.kind() {
                OperationType::Insert => &mut counts.insert,
                OperationType::Delete => &mut counts.delete,
                OperationType::Update => &mut counts.update,
                OperationType::Move => &mut counts.moves,
                OperationType::Merge => &mut counts.merge,
                OperationType::Split => &mut counts.split,
                OperationType::Upgrade => &mut counts.upgrade,
                OperationType::Downgrade => &mut counts.downgrade,
            };
            *slot += 1;
        }
        counts
    }
}

/// Match the nodes of two trees.
///
/// Fails only when `options` do not validate.
pub fn match_trees(
    tree_a: &Tree,
    tree_b: &Tree,
    options: &MatchOptions,
) -> Result<(Matching, MatchStatistics), DiffError> {
    compute_matching(tree_a, tree_b, options)
}

/// Compare two trees.
///
/// This is the main entry point. It:
/// 1. Validates `options`
/// 2. Matches nodes (hash, similarity, propagation)
/// 3. Detects operations from the matching
pub fn diff_trees(
    tree_a: &Tree,
    tree_b: &Tree,
    options: &MatchOptions,
) -> Result<DiffResult, DiffError> {
    let (matching, statistics) = compute_matching(tree_a, tree_b, options)?;
    let operations = detect_operations(tree_a, tree_b, &matching, options);
    debug!(
        ops = operations.len(),
        matches = statistics.total_matches,
        "diff_trees done"
    );
    Ok(DiffResult {
        operations,
        statistics,
    })
}

/// Compare two native documents through their [`ToTree`] adapters.
pub fn diff<A, B>(a: &A, b: &B, options: &MatchOptions) -> Result<DiffResult, DiffError>
where
    A: ToTree + ?Sized,
    B: ToTree + ?Sized,
{
    diff_trees(&a.to_tree(), &b.to_tree(), options)
}

/// Compare many independent tree pairs on the rayon thread pool.
///
/// Results come back in input order.
pub fn diff_batch(
    pairs: &[(Tree, Tree)],
    options: &MatchOptions,
) -> Vec<Result<DiffResult, DiffError>> {
    if let Err(err) = options.validate() {
        return pairs.iter().map(|_| Err(err.clone())).collect();
    }
    debug!(pairs = pairs.len(), "diff_batch start");
    pairs
        .par_iter()
        .map(|(a, b)| diff_trees(a, b, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn list(items: &[&str]) -> Tree {
        let mut tree = Tree::new(TreeNode::element("ul"));
        for item in items {
            tree.add_child(tree.root, TreeNode::element("li").with_value(*item));
        }
        tree
    }

    #[test]
    fn test_diff_identical() {
        let a = list(&["a", "b"]);
        let result = diff_trees(&a, &a.clone(), &MatchOptions::default()).unwrap();
        assert!(result.is_identical());
        assert_eq!(result.statistics.total_matches, 3);
    }

    #[test]
    fn test_counts() {
        // The leftover `li` on each side pair up: `b` became `d` and now
        // sits after `c`.
        let a = list(&["a", "b", "c"]);
        let b = list(&["a", "c", "d"]);
        let result = diff_trees(&a, &b, &MatchOptions::default()).unwrap();
        assert_eq!(
            result.counts(),
            OperationCounts {
                update: 1,
                moves: 1,
                ..OperationCounts::default()
            }
        );

        // Two leftovers in B leave the label ambiguous.
        let b = list(&["a", "c", "d", "e"]);
        let result = diff_trees(&a, &b, &MatchOptions::default()).unwrap();
        let counts = result.counts();
        assert_eq!(counts.insert, 2);
        assert_eq!(counts.delete, 1);
        assert_eq!(counts.update, 0);
        assert_eq!(counts.moves, 0);
    }

    #[test]
    fn test_batch_preserves_order() {
        let pairs = vec![
            (list(&["a"]), list(&["a"])),
            (list(&["a"]), list(&["a", "b"])),
            (list(&["a", "b"]), list(&["b"])),
        ];
        let results = diff_batch(&pairs, &MatchOptions::default());
        let counts: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap().operations.len())
            .collect();
        assert_eq!(counts, vec![0, 1, 1]);
    }

    #[test]
    fn test_batch_invalid_options() {
        let pairs = vec![(list(&["a"]), list(&["a"])); 2];
        let options = MatchOptions {
            propagation_base_weight: 0.0,
            ..MatchOptions::default()
        };
        let results = diff_batch(&pairs, &options);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
    }
}
