//! Conversion between native document models and [`Tree`].
//!
//! Format crates implement these traits; the comparison core never looks
//! past the tree they produce.

use crate::node::Tree;

/// Builds a comparison tree from a native document.
pub trait ToTree {
    /// Convert `self` into a tree. Adapters record a [`SourceRef`] on nodes
    /// they want to find again after the diff.
    ///
    /// [`SourceRef`]: crate::node::SourceRef
    fn to_tree(&self) -> Tree;
}

/// Rebuilds a native document from a comparison tree.
pub trait FromTree: Sized {
    /// Why a tree could not be turned back into a document.
    type Error;

    /// Convert `tree` back into the native representation.
    fn from_tree(tree: &Tree) -> Result<Self, Self::Error>;
}
