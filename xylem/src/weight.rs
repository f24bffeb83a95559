//! Subtree weight heuristic.

use core::fmt;

/// Size of a subtree: one per node, summed bottom-up.
///
/// Heavier nodes are hash-matched first, and the weight bounds how far
/// structural propagation may travel from a matched pair.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct NodeWeight(pub f64);

impl NodeWeight {
    /// Weight of a single node with no children.
    pub const LEAF: NodeWeight = NodeWeight(1.0);

    /// Weight of a node given its children's weights.
    pub fn from_children(children: impl IntoIterator<Item = NodeWeight>) -> Self {
        NodeWeight(1.0 + children.into_iter().map(|w| w.0).sum::<f64>())
    }

    /// Number of propagation levels this weight allows: `1 + floor(w / base)`.
    pub fn depth_budget(self, base: f64) -> usize {
        1 + (self.0 / base).floor() as usize
    }
}

impl fmt::Display for NodeWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_children() {
        assert_eq!(NodeWeight::from_children([]), NodeWeight::LEAF);
        let w = NodeWeight::from_children([NodeWeight::LEAF, NodeWeight(3.0)]);
        assert_eq!(w, NodeWeight(5.0));
    }

    #[test]
    fn test_depth_budget() {
        assert_eq!(NodeWeight(1.0).depth_budget(10.0), 1);
        assert_eq!(NodeWeight(9.0).depth_budget(10.0), 1);
        assert_eq!(NodeWeight(10.0).depth_budget(10.0), 2);
        assert_eq!(NodeWeight(35.0).depth_budget(10.0), 4);
    }
}
