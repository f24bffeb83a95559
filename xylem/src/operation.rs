//! Edit operations produced by the detector.

use core::fmt;
use core::str::FromStr;

use facet::Facet;
use indextree::NodeId;
use smallvec::SmallVec;

use crate::error::DiffError;

/// Node list for merge and split operations; runs are short in practice.
pub type NodeRun = SmallVec<[NodeId; 4]>;

/// The closed set of operation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
#[repr(u8)]
pub enum OperationType {
    /// A node present only in tree B
    Insert,
    /// A node present only in tree A
    Delete,
    /// A matched pair whose own data changed
    Update,
    /// A matched pair that changed position or parent at the same depth
    Move,
    /// Several tree-A siblings became one tree-B node
    Merge,
    /// One tree-A node became several tree-B siblings
    Split,
    /// A matched node that ended up shallower (promote)
    Upgrade,
    /// A matched node that ended up deeper (demote)
    Downgrade,
}

impl OperationType {
    /// Every operation type, in declaration order.
    pub const ALL: [OperationType; 8] = [
        OperationType::Insert,
        OperationType::Delete,
        OperationType::Update,
        OperationType::Move,
        OperationType::Merge,
        OperationType::Split,
        OperationType::Upgrade,
        OperationType::Downgrade,
    ];

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Delete => "delete",
            OperationType::Update => "update",
            OperationType::Move => "move",
            OperationType::Merge => "merge",
            OperationType::Split => "split",
            OperationType::Upgrade => "upgrade",
            OperationType::Downgrade => "downgrade",
        }
    }
}

impl FromStr for OperationType {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "promote" => return Ok(OperationType::Upgrade),
            "demote" => return Ok(OperationType::Downgrade),
            _ => {}
        }
        OperationType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| DiffError::InvalidOperationType {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed aspect of a matched pair.
#[derive(Debug, Clone, PartialEq, Facet)]
#[repr(u8)]
pub enum ChangeDetail {
    /// Element name or key changed.
    ///
    /// Every built-in matching phase pairs equal labels only, so this comes
    /// from matchings supplied to [`detect_operations`](crate::detect_operations).
    Label {
        /// Label in tree A
        old: String,
        /// Label in tree B
        new: String,
    },
    /// Scalar or text value changed
    Value {
        /// Value in tree A
        old: Option<String>,
        /// Value in tree B
        new: Option<String>,
    },
    /// Attribute set changed
    Attributes {
        /// Keys only in tree B
        added: Vec<String>,
        /// Keys only in tree A
        removed: Vec<String>,
        /// Shared keys with a different value
        changed: Vec<String>,
    },
    /// Same attributes, different order
    AttributeOrder {
        /// Key order in tree A
        old: Vec<String>,
        /// Key order in tree B
        new: Vec<String>,
    },
}

/// A single edit turning tree A into tree B.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert a node that only exists in tree B.
    Insert {
        /// The new node in tree B
        node_b: NodeId,
        /// Parent in tree B, `None` for a root
        parent_b: Option<NodeId>,
        /// Position among siblings (0-indexed)
        position: usize,
    },

    /// Delete a node that only exists in tree A.
    Delete {
        /// The removed node in tree A
        node_a: NodeId,
        /// Parent in tree A, `None` for a root
        parent_a: Option<NodeId>,
        /// Position among siblings (0-indexed)
        position: usize,
    },

    /// A matched node whose own data changed.
    Update {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// Every aspect that differs
        changes: Vec<ChangeDetail>,
    },

    /// A matched node that moved among siblings or to a new parent at the
    /// same depth.
    Move {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// Position among siblings in tree A
        from_position: usize,
        /// Position among siblings in tree B
        to_position: usize,
    },

    /// Consecutive tree-A siblings combined into one tree-B node.
    Merge {
        /// The combined siblings in tree A, in document order
        sources_a: NodeRun,
        /// The resulting node in tree B
        target_b: NodeId,
    },

    /// One tree-A node spread over consecutive tree-B siblings.
    Split {
        /// The original node in tree A
        source_a: NodeId,
        /// The resulting siblings in tree B, in document order
        targets_b: NodeRun,
    },

    /// A matched node that ended up closer to the root.
    Upgrade {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// Depth in tree A
        from_depth: usize,
        /// Depth in tree B
        to_depth: usize,
    },

    /// A matched node that ended up further from the root.
    Downgrade {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// Depth in tree A
        from_depth: usize,
        /// Depth in tree B
        to_depth: usize,
    },
}

impl Operation {
    /// The type tag of this operation.
    pub fn kind(&self) -> OperationType {
        match self {
            Operation::Insert { .. } => OperationType::Insert,
            Operation::Delete { .. } => OperationType::Delete,
            Operation::Update { .. } => OperationType::Update,
            Operation::Move { .. } => OperationType::Move,
            Operation::Merge { .. } => OperationType::Merge,
            Operation::Split { .. } => OperationType::Split,
            Operation::Upgrade { .. } => OperationType::Upgrade,
            Operation::Downgrade { .. } => OperationType::Downgrade,
        }
    }

    /// Tree-A nodes this operation touches.
    pub fn nodes_a(&self) -> NodeRun {
        match self {
            Operation::Insert { .. } => NodeRun::new(),
            Operation::Delete { node_a, .. }
            | Operation::Update { node_a, .. }
            | Operation::Move { node_a, .. }
            | Operation::Upgrade { node_a, .. }
            | Operation::Downgrade { node_a, .. }
            | Operation::Split {
                source_a: node_a, ..
            } => smallvec::smallvec![*node_a],
            Operation::Merge { sources_a, .. } => sources_a.clone(),
        }
    }

    /// Tree-B nodes this operation touches.
    pub fn nodes_b(&self) -> NodeRun {
        match self {
            Operation::Delete { .. } => NodeRun::new(),
            Operation::Insert { node_b, .. }
            | Operation::Update { node_b, .. }
            | Operation::Move { node_b, .. }
            | Operation::Upgrade { node_b, .. }
            | Operation::Downgrade { node_b, .. }
            | Operation::Merge {
                target_b: node_b, ..
            } => smallvec::smallvec![*node_b],
            Operation::Split { targets_b, .. } => targets_b.clone(),
        }
    }
}

fn write_run(f: &mut fmt::Formatter<'_>, side: char, run: &NodeRun) -> fmt::Result {
    for (i, id) in run.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{side}:{}", usize::from(*id))?;
    }
    Ok(())
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert {
                node_b,
                parent_b,
                position,
            } => {
                write!(f, "Insert(b:{} @{}", usize::from(*node_b), position)?;
                if let Some(parent) = parent_b {
                    write!(f, " under b:{}", usize::from(*parent))?;
                }
                write!(f, ")")
            }
            Operation::Delete {
                node_a, position, ..
            } => write!(f, "Delete(a:{} @{})", usize::from(*node_a), position),
            Operation::Update {
                node_a,
                node_b,
                changes,
            } => {
                write!(
                    f,
                    "Update(a:{} → b:{}",
                    usize::from(*node_a),
                    usize::from(*node_b)
                )?;
                for change in changes {
                    match change {
                        ChangeDetail::Label { old, new } => write!(f, " label {old} → {new}")?,
                        ChangeDetail::Value { old, new } => write!(
                            f,
                            " value {:?} → {:?}",
                            old.as_deref().unwrap_or(""),
                            new.as_deref().unwrap_or("")
                        )?,
                        ChangeDetail::Attributes {
                            added,
                            removed,
                            changed,
                        } => write!(f, " attrs +{added:?} -{removed:?} ~{changed:?}")?,
                        ChangeDetail::AttributeOrder { .. } => write!(f, " attr-order")?,
                    }
                }
                write!(f, ")")
            }
            Operation::Move {
                node_a,
                node_b,
                from_position,
                to_position,
            } => write!(
                f,
                "Move(a:{} → b:{} @{} → @{})",
                usize::from(*node_a),
                usize::from(*node_b),
                from_position,
                to_position
            ),
            Operation::Merge {
                sources_a,
                target_b,
            } => {
                f.write_str("Merge(")?;
                write_run(f, 'a', sources_a)?;
                write!(f, " → b:{})", usize::from(*target_b))
            }
            Operation::Split {
                source_a,
                targets_b,
            } => {
                write!(f, "Split(a:{} → ", usize::from(*source_a))?;
                write_run(f, 'b', targets_b)?;
                f.write_str(")")
            }
            Operation::Upgrade {
                node_a,
                node_b,
                from_depth,
                to_depth,
            }
            | Operation::Downgrade {
                node_a,
                node_b,
                from_depth,
                to_depth,
            } => {
                let name = if matches!(self, Operation::Upgrade { .. }) {
                    "Upgrade"
                } else {
                    "Downgrade"
                };
                write!(
                    f,
                    "{name}(a:{} → b:{} depth {} → {})",
                    usize::from(*node_a),
                    usize::from(*node_b),
                    from_depth,
                    to_depth
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeNode};
    use facet_testhelpers::test;

    #[test]
    fn test_operation_type_names() {
        for ty in OperationType::ALL {
            assert_eq!(ty.as_str().parse::<OperationType>().unwrap(), ty);
            assert_eq!(ty.to_string(), ty.as_str());
        }
        assert_eq!(
            "promote".parse::<OperationType>().unwrap(),
            OperationType::Upgrade
        );
        assert_eq!(
            "demote".parse::<OperationType>().unwrap(),
            OperationType::Downgrade
        );
    }

    #[test]
    fn test_unknown_operation_type() {
        let err = "rotate".parse::<OperationType>().unwrap_err();
        assert_eq!(
            err,
            DiffError::InvalidOperationType {
                name: "rotate".to_string()
            }
        );
        assert!("Insert".parse::<OperationType>().is_err(), "names are lowercase");
    }

    #[test]
    fn test_touched_nodes_and_display() {
        let mut tree = Tree::new(TreeNode::element("root"));
        let x = tree.add_child(tree.root, TreeNode::element("p"));
        let y = tree.add_child(tree.root, TreeNode::element("p"));

        let merge = Operation::Merge {
            sources_a: smallvec::smallvec![x, y],
            target_b: x,
        };
        assert_eq!(merge.kind(), OperationType::Merge);
        assert_eq!(merge.nodes_a().as_slice(), &[x, y]);
        assert_eq!(merge.nodes_b().as_slice(), &[x]);
        assert!(merge.to_string().starts_with("Merge("));

        let insert = Operation::Insert {
            node_b: y,
            parent_b: Some(tree.root),
            position: 1,
        };
        assert!(insert.nodes_a().is_empty());
        assert!(insert.to_string().contains("@1"));

        let update = Operation::Update {
            node_a: x,
            node_b: x,
            changes: vec![ChangeDetail::Value {
                old: Some("a".to_string()),
                new: Some("b".to_string()),
            }],
        };
        assert!(update.to_string().contains("value"));
    }
}
