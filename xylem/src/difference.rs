//! Classify operations into dimension-tagged differences.
//!
//! A [`Difference`] says which axis of comparison an operation touches and
//! whether it counts toward "the documents differ" (normative) or is
//! cosmetic (informative).

use core::fmt;
use core::str::FromStr;

use facet::Facet;
use indextree::NodeId;

use crate::DiffResult;
use crate::attributes::order_differs;
use crate::detector::NodeSet;
use crate::equality::subtrees_equal;
use crate::error::DiffError;
use crate::node::Tree;
use crate::operation::{ChangeDetail, Operation, OperationType};
use crate::options::{self, MatchOptions};
use crate::text::values_equal;
use crate::tracing_macros::{debug, trace};

/// A named axis of comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
#[repr(u8)]
pub enum Dimension {
    /// Nodes appearing, disappearing, renamed, merged or split
    ElementStructure,
    /// Text and scalar values
    TextContent,
    /// Attribute keys and values
    AttributeValues,
    /// Attribute key order
    AttributeOrder,
    /// Order among siblings
    ElementPosition,
    /// Nesting depth
    ElementHierarchy,
}

impl Dimension {
    /// Every dimension, in declaration order.
    pub const ALL: [Dimension; 6] = [
        Dimension::ElementStructure,
        Dimension::TextContent,
        Dimension::AttributeValues,
        Dimension::AttributeOrder,
        Dimension::ElementPosition,
        Dimension::ElementHierarchy,
    ];

    /// Snake-case name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::ElementStructure => "element_structure",
            Dimension::TextContent => "text_content",
            Dimension::AttributeValues => "attribute_values",
            Dimension::AttributeOrder => "attribute_order",
            Dimension::ElementPosition => "element_position",
            Dimension::ElementHierarchy => "element_hierarchy",
        }
    }
}

impl FromStr for Dimension {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .into_iter()
            .find(|dim| dim.as_str() == s)
            .ok_or_else(|| DiffError::UnknownDimension {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a dimension matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Facet)]
#[repr(u8)]
pub enum Behavior {
    /// Any difference is normative
    #[default]
    Strict,
    /// Differences are normative after normalization
    Normalize,
    /// Differences are informative only
    Ignore,
}

impl Behavior {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Strict => "strict",
            Behavior::Normalize => "normalize",
            Behavior::Ignore => "ignore",
        }
    }

    /// Whether differences on a dimension with this behavior are normative.
    pub fn is_normative(self) -> bool {
        self != Behavior::Ignore
    }
}

impl FromStr for Behavior {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Behavior::Strict),
            "normalize" | "normalized" => Ok(Behavior::Normalize),
            "ignore" => Ok(Behavior::Ignore),
            other => Err(DiffError::UnknownBehavior {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior per dimension. Defaults to strict everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Facet)]
pub struct DimensionBehaviors {
    /// Behavior of [`Dimension::ElementStructure`]
    pub element_structure: Behavior,
    /// Behavior of [`Dimension::TextContent`]
    pub text_content: Behavior,
    /// Behavior of [`Dimension::AttributeValues`]
    pub attribute_values: Behavior,
    /// Behavior of [`Dimension::AttributeOrder`]
    pub attribute_order: Behavior,
    /// Behavior of [`Dimension::ElementPosition`]
    pub element_position: Behavior,
    /// Behavior of [`Dimension::ElementHierarchy`]
    pub element_hierarchy: Behavior,
}

impl DimensionBehaviors {
    /// Build a table from `(dimension, behavior)` name pairs; dimensions not
    /// named stay strict.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, DiffError> {
        let mut behaviors = Self::default();
        for (dimension, behavior) in pairs {
            behaviors.set(dimension.parse()?, behavior.parse()?);
        }
        Ok(behaviors)
    }

    /// Table matching the policies a comparison ran with.
    pub fn from_match_options(options: &MatchOptions) -> Self {
        let mut behaviors = Self::default();
        if options.attribute_order == options::AttributeOrder::Ignore {
            behaviors.attribute_order = Behavior::Ignore;
        }
        if options.text_content == options::TextContent::Normalize {
            behaviors.text_content = Behavior::Normalize;
        }
        behaviors
    }

    /// Behavior of one dimension.
    pub fn get(&self, dimension: Dimension) -> Behavior {
        match dimension {
            Dimension::ElementStructure => self.element_structure,
            Dimension::TextContent => self.text_content,
            Dimension::AttributeValues => self.attribute_values,
            Dimension::AttributeOrder => self.attribute_order,
            Dimension::ElementPosition => self.element_position,
            Dimension::ElementHierarchy => self.element_hierarchy,
        }
    }

    /// Change the behavior of one dimension.
    pub fn set(&mut self, dimension: Dimension, behavior: Behavior) {
        let slot = match dimension {
            Dimension::ElementStructure => &mut self.element_structure,
            Dimension::TextContent => &mut self.text_content,
            Dimension::AttributeValues => &mut self.attribute_values,
            Dimension::AttributeOrder => &mut self.attribute_order,
            Dimension::ElementPosition => &mut self.element_position,
            Dimension::ElementHierarchy => &mut self.element_hierarchy,
        };
        *slot = behavior;
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, dimension: Dimension, behavior: Behavior) -> Self {
        self.set(dimension, behavior);
        self
    }
}

/// Options for [`DiffConverter`].
#[derive(Debug, Clone, PartialEq, Default, Facet)]
pub struct ConverterOptions {
    /// Behavior per dimension
    pub behaviors: DimensionBehaviors,

    /// Labels whose subtrees only ever produce informative differences
    /// (e.g. `meta`, `generator`).
    pub metadata_labels: Vec<String>,
}

impl ConverterOptions {
    /// Builder-style setter adding one metadata label.
    pub fn with_metadata_label(mut self, label: impl Into<String>) -> Self {
        self.metadata_labels.push(label.into());
        self
    }
}

/// One classified difference.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    /// Axis of comparison
    pub dimension: Dimension,
    /// Counts toward "the documents differ"
    pub normative: bool,
    /// Type of the operation this came from
    pub operation: OperationType,
    /// Affected node in tree A (first source for merges)
    pub node_a: Option<NodeId>,
    /// Affected node in tree B (first target for splits)
    pub node_b: Option<NodeId>,
    /// The changed aspect, for updates
    pub change: Option<ChangeDetail>,
}

/// Maps operations to [`Difference`]s.
#[derive(Debug, Clone, Default)]
pub struct DiffConverter {
    options: ConverterOptions,
}

impl DiffConverter {
    /// A converter with the given options.
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// The options this converter classifies with.
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Classify every operation of `result`, computed from `tree_a` and
    /// `tree_b`.
    pub fn convert(&self, result: &DiffResult, tree_a: &Tree, tree_b: &Tree) -> Vec<Difference> {
        let reordered = self.attribute_order_pairs(&result.operations, tree_a, tree_b);
        let mut paired_a = NodeSet::new(tree_a);
        let mut paired_b = NodeSet::new(tree_b);
        for &(a, b) in &reordered {
            paired_a.insert(a);
            paired_b.insert(b);
        }

        let mut differences = Vec::new();
        for op in &result.operations {
            match op {
                Operation::Insert { node_b, .. } if paired_b.contains(*node_b) => continue,
                Operation::Delete { node_a, .. } if paired_a.contains(*node_a) => continue,
                _ => {}
            }
            self.convert_operation(op, tree_a, tree_b, &mut differences);
        }

        for (a, b) in reordered {
            let change = ChangeDetail::AttributeOrder {
                old: tree_a.get(a).attributes.keys().cloned().collect(),
                new: tree_b.get(b).attributes.keys().cloned().collect(),
            };
            differences.push(self.difference(
                Dimension::AttributeOrder,
                OperationType::Update,
                (Some(a), Some(b)),
                Some(change),
                (tree_a, tree_b),
            ));
        }

        debug!(
            operations = result.operations.len(),
            differences = differences.len(),
            "convert done"
        );
        differences
    }

    fn convert_operation(
        &self,
        op: &Operation,
        tree_a: &Tree,
        tree_b: &Tree,
        out: &mut Vec<Difference>,
    ) {
        let trees = (tree_a, tree_b);
        let kind = op.kind();
        match op {
            Operation::Insert { node_b, .. } => {
                let dimension = structural_dimension(tree_b, *node_b);
                out.push(self.difference(dimension, kind, (None, Some(*node_b)), None, trees));
            }
            Operation::Delete { node_a, .. } => {
                let dimension = structural_dimension(tree_a, *node_a);
                out.push(self.difference(dimension, kind, (Some(*node_a), None), None, trees));
            }
            Operation::Update {
                node_a,
                node_b,
                changes,
            } => {
                for change in changes {
                    let dimension = match change {
                        ChangeDetail::Label { .. } => Dimension::ElementStructure,
                        ChangeDetail::Value { .. } => Dimension::TextContent,
                        ChangeDetail::Attributes { .. } => Dimension::AttributeValues,
                        ChangeDetail::AttributeOrder { .. } => Dimension::AttributeOrder,
                    };
                    out.push(self.difference(
                        dimension,
                        kind,
                        (Some(*node_a), Some(*node_b)),
                        Some(change.clone()),
                        trees,
                    ));
                }
            }
            Operation::Move { node_a, node_b, .. } => out.push(self.difference(
                Dimension::ElementPosition,
                kind,
                (Some(*node_a), Some(*node_b)),
                None,
                trees,
            )),
            Operation::Upgrade { node_a, node_b, .. }
            | Operation::Downgrade { node_a, node_b, .. } => out.push(self.difference(
                Dimension::ElementHierarchy,
                kind,
                (Some(*node_a), Some(*node_b)),
                None,
                trees,
            )),
            Operation::Merge {
                sources_a,
                target_b,
            } => out.push(self.difference(
                Dimension::ElementStructure,
                kind,
                (sources_a.first().copied(), Some(*target_b)),
                None,
                trees,
            )),
            Operation::Split {
                source_a,
                targets_b,
            } => out.push(self.difference(
                Dimension::ElementStructure,
                kind,
                (Some(*source_a), targets_b.first().copied()),
                None,
                trees,
            )),
        }
    }

    fn difference(
        &self,
        dimension: Dimension,
        operation: OperationType,
        (node_a, node_b): (Option<NodeId>, Option<NodeId>),
        change: Option<ChangeDetail>,
        (tree_a, tree_b): (&Tree, &Tree),
    ) -> Difference {
        let metadata = node_a.is_some_and(|a| self.in_metadata(tree_a, a))
            || node_b.is_some_and(|b| self.in_metadata(tree_b, b));
        let normative = !metadata && self.options.behaviors.get(dimension).is_normative();
        Difference {
            dimension,
            normative,
            operation,
            node_a,
            node_b,
            change,
        }
    }

    /// `id` or one of its ancestors carries a metadata label.
    fn in_metadata(&self, tree: &Tree, id: NodeId) -> bool {
        if self.options.metadata_labels.is_empty() {
            return false;
        }
        core::iter::once(id)
            .chain(tree.ancestors(id))
            .any(|n| self.options.metadata_labels.contains(&tree.get(n).label))
    }

    /// Delete/insert pairs whose nodes only differ in attribute order.
    fn attribute_order_pairs(
        &self,
        operations: &[Operation],
        tree_a: &Tree,
        tree_b: &Tree,
    ) -> Vec<(NodeId, NodeId)> {
        let text = match self.options.behaviors.text_content {
            Behavior::Strict => options::TextContent::Strict,
            Behavior::Normalize | Behavior::Ignore => options::TextContent::Normalize,
        };

        let mut inserts: Vec<Option<NodeId>> = operations
            .iter()
            .filter_map(|op| match op {
                Operation::Insert { node_b, .. } => Some(Some(*node_b)),
                _ => None,
            })
            .collect();

        let mut pairs = Vec::new();
        for op in operations {
            let Operation::Delete { node_a, .. } = op else {
                continue;
            };
            let found = inserts.iter_mut().find(|slot| {
                slot.is_some_and(|b| only_order_differs(tree_a, *node_a, tree_b, b, text))
            });
            if let Some(slot) = found
                && let Some(b) = slot.take()
            {
                trace!(
                    a = usize::from(*node_a),
                    b = usize::from(b),
                    "convert: insert/delete differ only in attribute order"
                );
                pairs.push((*node_a, b));
            }
        }
        pairs
    }
}

fn structural_dimension(tree: &Tree, id: NodeId) -> Dimension {
    if tree.get(id).kind.is_textual() {
        Dimension::TextContent
    } else {
        Dimension::ElementStructure
    }
}

fn only_order_differs(
    tree_a: &Tree,
    a: NodeId,
    tree_b: &Tree,
    b: NodeId,
    text: options::TextContent,
) -> bool {
    let (na, nb) = (tree_a.get(a), tree_b.get(b));
    if na.kind != nb.kind || na.label != nb.label {
        return false;
    }
    if !values_equal(na.value.as_deref(), nb.value.as_deref(), text) {
        return false;
    }
    if !order_differs(&na.attributes, &nb.attributes) {
        return false;
    }
    if tree_a.child_count(a) != tree_b.child_count(b) {
        return false;
    }
    tree_a.children(a).zip(tree_b.children(b)).all(|(ca, cb)| {
        subtrees_equal(tree_a, ca, tree_b, cb, options::AttributeOrder::Ignore, text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_trees;
    use crate::node::TreeNode;
    use facet_testhelpers::test;

    #[test]
    fn test_dimension_names() {
        for dim in Dimension::ALL {
            assert_eq!(dim.as_str().parse::<Dimension>().unwrap(), dim);
        }
        let err = "colour".parse::<Dimension>().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_behaviors_from_pairs() {
        let behaviors = DimensionBehaviors::from_pairs([
            ("attribute_order", "ignore"),
            ("text_content", "normalized"),
        ])
        .unwrap();
        assert_eq!(behaviors.attribute_order, Behavior::Ignore);
        assert_eq!(behaviors.text_content, Behavior::Normalize);
        assert_eq!(behaviors.element_structure, Behavior::Strict);

        assert_eq!(
            DimensionBehaviors::from_pairs([("position", "strict")]).unwrap_err(),
            DiffError::UnknownDimension {
                name: "position".to_string()
            }
        );
        assert_eq!(
            DimensionBehaviors::from_pairs([("element_position", "loose")]).unwrap_err(),
            DiffError::UnknownBehavior {
                value: "loose".to_string()
            }
        );
    }

    #[test]
    fn test_behaviors_from_match_options() {
        let options = MatchOptions::default()
            .with_attribute_order(options::AttributeOrder::Ignore)
            .with_text_content(options::TextContent::Normalize);
        let behaviors = DimensionBehaviors::from_match_options(&options);
        assert_eq!(behaviors.get(Dimension::AttributeOrder), Behavior::Ignore);
        assert_eq!(behaviors.get(Dimension::TextContent), Behavior::Normalize);
        assert_eq!(behaviors.get(Dimension::ElementPosition), Behavior::Strict);
    }

    #[test]
    fn test_insert_text_is_text_content() {
        let mut a = Tree::new(TreeNode::element("p"));
        a.add_child(a.root, TreeNode::element("b"));
        let mut b = a.clone();
        b.add_child(b.root, TreeNode::text("tail"));
        b.add_child(b.root, TreeNode::element("i"));

        let result = diff_trees(&a, &b, &MatchOptions::default()).unwrap();
        let differences = DiffConverter::default().convert(&result, &a, &b);
        let dims: Vec<_> = differences.iter().map(|d| d.dimension).collect();
        assert_eq!(dims, vec![Dimension::TextContent, Dimension::ElementStructure]);
        assert!(differences.iter().all(|d| d.normative));
    }

    #[test]
    fn test_update_splits_per_aspect() {
        let mut a = Tree::new(TreeNode::element("root"));
        let ca = a.add_child(a.root, TreeNode::element("p").with_attr("id", "1"));
        let mut b = Tree::new(TreeNode::element("root"));
        let cb = b.add_child(b.root, TreeNode::element("p").with_attr("id", "2"));
        let result = DiffResult {
            operations: vec![Operation::Update {
                node_a: ca,
                node_b: cb,
                changes: vec![
                    ChangeDetail::Value {
                        old: Some("x".to_string()),
                        new: Some("y".to_string()),
                    },
                    ChangeDetail::Attributes {
                        added: vec![],
                        removed: vec![],
                        changed: vec!["id".to_string()],
                    },
                ],
            }],
            statistics: Default::default(),
        };

        let behaviors =
            DimensionBehaviors::default().with(Dimension::AttributeValues, Behavior::Ignore);
        let converter = DiffConverter::new(ConverterOptions {
            behaviors,
            ..ConverterOptions::default()
        });
        let differences = converter.convert(&result, &a, &b);
        assert_eq!(differences.len(), 2);
        assert_eq!(differences[0].dimension, Dimension::TextContent);
        assert!(differences[0].normative);
        assert_eq!(differences[1].dimension, Dimension::AttributeValues);
        assert!(!differences[1].normative);
    }

    #[test]
    fn test_metadata_labels_force_informative() {
        let mut a = Tree::new(TreeNode::element("html"));
        let head_a = a.add_child(a.root, TreeNode::element("head"));
        a.add_child(head_a, TreeNode::element("meta").with_attr("content", "v1"));
        let mut b = Tree::new(TreeNode::element("html"));
        let head_b = b.add_child(b.root, TreeNode::element("head"));
        let meta_b = b.add_child(head_b, TreeNode::element("meta").with_attr("content", "v1"));
        b.add_child(meta_b, TreeNode::text("generated"));

        let result = diff_trees(&a, &b, &MatchOptions::default()).unwrap();
        assert!(!result.operations.is_empty());

        let strict = DiffConverter::default().convert(&result, &a, &b);
        assert!(strict.iter().any(|d| d.normative));

        let converter = DiffConverter::new(ConverterOptions::default().with_metadata_label("meta"));
        let differences = converter.convert(&result, &a, &b);
        assert!(!differences.is_empty());
        assert!(differences.iter().all(|d| !d.normative));
    }

    #[test]
    fn test_attribute_order_only_insert_delete_collapses() {
        let mut a = Tree::new(TreeNode::element("root"));
        let old = a.add_child(
            a.root,
            TreeNode::element("img").with_attr("src", "a.png").with_attr("alt", "A"),
        );
        let mut b = Tree::new(TreeNode::element("root"));
        let new = b.add_child(
            b.root,
            TreeNode::element("img").with_attr("alt", "A").with_attr("src", "a.png"),
        );
        let result = DiffResult {
            operations: vec![
                Operation::Insert {
                    node_b: new,
                    parent_b: Some(b.root),
                    position: 0,
                },
                Operation::Delete {
                    node_a: old,
                    parent_a: Some(a.root),
                    position: 0,
                },
            ],
            statistics: Default::default(),
        };

        let differences = DiffConverter::default().convert(&result, &a, &b);
        assert_eq!(differences.len(), 1);
        let only = &differences[0];
        assert_eq!(only.dimension, Dimension::AttributeOrder);
        assert_eq!((only.node_a, only.node_b), (Some(old), Some(new)));
        assert!(only.normative);

        let behaviors =
            DimensionBehaviors::default().with(Dimension::AttributeOrder, Behavior::Ignore);
        let relaxed = DiffConverter::new(ConverterOptions {
            behaviors,
            ..ConverterOptions::default()
        });
        assert!(!relaxed.convert(&result, &a, &b)[0].normative);
    }
}
