//! Format-agnostic document tree.
//!
//! Adapters build a [`Tree`] once per document; every matcher works on this
//! representation only. Nodes live in an `indextree` arena and are never
//! mutated while a comparison runs.

use facet::Facet;
use indexmap::IndexMap;
use indextree::{Arena, NodeEdge, NodeId};

use crate::text;

/// Ordered attribute mapping (name -> value), insertion order preserved.
pub type Attributes = IndexMap<String, String>;

/// Type tag for scalar values coming out of JSON/YAML adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum ScalarType {
    /// A string literal
    String,
    /// An integer number
    Integer,
    /// A floating point number
    Float,
    /// `true` / `false`
    Boolean,
    /// `null` / `~`
    Null,
    /// A calendar date
    Date,
    /// A time of day
    Time,
    /// A combined date and time
    DateTime,
}

/// What a node is, decided once by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum NodeKind {
    /// Markup element (XML/HTML)
    Element,
    /// Character data
    Text,
    /// Markup comment
    Comment,
    /// Keyed container (JSON object, YAML mapping); children are labeled by key
    Object,
    /// Sequence container (JSON array, YAML sequence)
    Array,
    /// Typed scalar value
    Scalar(ScalarType),
}

impl NodeKind {
    /// Text and comment nodes carry prose rather than structure.
    pub fn is_textual(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Comment)
    }

    /// Whether sibling order among this node's children is insignificant
    /// once key order is ignored.
    pub fn is_keyed(self) -> bool {
        matches!(self, NodeKind::Object)
    }
}

/// Opaque handle back to the adapter's native node.
///
/// The core never interprets it; it only travels along so the presentation
/// layer can find the original construct again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRef(pub usize);

/// One element or value of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Variant chosen at the adapter boundary
    pub kind: NodeKind,
    /// Element name, object key, or a `#text`-style pseudo label
    pub label: String,
    /// Scalar or text content
    pub value: Option<String>,
    /// Attributes in document order
    pub attributes: Attributes,
    /// Back-reference to the native node
    pub source: Option<SourceRef>,
}

impl TreeNode {
    /// Create a node of the given kind with no value or attributes.
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            value: None,
            attributes: Attributes::new(),
            source: None,
        }
    }

    /// An element node.
    pub fn element(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Element, label)
    }

    /// A text node labeled `#text`.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, "#text").with_value(value)
    }

    /// A comment node labeled `#comment`.
    pub fn comment(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Comment, "#comment").with_value(value)
    }

    /// A keyed container.
    pub fn object(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Object, label)
    }

    /// A sequence container.
    pub fn array(label: impl Into<String>) -> Self {
        Self::new(NodeKind::Array, label)
    }

    /// A typed scalar.
    pub fn scalar(label: impl Into<String>, ty: ScalarType, value: impl Into<String>) -> Self {
        Self::new(NodeKind::Scalar(ty), label).with_value(value)
    }

    /// Set the value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Append an attribute, keeping insertion order.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attach the adapter handle.
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = Some(source);
        self
    }
}

/// A document tree backed by an `indextree` arena.
#[derive(Debug, Clone)]
pub struct Tree {
    /// The arena storing all nodes.
    pub arena: Arena<TreeNode>,
    /// The root node id.
    pub root: NodeId,
}

impl Tree {
    /// Create a tree holding only `root`.
    pub fn new(root: TreeNode) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Self { arena, root }
    }

    /// Append `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: TreeNode) -> NodeId {
        let child = self.arena.new_node(node);
        parent.append(child, &mut self.arena);
        child
    }

    /// Data for a node. Panics on an id from another arena.
    pub fn get(&self, id: NodeId) -> &TreeNode {
        self.arena[id].get()
    }

    /// Root id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Largest arena slot in use, for sizing id-indexed tables.
    pub(crate) fn capacity(&self) -> usize {
        self.arena.count() + 1
    }

    /// Parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent())
    }

    /// Children in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Position among siblings (0-indexed).
    pub fn position(&self, id: NodeId) -> usize {
        id.preceding_siblings(&self.arena).count() - 1
    }

    /// Number of edges between the root and `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        id.ancestors(&self.arena).count() - 1
    }

    /// All nodes in pre-order (document order).
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.descendants(&self.arena)
    }

    /// All nodes in post-order (children before parents).
    pub fn post_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.traverse(&self.arena).filter_map(|edge| match edge {
            NodeEdge::End(id) => Some(id),
            NodeEdge::Start(_) => None,
        })
    }

    /// `id` and all nodes below it, in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// Whitespace-normalized concatenation of all values in the subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let joined: Vec<&str> = self
            .descendants(id)
            .filter_map(|d| self.get(d).value.as_deref())
            .collect();
        text::normalize_whitespace(&joined.join(" "))
    }
}
