//! Indented outline syntax for writing trees in tests.
//!
//! One node per line, two spaces of indentation per level:
//!
//! ```text
//! html
//!   body @class=main
//!     p: some text
//!     #text: loose text
//!   config{}
//!     port: 8080
//!   items[]
//! ```
//!
//! A line is `label (@name=value)* (: value)?`. `#text` and `#comment` make
//! text and comment nodes, a `{}` suffix makes an object and `[]` an array.
//! Valued children of objects and arrays are string scalars.

#![allow(dead_code)]

use xylem::indextree::NodeId;
use xylem::{NodeKind, Operation, ScalarType, Tree, TreeNode};

fn parse_line(line: &str, parent_kind: Option<NodeKind>) -> Result<TreeNode, String> {
    let (head, value) = match line.split_once(": ") {
        Some((head, value)) => (head, Some(value.trim_end())),
        None => (line.trim_end(), None),
    };
    let mut parts = head.split_whitespace();
    let label = parts.next().ok_or_else(|| format!("empty node line: {line:?}"))?;

    let mut node = if let Some(key) = label.strip_suffix("{}") {
        TreeNode::object(key)
    } else if let Some(key) = label.strip_suffix("[]") {
        TreeNode::array(key)
    } else if label == "#text" {
        TreeNode::text(value.unwrap_or_default())
    } else if label == "#comment" {
        TreeNode::comment(value.unwrap_or_default())
    } else if let (Some(NodeKind::Object | NodeKind::Array), Some(value)) = (parent_kind, value) {
        TreeNode::scalar(label, ScalarType::String, value)
    } else {
        let node = TreeNode::element(label);
        match value {
            Some(value) => node.with_value(value),
            None => node,
        }
    };

    for attr in parts {
        let (name, value) = attr
            .strip_prefix('@')
            .and_then(|a| a.split_once('='))
            .ok_or_else(|| format!("bad attribute {attr:?} in {line:?}"))?;
        node = node.with_attr(name, value);
    }
    Ok(node)
}

/// Parse an outline into a tree. Blank lines are skipped.
pub fn parse_tree(text: &str) -> Result<Tree, String> {
    let mut tree: Option<Tree> = None;
    // Open ancestors: (depth, id)
    let mut stack: Vec<(usize, NodeId)> = Vec::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent % 2 != 0 {
            return Err(format!("odd indentation: {line:?}"));
        }
        let depth = indent / 2;
        let line = line.trim_start();

        match tree.as_mut() {
            None => {
                if depth != 0 {
                    return Err(format!("root must not be indented: {line:?}"));
                }
                let root = Tree::new(parse_line(line, None)?);
                stack.push((0, root.root));
                tree = Some(root);
            }
            Some(tree) => {
                while stack.last().is_some_and(|&(d, _)| d >= depth) {
                    stack.pop();
                }
                let &(parent_depth, parent) = stack
                    .last()
                    .ok_or_else(|| format!("second root: {line:?}"))?;
                if depth != parent_depth + 1 {
                    return Err(format!("indentation jumps a level: {line:?}"));
                }
                let node = parse_line(line, Some(tree.get(parent).kind))?;
                let id = tree.add_child(parent, node);
                stack.push((depth, id));
            }
        }
    }

    tree.ok_or_else(|| "empty outline".to_string())
}

/// `<type> <label>` for each operation, sorted.
///
/// The label is the tree-B node's for inserts and the first tree-A node's
/// otherwise.
pub fn summarize(ops: &[Operation], tree_a: &Tree, tree_b: &Tree) -> Vec<String> {
    let mut lines: Vec<String> = ops
        .iter()
        .map(|op| {
            let label = match op.nodes_a().first() {
                Some(&a) => &tree_a.get(a).label,
                None => &tree_b.get(op.nodes_b()[0]).label,
            };
            format!("{} {}", op.kind(), label)
        })
        .collect();
    lines.sort();
    lines
}
