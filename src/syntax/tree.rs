use std::fmt;
use std::ops::Range;

use crate::error::{InjectionError, InjectionResult};

/// Index of a node inside one [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Leaf {
    text: String,
    /// Parsed (decoded) text, kept once patching changes `text`
    original: Option<String>,
    whitespace: bool,
}

#[derive(Debug, Clone)]
struct Node {
    kind: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    leaf: Option<Leaf>,
}

/// Syntax tree of an injected fragment.
///
/// Leaves carry text and partition the text the tree was parsed from. After
/// leaf patching, leaf texts spell the host view of the fragment and each
/// changed leaf remembers its parsed text.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> &str {
        self.nodes.get(node.0).map_or("", |n| n.kind.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| n.children.as_slice())
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.leaf.is_some())
    }

    pub fn is_whitespace(&self, node: NodeId) -> bool {
        self.leaf(node).is_some_and(|leaf| leaf.whitespace)
    }

    fn leaf(&self, node: NodeId) -> Option<&Leaf> {
        self.nodes.get(node.0)?.leaf.as_ref()
    }

    /// Leaves in text order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if self.is_leaf(node) {
                leaves.push(node);
            } else {
                stack.extend(self.children(node).iter().rev().copied());
            }
        }
        leaves
    }

    /// Current text of a leaf (host view after patching).
    pub fn leaf_text(&self, node: NodeId) -> Option<&str> {
        self.leaf(node).map(|leaf| leaf.text.as_str())
    }

    /// Parsed text of a leaf, whether or not patching changed it.
    pub fn original_text(&self, node: NodeId) -> Option<&str> {
        self.leaf(node)
            .map(|leaf| leaf.original.as_deref().unwrap_or(&leaf.text))
    }

    /// Whether patching replaced this leaf's text.
    pub fn is_patched(&self, node: NodeId) -> bool {
        self.leaf(node).is_some_and(|leaf| leaf.original.is_some())
    }

    /// Replace a leaf's text, remembering the parsed text on first change.
    pub fn set_leaf_text(&mut self, node: NodeId, text: String) {
        let Some(leaf) = self.nodes.get_mut(node.0).and_then(|n| n.leaf.as_mut()) else {
            return;
        };
        if leaf.text == text {
            return;
        }
        if leaf.original.is_none() {
            leaf.original = Some(std::mem::take(&mut leaf.text));
        }
        leaf.text = text;
    }

    /// Concatenated current leaf texts.
    pub fn text(&self) -> String {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| self.leaf_text(leaf))
            .collect()
    }

    /// Concatenated parsed leaf texts.
    pub fn decoded_text(&self) -> String {
        self.leaves()
            .into_iter()
            .filter_map(|leaf| self.original_text(leaf))
            .collect()
    }

    /// Range of a node in parsed (decoded) coordinates.
    pub fn text_range(&self, node: NodeId) -> Option<Range<usize>> {
        self.nodes.get(node.0)?;
        let mut offset = 0;
        let mut range: Option<Range<usize>> = None;
        for leaf in self.leaves() {
            let len = self.original_text(leaf).map_or(0, str::len);
            if self.is_ancestor_or_self(node, leaf) {
                let current = range.get_or_insert(offset..offset);
                current.end = offset + len;
            }
            offset += len;
        }
        Some(range.unwrap_or(offset..offset))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Leaf whose parsed range contains `offset` (half-open; empty leaves skipped).
    pub fn leaf_at_offset(&self, offset: usize) -> Option<NodeId> {
        let mut start = 0;
        for leaf in self.leaves() {
            let end = start + self.original_text(leaf).map_or(0, str::len);
            if start <= offset && offset < end {
                return Some(leaf);
            }
            start = end;
        }
        None
    }

    /// Replace everything below the root with the content of `other`,
    /// keeping this tree's root kind.
    pub fn replace_children(&mut self, other: SyntaxTree) {
        let kind = self
            .nodes
            .first_mut()
            .map(|root| std::mem::take(&mut root.kind));
        self.nodes = other.nodes;
        if let (Some(kind), Some(root)) = (kind, self.nodes.first_mut()) {
            root.kind = kind;
        }
    }
}

/// Builds a [`SyntaxTree`] from start/finish node events.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: &str, leaf: Option<Leaf>) -> InjectionResult<NodeId> {
        let parent = self.open.last().copied();
        if parent.is_none() && !self.nodes.is_empty() {
            return Err(InjectionError::malformed_tree(format!(
                "second root '{kind}' after the tree was closed"
            )));
        }
        if parent.is_none() && leaf.is_some() {
            return Err(InjectionError::malformed_tree("a token cannot be the root"));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: kind.to_string(),
            parent,
            children: Vec::new(),
            leaf,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        Ok(id)
    }

    pub fn start_node(&mut self, kind: &str) -> InjectionResult<NodeId> {
        let id = self.push(kind, None)?;
        self.open.push(id);
        Ok(id)
    }

    pub fn token(&mut self, kind: &str, text: &str, whitespace: bool) -> InjectionResult<NodeId> {
        self.push(
            kind,
            Some(Leaf {
                text: text.to_string(),
                original: None,
                whitespace,
            }),
        )
    }

    pub fn finish_node(&mut self) -> InjectionResult<()> {
        self.open
            .pop()
            .map(|_| ())
            .ok_or_else(|| InjectionError::malformed_tree("finish_node without open node"))
    }

    pub fn finish(self) -> InjectionResult<SyntaxTree> {
        if !self.open.is_empty() {
            return Err(InjectionError::malformed_tree(format!(
                "{} nodes left open",
                self.open.len()
            )));
        }
        if self.nodes.is_empty() {
            return Err(InjectionError::malformed_tree("empty tree"));
        }
        Ok(SyntaxTree { nodes: self.nodes })
    }
}
