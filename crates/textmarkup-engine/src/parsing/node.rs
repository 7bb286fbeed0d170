//! Syntax tree nodes produced by rule application.
//!
//! Nodes are handed around as `Arc<SyntaxTreeNode>`. A node under construction
//! is owned by exactly one [`ParsingResult`](super::ParsingResult) and may be
//! mutated in place; once the memoization wrapper freezes it, it may be shared
//! by several memo entries and every further change goes through
//! [`SyntaxTreeNode::make_mut`], which takes a shallow copy first.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Tag identifying the grammar construct a node represents.
///
/// The engine only knows [`NodeType::DOCUMENT_FRAGMENT`]; grammars declare
/// their own types as constants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeType(&'static str);

impl NodeType {
    /// Provisional type for nodes that accumulate children before a final type
    /// is assigned, and for anonymous runs of text inside a typed node.
    pub const DOCUMENT_FRAGMENT: NodeType = NodeType("documentFragment");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A strongly typed key into a node's [`PropertyBag`].
pub struct PropertyKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.name)
    }
}

pub(crate) type PropertyValue = Arc<dyn Any + Send + Sync>;

/// Open-ended per-node metadata. Cloning is shallow: values are shared.
#[derive(Clone, Default)]
pub struct PropertyBag {
    entries: Vec<(&'static str, PropertyValue)>,
}

impl PropertyBag {
    pub fn get<T: Any>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.entries
            .iter()
            .find(|(name, _)| *name == key.name)
            .and_then(|(_, value)| value.as_ref().downcast_ref::<T>())
    }

    pub fn contains<T>(&self, key: &PropertyKey<T>) -> bool {
        self.entries.iter().any(|(name, _)| *name == key.name)
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: &PropertyKey<T>, value: T) {
        self.insert_erased(key.name, Arc::new(value));
    }

    pub(crate) fn insert_erased(&mut self, name: &'static str, value: PropertyValue) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// A node in the syntax tree.
///
/// `length` is the number of bytes the node spans. When a node has children,
/// its length is the sum of theirs.
pub struct SyntaxTreeNode {
    kind: NodeType,
    length: usize,
    children: Vec<Arc<SyntaxTreeNode>>,
    frozen: bool,
    properties: PropertyBag,
}

impl SyntaxTreeNode {
    /// Creates a leaf node.
    pub fn new(kind: NodeType, length: usize) -> Self {
        Self {
            kind,
            length,
            children: Vec::new(),
            frozen: false,
            properties: PropertyBag::default(),
        }
    }

    /// Creates an empty fragment.
    pub fn fragment() -> Self {
        Self::new(NodeType::DOCUMENT_FRAGMENT, 0)
    }

    /// Creates an interior node; its length is derived from `children`.
    pub fn with_children(kind: NodeType, children: Vec<Arc<SyntaxTreeNode>>) -> Self {
        let length = children.iter().map(|child| child.length).sum();
        Self {
            kind,
            length,
            children,
            frozen: false,
            properties: PropertyBag::default(),
        }
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn children(&self) -> &[Arc<SyntaxTreeNode>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_fragment(&self) -> bool {
        self.kind == NodeType::DOCUMENT_FRAGMENT
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn property<T: Any>(&self, key: &PropertyKey<T>) -> Option<&T> {
        self.properties.get(key)
    }

    /// Returns the child covering `offset` (relative to this node) and the
    /// child's start offset. An offset equal to the node length resolves to
    /// the last child.
    pub fn child_containing(&self, offset: usize) -> Option<(usize, &Arc<SyntaxTreeNode>)> {
        let mut start = 0;
        for child in &self.children {
            let end = start + child.length;
            if offset < end {
                return Some((start, child));
            }
            start = end;
        }
        if offset == self.length {
            let last = self.children.last()?;
            return Some((self.length - last.length, last));
        }
        None
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.node_count())
            .sum::<usize>()
    }

    /// Gives mutable access to the node behind `node`, copying it first when
    /// it is frozen or shared. The copy is shallow: children stay shared.
    pub fn make_mut(node: &mut Arc<SyntaxTreeNode>) -> &mut SyntaxTreeNode {
        if node.frozen {
            *node = Arc::new(SyntaxTreeNode::clone(&**node));
        }
        Arc::make_mut(node)
    }

    /// Marks the node as shareable. Frozen nodes are never mutated again.
    pub(crate) fn freeze(node: &mut Arc<SyntaxTreeNode>) {
        if !node.frozen {
            Arc::make_mut(node).frozen = true;
        }
    }

    pub(crate) fn set_kind(&mut self, kind: NodeType) {
        self.kind = kind;
    }

    pub(crate) fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    /// Appends `child`, flattening plain fragments into this node.
    pub(crate) fn append_child(&mut self, child: Arc<SyntaxTreeNode>) {
        if child.is_fragment() && child.properties.is_empty() {
            if child.children.is_empty() {
                self.append_anonymous(child.length);
            } else {
                for grandchild in &child.children {
                    self.append_child(Arc::clone(grandchild));
                }
            }
            return;
        }
        self.materialize_leaf_length();
        self.length += child.length;
        self.children.push(child);
    }

    /// Extends the node by `length` bytes of text that carry no node of their
    /// own. Interior nodes record the run as an anonymous fragment leaf so the
    /// length invariant keeps holding.
    pub(crate) fn append_anonymous(&mut self, length: usize) {
        if length == 0 {
            return;
        }
        if let Some(last) = self.children.last_mut()
            && last.is_anonymous()
        {
            SyntaxTreeNode::make_mut(last).length += length;
        } else if !self.children.is_empty() {
            self.children
                .push(Arc::new(SyntaxTreeNode::new(NodeType::DOCUMENT_FRAGMENT, length)));
        }
        self.length += length;
    }

    fn is_anonymous(&self) -> bool {
        self.is_fragment() && self.children.is_empty() && self.properties.is_empty()
    }

    fn materialize_leaf_length(&mut self) {
        if self.children.is_empty() && self.length > 0 {
            let text = SyntaxTreeNode::new(NodeType::DOCUMENT_FRAGMENT, self.length);
            self.children.push(Arc::new(text));
        }
    }
}

/// Shallow copy. The copy is not frozen.
impl Clone for SyntaxTreeNode {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            length: self.length,
            children: self.children.clone(),
            frozen: false,
            properties: self.properties.clone(),
        }
    }
}

impl fmt::Debug for SyntaxTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SyntaxTreeNode");
        s.field("kind", &self.kind).field("length", &self.length);
        if !self.properties.is_empty() {
            s.field("properties", &self.properties);
        }
        if !self.children.is_empty() {
            s.field("children", &self.children);
        }
        s.finish()
    }
}

/// Structural equality: type, length, children and property names.
impl PartialEq for SyntaxTreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.length == other.length
            && self.properties.names().eq(other.properties.names())
            && self.children == other.children
    }
}

impl Eq for SyntaxTreeNode {}
