use std::sync::Arc;

use super::node::{NodeType, SyntaxTreeNode};

/// The value threaded through every rule application.
///
/// `examined_length` is how far past the start index the rule looked, whether
/// or not it succeeded. The memoization table relies on it to decide which
/// cached results an edit can affect.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsingResult {
    pub succeeded: bool,
    pub length: usize,
    pub examined_length: usize,
    pub node: Option<Arc<SyntaxTreeNode>>,
}

impl ParsingResult {
    /// A failure that looked at `examined_length` bytes.
    pub fn fail(examined_length: usize) -> Self {
        Self {
            succeeded: false,
            length: 0,
            examined_length,
            node: None,
        }
    }

    /// A success consuming `length` bytes without producing a node.
    pub fn success(length: usize, examined_length: usize) -> Self {
        Self {
            succeeded: true,
            length,
            examined_length: examined_length.max(length),
            node: None,
        }
    }

    /// The starting point for sequences: succeeded, nothing consumed.
    pub fn empty() -> Self {
        Self::success(0, 0)
    }

    pub fn with_node(mut self, node: Arc<SyntaxTreeNode>) -> Self {
        debug_assert_eq!(node.length(), self.length, "node length must match result length");
        self.node = Some(node);
        self
    }

    /// Folds the result of the next step of a sequence into `self`.
    ///
    /// A failing child fails the whole result but its examined length still
    /// counts. A child without a node contributes anonymous text; a typed child
    /// arriving at an empty result is adopted instead of being wrapped.
    pub fn append_child(&mut self, child: ParsingResult) {
        self.examined_length = self
            .examined_length
            .max(self.length + child.examined_length);
        if !self.succeeded {
            return;
        }
        if !child.succeeded {
            self.succeeded = false;
            self.length = 0;
            self.node = None;
            return;
        }

        let offset = self.length;
        self.length += child.length;
        self.node = match (self.node.take(), child.node) {
            (node, None) if child.length == 0 => node,
            (None, None) => None,
            (None, Some(child_node)) if offset == 0 => Some(child_node),
            (None, Some(child_node)) => {
                let mut fragment = SyntaxTreeNode::fragment();
                fragment.append_anonymous(offset);
                fragment.append_child(child_node);
                Some(Arc::new(fragment))
            }
            (Some(node), child_node) => {
                // A tagged fragment keeps its span; later siblings go beside it.
                let mut node = if node.is_fragment() && node.properties().is_empty() {
                    node
                } else {
                    Arc::new(SyntaxTreeNode::with_children(
                        NodeType::DOCUMENT_FRAGMENT,
                        vec![node],
                    ))
                };
                let target = SyntaxTreeNode::make_mut(&mut node);
                match child_node {
                    Some(child_node) => target.append_child(child_node),
                    None => target.append_anonymous(child.length),
                }
                Some(node)
            }
        };
    }

    /// Node covering the whole result, creating an anonymous one if the rule
    /// produced none.
    pub(crate) fn node_or_fragment(&mut self) -> &mut Arc<SyntaxTreeNode> {
        let length = self.length;
        self.node
            .get_or_insert_with(|| {
                Arc::new(SyntaxTreeNode::new(NodeType::DOCUMENT_FRAGMENT, length))
            })
    }
}
