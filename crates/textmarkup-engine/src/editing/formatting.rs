//! Per-node-type formatting and replacement functions.
//!
//! Formatting runs top-down: a node's function sees the attributes inherited
//! from its ancestors and may override them for its own subtree. A
//! replacement function may render a node's whole span as different text,
//! which makes the span atomic for range translation. Returning `Some("")`
//! hides the node.

use rustc_hash::FxHashMap;

use super::attributes::AttributeSet;
use crate::parsing::{NodeType, SyntaxTreeNode};

pub type FormatFn = Box<dyn Fn(&SyntaxTreeNode, &mut AttributeSet) + Send + Sync>;

/// Receives the node and its raw text.
pub type ReplaceFn = Box<dyn Fn(&SyntaxTreeNode, &str) -> Option<String> + Send + Sync>;

#[derive(Default)]
pub struct Formatting {
    defaults: AttributeSet,
    formatters: FxHashMap<NodeType, FormatFn>,
    replacements: FxHashMap<NodeType, ReplaceFn>,
}

impl Formatting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes applied at the root, before any formatting function.
    pub fn with_defaults(mut self, defaults: AttributeSet) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn format(
        mut self,
        kind: NodeType,
        f: impl Fn(&SyntaxTreeNode, &mut AttributeSet) + Send + Sync + 'static,
    ) -> Self {
        self.formatters.insert(kind, Box::new(f));
        self
    }

    pub fn replace(
        mut self,
        kind: NodeType,
        f: impl Fn(&SyntaxTreeNode, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.replacements.insert(kind, Box::new(f));
        self
    }

    /// Shorthand for a replacement that hides every node of `kind`.
    pub fn hide(self, kind: NodeType) -> Self {
        self.replace(kind, |_, _| Some(String::new()))
    }

    pub fn defaults(&self) -> &AttributeSet {
        &self.defaults
    }

    pub(crate) fn formatter(&self, kind: NodeType) -> Option<&FormatFn> {
        self.formatters.get(&kind)
    }

    pub(crate) fn replacement(&self, kind: NodeType) -> Option<&ReplaceFn> {
        self.replacements.get(&kind)
    }

    pub fn has_replacement(&self, kind: NodeType) -> bool {
        self.replacements.contains_key(&kind)
    }
}

impl std::fmt::Debug for Formatting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatting")
            .field("defaults", &self.defaults)
            .field("formatters", &self.formatters.keys().collect::<Vec<_>>())
            .field("replacements", &self.replacements.keys().collect::<Vec<_>>())
            .finish()
    }
}
