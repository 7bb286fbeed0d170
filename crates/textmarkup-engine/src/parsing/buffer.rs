use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use thiserror::Error;
use xi_rope::{Delta, Rope};

use super::evaluate::ParseContext;
use super::grammar::Grammar;
use super::memo::{MemoStatistics, MemoizationTable};
use super::node::{NodeType, SyntaxTreeNode};
use super::rules::RuleId;
use super::text;
use super::trace::{RuleStatistics, StatisticsTable, TraceBuffer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The start rule stopped short of the end of the buffer. The tree for
    /// the parsed prefix is still available from [`ParseBuffer::tree`].
    #[error("parsed {length} of {buffer_length} bytes")]
    IncompleteParsing { length: usize, buffer_length: usize },
    #[error("range {range:?} is not valid for a buffer of {buffer_length} bytes")]
    InvalidRange {
        range: Range<usize>,
        buffer_length: usize,
    },
}

/// One step of [`ParseBuffer::path_to_index`]: a node and the buffer offset
/// it starts at.
#[derive(Clone, Debug)]
pub struct PathEntry {
    pub start: usize,
    pub node: Arc<SyntaxTreeNode>,
}

impl PathEntry {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.node.length()
    }
}

/// Raw text plus everything needed to reparse it incrementally.
///
/// Not synchronized: all calls must come from one thread at a time.
pub struct ParseBuffer {
    text: Rope,
    grammar: Arc<Grammar>,
    memo: MemoizationTable,
    statistics: StatisticsTable,
    trace: Option<TraceBuffer>,
    tree: Option<Arc<SyntaxTreeNode>>,
    last_error: Option<ParseError>,
}

impl ParseBuffer {
    /// Creates a buffer holding `text`. Nothing is parsed until
    /// [`parse`](Self::parse) is called.
    pub fn new(text: &str, grammar: impl Into<Arc<Grammar>>) -> Self {
        let grammar = grammar.into();
        let text = Rope::from(text);
        Self {
            memo: MemoizationTable::new(text.len()),
            statistics: StatisticsTable::new(grammar.rule_count()),
            trace: grammar.is_tracing().then(TraceBuffer::new),
            tree: None,
            last_error: None,
            text,
            grammar,
        }
    }

    /// Runs the start rule over the whole buffer.
    ///
    /// Memoized results that survived earlier edits are reused. On
    /// `IncompleteParsing` the partial tree is kept and returned by
    /// [`tree`](Self::tree).
    pub fn parse(&mut self) -> Result<Arc<SyntaxTreeNode>, ParseError> {
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
        let mut cx = ParseContext {
            text: &self.text,
            memo: &mut self.memo,
            statistics: &mut self.statistics,
            trace: self.trace.as_mut(),
        };
        let result = self.grammar.apply(self.grammar.start(), 0, &mut cx);

        let buffer_length = self.text.len();
        let length = if result.succeeded { result.length } else { 0 };
        let root = result
            .node
            .unwrap_or_else(|| Arc::new(SyntaxTreeNode::new(NodeType::DOCUMENT_FRAGMENT, length)));

        #[cfg(debug_assertions)]
        super::snapshot::invariants(buffer_length, &root);

        log::debug!(
            "parsed {length}/{buffer_length} bytes into {} nodes (memo {:?})",
            root.node_count(),
            self.memo.statistics()
        );
        self.tree = Some(Arc::clone(&root));

        if length < buffer_length {
            log::warn!("grammar stopped at byte {length} of {buffer_length}");
            let error = ParseError::IncompleteParsing {
                length,
                buffer_length,
            };
            self.last_error = Some(error.clone());
            return Err(error);
        }
        self.last_error = None;
        Ok(root)
    }

    /// Replaces `range` with `text` and reparses.
    pub fn replace_characters(
        &mut self,
        range: Range<usize>,
        text: &str,
    ) -> Result<Arc<SyntaxTreeNode>, ParseError> {
        self.check_range(&range)?;
        log::debug!("replace {range:?} with {} bytes", text.len());

        let delta = Delta::simple_edit(range.clone(), Rope::from(text), self.text.len());
        self.text = delta.apply(&self.text);
        self.memo.apply_edit(range, text.len());
        debug_assert_eq!(self.memo.column_count(), self.text.len() + 1);
        self.parse()
    }

    pub(crate) fn check_range(&self, range: &Range<usize>) -> Result<(), ParseError> {
        let valid = range.start <= range.end
            && text::is_boundary(&self.text, range.start)
            && text::is_boundary(&self.text, range.end);
        if valid {
            Ok(())
        } else {
            Err(ParseError::InvalidRange {
                range: range.clone(),
                buffer_length: self.text.len(),
            })
        }
    }

    /// Nodes from the root down to the leaf containing `index`.
    ///
    /// Empty before the first parse or when `index` is past the parsed text.
    pub fn path_to_index(&self, index: usize) -> Vec<PathEntry> {
        let mut path = Vec::new();
        let Some(root) = &self.tree else {
            return path;
        };
        if index > root.length() {
            return path;
        }
        let mut entry = PathEntry {
            start: 0,
            node: Arc::clone(root),
        };
        loop {
            let next = entry
                .node
                .child_containing(index - entry.start)
                .map(|(offset, child)| PathEntry {
                    start: entry.start + offset,
                    node: Arc::clone(child),
                });
            path.push(entry);
            match next {
                Some(child) => entry = child,
                None => break,
            }
        }
        path
    }

    /// Drops every memoized result; the next parse starts cold.
    pub fn clear_memo(&mut self) {
        self.memo.reset(self.text.len());
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text in `range`, clamped to the buffer.
    pub fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let len = self.text.len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.text.slice_to_cow(start..end)
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Root of the last parse; the parsed prefix if it was incomplete.
    pub fn tree(&self) -> Option<&Arc<SyntaxTreeNode>> {
        self.tree.as_ref()
    }

    pub fn last_error(&self) -> Option<&ParseError> {
        self.last_error.as_ref()
    }

    /// Counters accumulated over every parse of this buffer.
    pub fn rule_statistics(&self, rule: RuleId) -> RuleStatistics {
        self.statistics.get(rule)
    }

    pub fn memo_statistics(&self) -> MemoStatistics {
        self.memo.statistics()
    }

    /// Trace of the last parse, when the grammar was built with tracing.
    pub fn trace(&self) -> Option<&TraceBuffer> {
        self.trace.as_ref()
    }
}
