//! Rule application.
//!
//! Every rule reduces to one operation: given the text, a start index and the
//! memoization table, produce a [`ParsingResult`]. `examined_length` is
//! tracked for successes and failures alike, since the memo table uses it to
//! decide what an edit invalidates.

use std::sync::Arc;

use xi_rope::Rope;

use super::grammar::Grammar;
use super::memo::MemoizationTable;
use super::node::SyntaxTreeNode;
use super::result::ParsingResult;
use super::rules::{CompareOptions, RepeatBounds, Rule, RuleId};
use super::text::char_at;
use super::trace::{StatisticsTable, TraceBuffer};

/// Mutable state threaded through one parse.
pub(crate) struct ParseContext<'a> {
    pub(crate) text: &'a Rope,
    pub(crate) memo: &'a mut MemoizationTable,
    pub(crate) statistics: &'a mut StatisticsTable,
    pub(crate) trace: Option<&'a mut TraceBuffer>,
}

impl Grammar {
    /// Applies `rule` at `index` outside of a parse buffer.
    ///
    /// `memo` must have been created for `text` (one column per byte plus
    /// one). Rule statistics are not kept.
    pub fn parse_rule(
        &self,
        rule: RuleId,
        text: &Rope,
        index: usize,
        memo: &mut MemoizationTable,
    ) -> ParsingResult {
        debug_assert_eq!(memo.column_count(), text.len() + 1);
        let mut statistics = StatisticsTable::new(self.rule_count());
        let mut cx = ParseContext {
            text,
            memo,
            statistics: &mut statistics,
            trace: None,
        };
        self.apply(rule, index, &mut cx)
    }

    pub(crate) fn apply(
        &self,
        rule: RuleId,
        index: usize,
        cx: &mut ParseContext<'_>,
    ) -> ParsingResult {
        let traced = if self.is_tracing() { self.name(rule) } else { None };
        if let (Some(name), Some(trace)) = (traced, cx.trace.as_deref_mut()) {
            trace.enter(name, index);
        }

        let result = self.evaluate(rule, index, cx);
        debug_assert!(result.examined_length >= result.length);
        debug_assert!(
            result.node.as_ref().is_none_or(|node| node.length() == result.length),
            "rule {rule} produced a node whose length differs from the match"
        );

        cx.statistics.record(rule, result.succeeded);
        if let (Some(name), Some(trace)) = (traced, cx.trace.as_deref_mut()) {
            trace.exit(name, index, result.succeeded, result.length);
        }
        result
    }

    fn evaluate(&self, id: RuleId, index: usize, cx: &mut ParseContext<'_>) -> ParsingResult {
        let Some(rule) = self.rule(id) else {
            return ParsingResult::fail(1);
        };
        match rule {
            Rule::Literal { text, options } => match_literal(cx.text, index, text, *options),
            Rule::CharacterClass(set) => match char_at(cx.text, index) {
                Some(c) if set.contains(c) => ParsingResult::success(c.len_utf8(), c.len_utf8()),
                _ => ParsingResult::fail(1),
            },
            Rule::Dot => match char_at(cx.text, index) {
                Some(c) => ParsingResult::success(c.len_utf8(), c.len_utf8()),
                None => ParsingResult::fail(1),
            },
            Rule::InOrder(sequence) => {
                let mut result = ParsingResult::empty();
                for &rule in sequence {
                    let child = self.apply(rule, index + result.length, cx);
                    result.append_child(child);
                    if !result.succeeded {
                        break;
                    }
                }
                result
            }
            Rule::Choice(alternatives) => {
                if let Some(c) = char_at(cx.text, index)
                    && !self.analysis(id).possible.contains(c)
                {
                    return ParsingResult::fail(1);
                }
                let mut examined = 1;
                for &rule in alternatives {
                    let mut child = self.apply(rule, index, cx);
                    examined = examined.max(child.examined_length);
                    if child.succeeded {
                        child.examined_length = examined;
                        return child;
                    }
                }
                ParsingResult::fail(examined)
            }
            Rule::Repeating { rule, bounds } => self.repeat(*rule, *bounds, index, cx),
            Rule::ZeroOrOne(rule) => {
                let child = self.apply(*rule, index, cx);
                if child.succeeded {
                    child
                } else {
                    ParsingResult::success(0, child.examined_length)
                }
            }
            Rule::Assertion(rule) => {
                let child = self.apply(*rule, index, cx);
                lookahead(child.succeeded, child.examined_length)
            }
            Rule::NotAssertion(rule) => {
                let child = self.apply(*rule, index, cx);
                lookahead(!child.succeeded, child.examined_length)
            }
            Rule::Wrapping { rule, node_type } => {
                let mut result = self.apply(*rule, index, cx);
                if result.succeeded {
                    let node = match result.node.take() {
                        Some(mut node) if node.is_fragment() => {
                            SyntaxTreeNode::make_mut(&mut node).set_kind(*node_type);
                            node
                        }
                        Some(node) => {
                            Arc::new(SyntaxTreeNode::with_children(*node_type, vec![node]))
                        }
                        None => Arc::new(SyntaxTreeNode::new(*node_type, result.length)),
                    };
                    result.node = Some(node);
                }
                result
            }
            Rule::Absorbing { rule, node_type } => {
                let mut result = self.apply(*rule, index, cx);
                if result.succeeded {
                    result.node = Some(Arc::new(SyntaxTreeNode::new(*node_type, result.length)));
                }
                result
            }
            Rule::Memoizing(rule) => {
                if let Some(hit) = cx.memo.lookup(id, index) {
                    return hit;
                }
                let mut result = self.apply(*rule, index, cx);
                if let Some(node) = result.node.as_mut() {
                    SyntaxTreeNode::freeze(node);
                }
                if result.examined_length > 0 {
                    cx.memo.store(result.clone(), id, index);
                }
                result
            }
            Rule::PropertyTag { rule, key, value } => {
                let mut result = self.apply(*rule, index, cx);
                if result.succeeded {
                    SyntaxTreeNode::make_mut(result.node_or_fragment())
                        .properties_mut()
                        .insert_erased(*key, Arc::clone(value));
                }
                result
            }
            Rule::Forward(Some(rule)) => self.apply(*rule, index, cx),
            Rule::Forward(None) => ParsingResult::fail(1),
        }
    }

    fn repeat(
        &self,
        rule: RuleId,
        bounds: RepeatBounds,
        index: usize,
        cx: &mut ParseContext<'_>,
    ) -> ParsingResult {
        let mut result = ParsingResult::empty();
        let mut count = 0;
        while bounds.max.is_none_or(|max| count < max) {
            let child = self.apply(rule, index + result.length, cx);
            if !child.succeeded {
                result.examined_length = result
                    .examined_length
                    .max(result.length + child.examined_length);
                break;
            }
            let consumed = child.length;
            result.append_child(child);
            count += 1;
            // A zero-length match makes no progress; repeating it would loop.
            if consumed == 0 {
                break;
            }
        }
        if count < bounds.min {
            ParsingResult::fail(result.examined_length)
        } else {
            result
        }
    }
}

fn match_literal(
    text: &Rope,
    index: usize,
    literal: &str,
    options: CompareOptions,
) -> ParsingResult {
    let mut position = index;
    for expected in literal.chars() {
        match char_at(text, position) {
            Some(actual) if options.matches(expected, actual) => position += actual.len_utf8(),
            _ => return ParsingResult::fail(position - index + 1),
        }
    }
    let length = position - index;
    ParsingResult::success(length, length)
}

fn lookahead(succeeded: bool, examined_length: usize) -> ParsingResult {
    if succeeded {
        ParsingResult::success(0, examined_length)
    } else {
        ParsingResult::fail(examined_length)
    }
}
