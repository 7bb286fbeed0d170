//! Rule variants of the combinator library.
//!
//! Rules are plain data stored in a [`Grammar`](super::Grammar) arena and
//! addressed by [`RuleId`]. Evaluation lives in `evaluate.rs`; FIRST-set
//! analysis in `grammar.rs`.

use std::fmt;
use std::ops::{RangeFrom, RangeFull, RangeInclusive, RangeToInclusive};

use super::charset::CharSet;
use super::node::{NodeType, PropertyValue};

/// Identity of a rule within its grammar. Memoization is keyed on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a [`Rule::Literal`] compares against the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub case_insensitive: bool,
}

impl CompareOptions {
    pub const EXACT: CompareOptions = CompareOptions {
        case_insensitive: false,
    };
    pub const CASE_INSENSITIVE: CompareOptions = CompareOptions {
        case_insensitive: true,
    };

    pub(crate) fn matches(self, expected: char, actual: char) -> bool {
        expected == actual
            || (self.case_insensitive && expected.to_lowercase().eq(actual.to_lowercase()))
    }
}

/// Allowed repetition counts for [`Rule::Repeating`]; `max: None` is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatBounds {
    pub min: usize,
    pub max: Option<usize>,
}

impl RepeatBounds {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.max.is_none_or(|max| max > 0 && max >= self.min)
    }
}

impl From<RangeFrom<usize>> for RepeatBounds {
    fn from(range: RangeFrom<usize>) -> Self {
        Self {
            min: range.start,
            max: None,
        }
    }
}

impl From<RangeInclusive<usize>> for RepeatBounds {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self {
            min: *range.start(),
            max: Some(*range.end()),
        }
    }
}

impl From<RangeToInclusive<usize>> for RepeatBounds {
    fn from(range: RangeToInclusive<usize>) -> Self {
        Self {
            min: 0,
            max: Some(range.end),
        }
    }
}

impl From<RangeFull> for RepeatBounds {
    fn from(_: RangeFull) -> Self {
        Self { min: 0, max: None }
    }
}

pub enum Rule {
    /// Matches `text` as a prefix of the buffer at the current index.
    Literal {
        text: String,
        options: CompareOptions,
    },
    /// One character from the set. Produces no node.
    CharacterClass(CharSet),
    /// Any single character.
    Dot,
    InOrder(Vec<RuleId>),
    /// Ordered choice; first success wins.
    Choice(Vec<RuleId>),
    Repeating {
        rule: RuleId,
        bounds: RepeatBounds,
    },
    ZeroOrOne(RuleId),
    /// Positive lookahead.
    Assertion(RuleId),
    /// Negative lookahead.
    NotAssertion(RuleId),
    /// Types the inner result's node.
    Wrapping {
        rule: RuleId,
        node_type: NodeType,
    },
    /// Replaces the inner result's structure with one opaque node.
    Absorbing {
        rule: RuleId,
        node_type: NodeType,
    },
    Memoizing(RuleId),
    PropertyTag {
        rule: RuleId,
        key: &'static str,
        value: PropertyValue,
    },
    /// A declared slot, filled in by `GrammarBuilder::define`.
    Forward(Option<RuleId>),
}

impl Rule {
    /// Rules referenced by this one.
    pub fn references(&self) -> Vec<RuleId> {
        match self {
            Rule::Literal { .. } | Rule::CharacterClass(_) | Rule::Dot | Rule::Forward(None) => {
                Vec::new()
            }
            Rule::InOrder(rules) | Rule::Choice(rules) => rules.clone(),
            Rule::Repeating { rule, .. }
            | Rule::Wrapping { rule, .. }
            | Rule::Absorbing { rule, .. }
            | Rule::PropertyTag { rule, .. }
            | Rule::ZeroOrOne(rule)
            | Rule::Assertion(rule)
            | Rule::NotAssertion(rule)
            | Rule::Memoizing(rule)
            | Rule::Forward(Some(rule)) => vec![*rule],
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Literal { text, options } => {
                if options.case_insensitive {
                    write!(f, "Literal({text:?}, case insensitive)")
                } else {
                    write!(f, "Literal({text:?})")
                }
            }
            Rule::CharacterClass(set) => write!(f, "CharacterClass({set:?})"),
            Rule::Dot => f.write_str("Dot"),
            Rule::InOrder(rules) => write!(f, "InOrder({rules:?})"),
            Rule::Choice(rules) => write!(f, "Choice({rules:?})"),
            Rule::Repeating { rule, bounds } => match bounds.max {
                Some(max) => write!(f, "Repeating({rule}, {}...{max})", bounds.min),
                None => write!(f, "Repeating({rule}, {}...)", bounds.min),
            },
            Rule::ZeroOrOne(rule) => write!(f, "ZeroOrOne({rule})"),
            Rule::Assertion(rule) => write!(f, "Assertion({rule})"),
            Rule::NotAssertion(rule) => write!(f, "NotAssertion({rule})"),
            Rule::Wrapping { rule, node_type } => write!(f, "Wrapping({rule}, {node_type})"),
            Rule::Absorbing { rule, node_type } => write!(f, "Absorbing({rule}, {node_type})"),
            Rule::Memoizing(rule) => write!(f, "Memoizing({rule})"),
            Rule::PropertyTag { rule, key, .. } => write!(f, "PropertyTag({rule}, {key})"),
            Rule::Forward(Some(rule)) => write!(f, "Forward({rule})"),
            Rule::Forward(None) => f.write_str("Forward(undefined)"),
        }
    }
}
