//! Rule graph construction.
//!
//! A [`GrammarBuilder`] hands out [`RuleId`]s for every rule it creates.
//! Recursive grammars declare a forward slot first and fill it in once the
//! rules that refer to it exist:
//!
//! ```
//! use textmarkup_engine::parsing::{CharSet, GrammarBuilder, NodeType};
//!
//! const GROUP: NodeType = NodeType::new("group");
//!
//! let mut b = GrammarBuilder::new();
//! let expr = b.declare("expr");
//! let open = b.literal("(");
//! let close = b.literal(")");
//! let nested = b.in_order([open, expr, close]);
//! let group = b.wrapping(nested, GROUP);
//! let digit = b.char_class(CharSet::ascii_digits());
//! let body = b.choice([group, digit]);
//! b.define(expr, body).unwrap();
//! let grammar = b.build(expr).unwrap();
//! assert!(grammar.possible_opening_characters(expr).contains('('));
//! ```
//!
//! `build` validates the graph and computes, once per rule, what the rule can
//! start with. [`Rule::Choice`] uses this to skip alternatives that cannot
//! match the next character.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use super::charset::{CharSet, FirstSet};
use super::node::{NodeType, PropertyKey};
use super::rules::{CompareOptions, RepeatBounds, Rule, RuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("rule `{0}` was declared but never defined")]
    UndefinedRule(String),
    #[error("forward rule `{0}` is already defined")]
    AlreadyDefined(String),
    #[error("rule {0} is not a forward declaration")]
    NotDeclared(RuleId),
    #[error("literal {0} is empty")]
    EmptyLiteral(RuleId),
    #[error("sequence {0} has no rules")]
    EmptySequence(RuleId),
    #[error("choice {0} has no alternatives")]
    EmptyChoice(RuleId),
    #[error("repetition {0} has invalid bounds")]
    InvalidBounds(RuleId),
    #[error("rule {0} does not belong to this grammar")]
    UnknownRule(RuleId),
}

/// What a rule can start with.
///
/// `first` holds the characters a non-empty match can begin with. A rule that
/// can succeed without consuming is `nullable`; `guard` then bounds the
/// character that may follow such an empty match (lookahead constrains it).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Analysis {
    pub(crate) first: FirstSet,
    pub(crate) nullable: bool,
    pub(crate) guard: FirstSet,
    /// Characters on which the rule may succeed at all.
    pub(crate) possible: FirstSet,
}

impl Analysis {
    fn new(first: FirstSet, nullable: bool, guard: FirstSet) -> Self {
        let guard = if nullable { guard } else { FirstSet::none() };
        let possible = if nullable {
            first.union(&guard)
        } else {
            first.clone()
        };
        Self {
            first,
            nullable,
            guard,
            possible,
        }
    }

    fn consuming(first: FirstSet) -> Self {
        Self::new(first, false, FirstSet::none())
    }

    fn unbounded() -> Self {
        Self::new(FirstSet::Any, true, FirstSet::Any)
    }
}

#[derive(Default)]
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    names: Vec<Option<String>>,
    tracing: bool,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a grammar that records enter/exit events for named rules.
    pub fn with_tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn add(&mut self, rule: Rule) -> RuleId {
        let id = RuleId::from_index(self.rules.len());
        self.rules.push(rule);
        self.names.push(None);
        id
    }

    pub fn literal(&mut self, text: impl Into<String>) -> RuleId {
        self.literal_with(text, CompareOptions::EXACT)
    }

    pub fn literal_with(&mut self, text: impl Into<String>, options: CompareOptions) -> RuleId {
        self.add(Rule::Literal {
            text: text.into(),
            options,
        })
    }

    pub fn char_class(&mut self, set: CharSet) -> RuleId {
        self.add(Rule::CharacterClass(set))
    }

    pub fn dot(&mut self) -> RuleId {
        self.add(Rule::Dot)
    }

    pub fn in_order(&mut self, rules: impl IntoIterator<Item = RuleId>) -> RuleId {
        self.add(Rule::InOrder(rules.into_iter().collect()))
    }

    pub fn choice(&mut self, rules: impl IntoIterator<Item = RuleId>) -> RuleId {
        self.add(Rule::Choice(rules.into_iter().collect()))
    }

    pub fn repeating(&mut self, rule: RuleId, bounds: impl Into<RepeatBounds>) -> RuleId {
        self.add(Rule::Repeating {
            rule,
            bounds: bounds.into(),
        })
    }

    pub fn zero_or_one(&mut self, rule: RuleId) -> RuleId {
        self.add(Rule::ZeroOrOne(rule))
    }

    pub fn assertion(&mut self, rule: RuleId) -> RuleId {
        self.add(Rule::Assertion(rule))
    }

    pub fn not_assertion(&mut self, rule: RuleId) -> RuleId {
        self.add(Rule::NotAssertion(rule))
    }

    pub fn wrapping(&mut self, rule: RuleId, node_type: NodeType) -> RuleId {
        self.add(Rule::Wrapping { rule, node_type })
    }

    pub fn absorbing(&mut self, rule: RuleId, node_type: NodeType) -> RuleId {
        self.add(Rule::Absorbing { rule, node_type })
    }

    pub fn memoizing(&mut self, rule: RuleId) -> RuleId {
        self.add(Rule::Memoizing(rule))
    }

    pub fn property_tag<T: Any + Send + Sync>(
        &mut self,
        rule: RuleId,
        key: &PropertyKey<T>,
        value: T,
    ) -> RuleId {
        self.add(Rule::PropertyTag {
            rule,
            key: key.name(),
            value: Arc::new(value),
        })
    }

    /// Creates an empty forward slot to be filled by [`define`](Self::define).
    pub fn declare(&mut self, name: &str) -> RuleId {
        let id = self.add(Rule::Forward(None));
        self.names[id.index()] = Some(name.to_string());
        id
    }

    pub fn define(&mut self, slot: RuleId, rule: RuleId) -> Result<(), GrammarError> {
        let name = self.display_name(slot);
        match self.rules.get_mut(slot.index()) {
            Some(Rule::Forward(target @ None)) => {
                *target = Some(rule);
                Ok(())
            }
            Some(Rule::Forward(Some(_))) => Err(GrammarError::AlreadyDefined(name)),
            Some(_) => Err(GrammarError::NotDeclared(slot)),
            None => Err(GrammarError::UnknownRule(slot)),
        }
    }

    /// Names `rule` for tracing and lookup.
    pub fn named(&mut self, rule: RuleId, name: &str) -> RuleId {
        if let Some(slot) = self.names.get_mut(rule.index()) {
            *slot = Some(name.to_string());
        }
        rule
    }

    fn display_name(&self, id: RuleId) -> String {
        self.names
            .get(id.index())
            .cloned()
            .flatten()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn build(self, start: RuleId) -> Result<Grammar, GrammarError> {
        self.validate(start)?;

        let mut slots = vec![Slot::Pending; self.rules.len()];
        let analysis = (0..self.rules.len())
            .map(|index| analyze(&self.rules, RuleId::from_index(index), &mut slots))
            .collect();

        log::debug!(
            "built grammar with {} rules (start {}, tracing {})",
            self.rules.len(),
            self.display_name(start),
            self.tracing
        );

        Ok(Grammar {
            rules: self.rules,
            names: self.names,
            analysis,
            start,
            tracing: self.tracing,
        })
    }

    fn validate(&self, start: RuleId) -> Result<(), GrammarError> {
        let count = self.rules.len();
        if start.index() >= count {
            return Err(GrammarError::UnknownRule(start));
        }
        for (index, rule) in self.rules.iter().enumerate() {
            let id = RuleId::from_index(index);
            match rule {
                Rule::Literal { text, .. } if text.is_empty() => {
                    return Err(GrammarError::EmptyLiteral(id));
                }
                Rule::InOrder(rules) if rules.is_empty() => {
                    return Err(GrammarError::EmptySequence(id));
                }
                Rule::Choice(rules) if rules.is_empty() => {
                    return Err(GrammarError::EmptyChoice(id));
                }
                Rule::Repeating { bounds, .. } if !bounds.is_valid() => {
                    return Err(GrammarError::InvalidBounds(id));
                }
                Rule::Forward(None) => {
                    return Err(GrammarError::UndefinedRule(self.display_name(id)));
                }
                _ => {}
            }
            if let Some(unknown) = rule.references().into_iter().find(|r| r.index() >= count) {
                return Err(GrammarError::UnknownRule(unknown));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
enum Slot {
    Pending,
    Active,
    Done(Analysis),
}

/// Computes the analysis of `id`, memoized in `slots`. Re-entering a rule
/// whose analysis is still in progress means the graph is cyclic there; the
/// answer for that path is "anything, possibly empty", which is always safe.
fn analyze(rules: &[Rule], id: RuleId, slots: &mut [Slot]) -> Analysis {
    match &slots[id.index()] {
        Slot::Done(analysis) => return analysis.clone(),
        Slot::Active => return Analysis::unbounded(),
        Slot::Pending => {}
    }
    slots[id.index()] = Slot::Active;

    let analysis = match &rules[id.index()] {
        Rule::Literal { text, options } => match text.chars().next() {
            Some(c) => Analysis::consuming(literal_first(c, *options)),
            None => Analysis::unbounded(),
        },
        Rule::CharacterClass(set) => Analysis::consuming(FirstSet::Chars(set.clone())),
        Rule::Dot => Analysis::consuming(FirstSet::Any),
        Rule::InOrder(sequence) => {
            let mut first = FirstSet::none();
            let mut constraint = FirstSet::Any;
            let mut nullable = true;
            for &rule in sequence {
                let inner = analyze(rules, rule, slots);
                first = first.union(&inner.first.intersection(&constraint));
                if !inner.nullable {
                    nullable = false;
                    break;
                }
                constraint = constraint.intersection(&inner.guard);
            }
            Analysis::new(first, nullable, constraint)
        }
        Rule::Choice(alternatives) => {
            let mut first = FirstSet::none();
            let mut guard = FirstSet::none();
            let mut nullable = false;
            for &rule in alternatives {
                let inner = analyze(rules, rule, slots);
                first = first.union(&inner.first);
                if inner.nullable {
                    nullable = true;
                    guard = guard.union(&inner.guard);
                }
            }
            Analysis::new(first, nullable, guard)
        }
        Rule::Repeating { rule, bounds } => {
            let inner = analyze(rules, *rule, slots);
            if bounds.min == 0 {
                Analysis::new(inner.first, true, FirstSet::Any)
            } else {
                Analysis::new(inner.first, inner.nullable, inner.guard)
            }
        }
        Rule::ZeroOrOne(rule) => {
            let inner = analyze(rules, *rule, slots);
            Analysis::new(inner.first, true, FirstSet::Any)
        }
        Rule::Assertion(rule) => {
            let inner = analyze(rules, *rule, slots);
            Analysis::new(FirstSet::none(), true, inner.possible)
        }
        // The inner rule failing says nothing about the next character.
        Rule::NotAssertion(_) => Analysis::new(FirstSet::none(), true, FirstSet::Any),
        Rule::Wrapping { rule, .. }
        | Rule::Absorbing { rule, .. }
        | Rule::PropertyTag { rule, .. }
        | Rule::Memoizing(rule)
        | Rule::Forward(Some(rule)) => analyze(rules, *rule, slots),
        Rule::Forward(None) => Analysis::unbounded(),
    };

    slots[id.index()] = Slot::Done(analysis.clone());
    analysis
}

fn literal_first(c: char, options: CompareOptions) -> FirstSet {
    if !options.case_insensitive {
        return FirstSet::Chars(CharSet::from_ranges([(c, c)]));
    }
    if c.is_ascii_alphabetic() {
        let mut chars = vec![c.to_ascii_lowercase(), c.to_ascii_uppercase()];
        // KELVIN SIGN lowercases to 'k'.
        if c.eq_ignore_ascii_case(&'k') {
            chars.push('\u{212A}');
        }
        return FirstSet::Chars(CharSet::from_ranges(chars.into_iter().map(|c| (c, c))));
    }
    let uncased =
        c.to_lowercase().eq(std::iter::once(c)) && c.to_uppercase().eq(std::iter::once(c));
    if c.is_ascii() || uncased {
        FirstSet::Chars(CharSet::from_ranges([(c, c)]))
    } else {
        FirstSet::Any
    }
}

/// A validated rule graph with a designated start rule.
#[derive(Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    names: Vec<Option<String>>,
    analysis: Vec<Analysis>,
    start: RuleId,
    tracing: bool,
}

impl Grammar {
    pub fn start(&self) -> RuleId {
        self.start
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Every rule in the grammar, in construction order.
    pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> + use<> {
        (0..self.rules.len()).map(RuleId::from_index)
    }

    pub fn name(&self, id: RuleId) -> Option<&str> {
        self.names.get(id.index())?.as_deref()
    }

    /// Looks up a rule by the name given to `declare` or `named`.
    pub fn find(&self, name: &str) -> Option<RuleId> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .map(RuleId::from_index)
    }

    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// Characters on which `rule` can succeed. `Any` when no useful bound is
    /// known. Unknown ids also report `Any`.
    pub fn possible_opening_characters(&self, rule: RuleId) -> FirstSet {
        self.analysis
            .get(rule.index())
            .map_or(FirstSet::Any, |analysis| analysis.possible.clone())
    }

    /// Whether `rule` can succeed without consuming input.
    pub fn is_nullable(&self, rule: RuleId) -> bool {
        self.analysis
            .get(rule.index())
            .is_none_or(|analysis| analysis.nullable)
    }

    pub(crate) fn analysis(&self, rule: RuleId) -> &Analysis {
        &self.analysis[rule.index()]
    }
}
