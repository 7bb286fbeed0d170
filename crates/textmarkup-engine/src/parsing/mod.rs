//! # Incremental packrat parsing
//!
//! A grammar is a graph of [`Rule`]s built with a [`GrammarBuilder`]. Rules are
//! applied top-down with ordered choice; results of [`Rule::Memoizing`] rules
//! are cached per `(rule, position)` in a [`MemoizationTable`].
//!
//! ## Incremental reparse
//!
//! Every [`ParsingResult`] records how far past its start the rule looked
//! (`examined_length`), whether it matched or not. When the text changes,
//! [`MemoizationTable::apply_edit`] drops only the entries whose examined
//! range reaches the edit and shifts the rest, so
//! [`ParseBuffer::replace_characters`] reuses most of the previous parse.
//!
//! ## Trees
//!
//! Results carry `Arc<SyntaxTreeNode>`s. Nodes stored in the memo table are
//! frozen and shared; changes go through [`SyntaxTreeNode::make_mut`], which
//! copies frozen nodes first.
//!
//! ## Modules
//!
//! - **`node`**, **`result`**: tree nodes and the value every rule returns
//! - **`rules`**, **`grammar`**, **`evaluate`**: rule variants, graph
//!   construction with FIRST-set analysis, and rule application
//! - **`memo`**: the memoization table
//! - **`buffer`**: [`ParseBuffer`], text plus incremental reparse
//! - **`trace`**: per-rule counters and the optional rule trace
//! - **`snapshot`**: tree dumps and invariant checks

pub mod buffer;
pub mod charset;
mod evaluate;
pub mod grammar;
pub mod memo;
pub mod node;
pub mod result;
pub mod rules;
pub mod snapshot;
pub mod text;
pub mod trace;

pub use buffer::{ParseBuffer, ParseError, PathEntry};
pub use charset::{CharSet, FirstSet};
pub use grammar::{Grammar, GrammarBuilder, GrammarError};
pub use memo::{MemoStatistics, MemoizationTable};
pub use node::{NodeType, PropertyBag, PropertyKey, SyntaxTreeNode};
pub use result::ParsingResult;
pub use rules::{CompareOptions, RepeatBounds, Rule, RuleId};
pub use snapshot::{TreeSnap, format_tree};
pub use trace::{RuleStatistics, TraceBuffer, TraceEntry, TraceEvent};

#[cfg(test)]
mod tests;
