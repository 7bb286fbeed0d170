//! Parse diagnostics: per-rule counters and the optional rule trace.
//!
//! Neither affects parse output. Counters are always kept; the trace is only
//! recorded when the grammar was built with tracing enabled.

use std::fmt;

use serde::Serialize;

use super::rules::RuleId;

/// How often a rule was applied and how often it succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleStatistics {
    pub total_applications: u64,
    pub successes: u64,
}

impl RuleStatistics {
    pub fn failures(&self) -> u64 {
        self.total_applications - self.successes
    }
}

/// Counters indexed by [`RuleId`].
#[derive(Clone, Debug, Default)]
pub(crate) struct StatisticsTable {
    rules: Vec<RuleStatistics>,
}

impl StatisticsTable {
    pub(crate) fn new(rule_count: usize) -> Self {
        Self {
            rules: vec![RuleStatistics::default(); rule_count],
        }
    }

    pub(crate) fn record(&mut self, rule: RuleId, succeeded: bool) {
        if let Some(stats) = self.rules.get_mut(rule.index()) {
            stats.total_applications += 1;
            if succeeded {
                stats.successes += 1;
            }
        }
    }

    pub(crate) fn get(&self, rule: RuleId) -> RuleStatistics {
        self.rules.get(rule.index()).copied().unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TraceEvent {
    Enter,
    Exit { succeeded: bool, length: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub rule: String,
    pub index: usize,
    pub depth: usize,
    pub event: TraceEvent,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = self.depth * 2;
        match self.event {
            TraceEvent::Enter => write!(f, "{:indent$}> {} @{}", "", self.rule, self.index),
            TraceEvent::Exit { succeeded: true, length } => {
                write!(f, "{:indent$}< {} @{} +{length}", "", self.rule, self.index)
            }
            TraceEvent::Exit { succeeded: false, .. } => {
                write!(f, "{:indent$}< {} @{} failed", "", self.rule, self.index)
            }
        }
    }
}

/// Enter/exit log of named rules, owned by the parse buffer.
#[derive(Clone, Debug, Default)]
pub struct TraceBuffer {
    entries: Vec<TraceEntry>,
    depth: usize,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&mut self, rule: &str, index: usize) {
        log::trace!("{:indent$}> {rule} @{index}", "", indent = self.depth * 2);
        self.entries.push(TraceEntry {
            rule: rule.to_string(),
            index,
            depth: self.depth,
            event: TraceEvent::Enter,
        });
        self.depth += 1;
    }

    pub(crate) fn exit(&mut self, rule: &str, index: usize, succeeded: bool, length: usize) {
        self.depth = self.depth.saturating_sub(1);
        log::trace!(
            "{:indent$}< {rule} @{index} {}",
            "",
            if succeeded { "ok" } else { "failed" },
            indent = self.depth * 2
        );
        self.entries.push(TraceEntry {
            rule: rule.to_string(),
            index,
            depth: self.depth,
            event: TraceEvent::Exit { succeeded, length },
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.depth = 0;
    }
}
