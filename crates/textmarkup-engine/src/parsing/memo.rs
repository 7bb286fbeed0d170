//! Position × rule cache for packrat parsing.

use std::ops::Range;

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::result::ParsingResult;
use super::rules::RuleId;

#[derive(Clone, Debug, Default)]
struct Column {
    entries: FxHashMap<RuleId, ParsingResult>,
    /// Largest `examined_length` of any entry in this column.
    max_examined: usize,
}

impl Column {
    fn recompute_max(&mut self) {
        self.max_examined = self
            .entries
            .values()
            .map(|result| result.examined_length)
            .max()
            .unwrap_or(0);
    }
}

/// Hit/miss counters plus current table occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoStatistics {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// One column per text position, `0..=len`, each mapping rule identity to the
/// last result computed there.
///
/// An entry stays valid as long as no edit touches
/// `[index, index + examined_length)`.
#[derive(Clone, Debug)]
pub struct MemoizationTable {
    columns: Vec<Column>,
    hits: u64,
    misses: u64,
}

impl MemoizationTable {
    /// Creates an empty table for a buffer of `text_len` bytes.
    pub fn new(text_len: usize) -> Self {
        Self {
            columns: vec![Column::default(); text_len + 1],
            hits: 0,
            misses: 0,
        }
    }

    /// Number of columns; always the buffer length plus one.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn lookup(&mut self, rule: RuleId, index: usize) -> Option<ParsingResult> {
        let found = self
            .columns
            .get(index)
            .and_then(|column| column.entries.get(&rule))
            .cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Whether an entry exists, without touching the counters.
    pub fn contains(&self, rule: RuleId, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|column| column.entries.contains_key(&rule))
    }

    pub fn store(&mut self, result: ParsingResult, rule: RuleId, index: usize) {
        debug_assert!(
            result.examined_length > 0,
            "memoized result for {rule} at {index} examined nothing"
        );
        debug_assert!(result.examined_length >= result.length);
        debug_assert!(
            index < self.columns.len(),
            "memo store at {index} past the end of the table"
        );
        let Some(column) = self.columns.get_mut(index) else {
            return;
        };
        column.max_examined = column.max_examined.max(result.examined_length);
        column.entries.insert(rule, result);
    }

    /// Adjusts the table for `original` being replaced by
    /// `replacement_length` bytes.
    ///
    /// Columns inside the replaced span are dropped and replaced by empty
    /// ones. Columns to the left lose every entry whose examined range reaches
    /// the edit. Columns to the right keep their entries and simply move.
    pub fn apply_edit(&mut self, original: Range<usize>, replacement_length: usize) {
        let start = original.start;
        let end = original.end.min(self.columns.len().saturating_sub(1));
        debug_assert!(start <= end, "edit range {original:?} is inverted");
        if start == end && replacement_length == 0 {
            return;
        }

        self.columns.splice(
            start..end,
            std::iter::repeat_with(Column::default).take(replacement_length),
        );

        let mut cleared = 0usize;
        for (index, column) in self.columns[..start].iter_mut().enumerate() {
            if index + column.max_examined <= start {
                continue;
            }
            let before = column.entries.len();
            column
                .entries
                .retain(|_, result| index + result.examined_length <= start);
            cleared += before - column.entries.len();
            column.recompute_max();
        }
        log::debug!(
            "memo edit {original:?} -> {replacement_length} bytes: cleared {cleared} entries left of the edit"
        );
    }

    /// Drops every entry, keeping the column count.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.entries.clear();
            column.max_examined = 0;
        }
    }

    /// Drops every entry and resizes for a buffer of `text_len` bytes.
    pub fn reset(&mut self, text_len: usize) {
        self.columns.clear();
        self.columns.resize_with(text_len + 1, Column::default);
    }

    pub fn entry_count(&self) -> usize {
        self.columns.iter().map(|column| column.entries.len()).sum()
    }

    pub fn statistics(&self) -> MemoStatistics {
        MemoStatistics {
            hits: self.hits,
            misses: self.misses,
            entries: self.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rule(index: usize) -> RuleId {
        RuleId::from_index(index)
    }

    #[test]
    fn lookup_counts_hits_and_misses() {
        let mut table = MemoizationTable::new(3);
        assert!(table.lookup(rule(0), 1).is_none());
        table.store(ParsingResult::success(2, 2), rule(0), 1);
        assert_eq!(table.lookup(rule(0), 1), Some(ParsingResult::success(2, 2)));
        let stats = table.statistics();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    // "aaXbb", deleting the X at index 2.
    #[test]
    fn deleting_clears_only_entries_reaching_the_edit() {
        let mut table = MemoizationTable::new(5);
        table.store(ParsingResult::fail(3), rule(0), 0);
        table.store(ParsingResult::success(1, 1), rule(1), 0);
        table.store(ParsingResult::success(2, 2), rule(2), 3);

        table.apply_edit(2..3, 0);

        assert_eq!(table.column_count(), 5);
        assert!(!table.contains(rule(0), 0));
        assert!(table.contains(rule(1), 0));
        // The entry at old index 3 now lives at index 2.
        assert!(table.contains(rule(2), 2));
        assert!(!table.contains(rule(2), 3));
    }

    #[test]
    fn inserting_adds_empty_columns_and_clears_reaching_entries() {
        let mut table = MemoizationTable::new(4);
        table.store(ParsingResult::success(2, 3), rule(0), 0);
        table.store(ParsingResult::success(1, 1), rule(1), 0);
        table.store(ParsingResult::success(1, 1), rule(2), 2);

        table.apply_edit(2..2, 3);

        assert_eq!(table.column_count(), 8);
        assert!(!table.contains(rule(0), 0));
        assert!(table.contains(rule(1), 0));
        assert!(table.contains(rule(2), 5));
        for index in 2..5 {
            assert!(!table.contains(rule(2), index));
        }
    }

    #[test]
    fn replacement_clears_the_replaced_columns() {
        let mut table = MemoizationTable::new(6);
        table.store(ParsingResult::success(1, 1), rule(0), 2);
        table.store(ParsingResult::success(1, 1), rule(0), 3);
        table.store(ParsingResult::success(1, 1), rule(0), 4);

        table.apply_edit(2..4, 2);

        assert!(!table.contains(rule(0), 2));
        assert!(!table.contains(rule(0), 3));
        assert!(table.contains(rule(0), 4));
    }

    #[test]
    fn entry_ending_exactly_at_edit_survives() {
        let mut table = MemoizationTable::new(4);
        table.store(ParsingResult::success(2, 2), rule(0), 0);
        table.apply_edit(2..3, 1);
        assert!(table.contains(rule(0), 0));
    }

    #[test]
    fn appending_at_end_clears_entries_that_saw_end_of_input() {
        let mut table = MemoizationTable::new(2);
        // Looked one past the last byte and hit the end.
        table.store(ParsingResult::fail(3), rule(0), 0);
        table.apply_edit(2..2, 1);
        assert_eq!(table.column_count(), 4);
        assert!(!table.contains(rule(0), 0));
    }
}
