use std::ops::Range;

use serde::Serialize;

/// How one edit changed the rendered text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextChange {
    /// Rendered range that was replaced, in coordinates from before the edit.
    pub old_range: Range<usize>,
    /// Net change in rendered length.
    pub change_in_length: isize,
    /// Rendered range, after the edit, whose content or attributes changed.
    pub changed_attributes_range: Range<usize>,
}

impl TextChange {
    /// `old_range` in coordinates from after the edit.
    pub fn new_range(&self) -> Range<usize> {
        let end = self
            .old_range
            .end
            .saturating_add_signed(self.change_in_length)
            .max(self.old_range.start);
        self.old_range.start..end
    }
}

/// Receives every [`TextChange`] synchronously, after the projection has been
/// updated.
pub trait ChangeDelegate {
    fn text_changed(&mut self, change: &TextChange);
}

impl<F: FnMut(&TextChange)> ChangeDelegate for F {
    fn text_changed(&mut self, change: &TextChange) {
        self(change)
    }
}

/// Result of applying a command
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    pub change: TextChange,
    pub new_selection: Range<usize>,
    pub version: u64,
}
