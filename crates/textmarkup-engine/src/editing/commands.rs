use std::ops::Range;

/// Edits in rendered coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { range: Range<usize> },
    ReplaceRange { range: Range<usize>, text: String },
}

impl Cmd {
    /// The rendered range the command replaces and the replacement text.
    pub(crate) fn compile(&self) -> (Range<usize>, &str) {
        match self {
            Cmd::InsertText { at, text } => (*at..*at, text),
            Cmd::DeleteRange { range } => (range.clone(), ""),
            Cmd::ReplaceRange { range, text } => (range.clone(), text),
        }
    }
}

/// Moves `selection` across an edit of rendered range `edited`.
///
/// Selections entirely after the edit shift by `change_in_length`, selections
/// entirely before it stay put, and anything overlapping collapses to
/// `caret`, the rendered position just past the inserted text.
pub(crate) fn transform_selection(
    selection: &Range<usize>,
    edited: &Range<usize>,
    change_in_length: isize,
    caret: usize,
) -> Range<usize> {
    if edited.end <= selection.start {
        selection.start.saturating_add_signed(change_in_length)
            ..selection.end.saturating_add_signed(change_in_length)
    } else if edited.start >= selection.end {
        selection.clone()
    } else {
        caret..caret
    }
}
