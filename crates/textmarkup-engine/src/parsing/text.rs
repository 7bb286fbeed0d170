//! Small helpers over the `xi_rope::Rope` text storage.

use std::ops::Range;

use xi_rope::Rope;

/// The char starting at byte `offset`, or `None` at (or past) the end.
///
/// `offset` must lie on a char boundary.
pub fn char_at(rope: &Rope, offset: usize) -> Option<char> {
    if offset >= rope.len() {
        return None;
    }
    rope.iter_chunks(offset..rope.len())
        .find_map(|chunk| chunk.chars().next())
}

/// Whether `offset` can start or end an edit.
pub fn is_boundary(rope: &Rope, offset: usize) -> bool {
    offset <= rope.len() && rope.is_codepoint_boundary(offset)
}

/// Copies `range` out of the rope.
pub fn slice_to_string(rope: &Rope, range: Range<usize>) -> String {
    rope.slice_to_cow(range).into_owned()
}

/// Text for `range`, truncated to about `max` bytes with a "..." suffix.
///
/// Used for human-readable tree dumps.
pub fn preview(rope: &Rope, range: Range<usize>, max: usize) -> String {
    let mut s = slice_to_string(rope, range);
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}
