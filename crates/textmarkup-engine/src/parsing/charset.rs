//! Character sets for [`Rule::CharacterClass`](super::Rule) and FIRST-sets.

use std::fmt;

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;

/// A set of `char`s stored as sorted, non-overlapping, non-adjacent inclusive
/// ranges.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
}

impl CharSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_chars(chars: &str) -> Self {
        Self::from_ranges(chars.chars().map(|c| (c, c)))
    }

    pub fn range(first: char, last: char) -> Self {
        Self::from_ranges([(first, last)])
    }

    pub fn from_ranges(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut ranges: Vec<(char, char)> = ranges
            .into_iter()
            .filter(|(first, last)| first <= last)
            .collect();
        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (first, last) in ranges {
            match merged.last_mut() {
                Some(prev) if (first as u32) <= next_scalar(prev.1) => {
                    if last > prev.1 {
                        prev.1 = last;
                    }
                }
                _ => merged.push((first, last)),
            }
        }
        Self { ranges: merged }
    }

    pub fn ascii_digits() -> Self {
        Self::range('0', '9')
    }

    pub fn ascii_letters() -> Self {
        Self::from_ranges([('a', 'z'), ('A', 'Z')])
    }

    /// Space and tab.
    pub fn whitespace() -> Self {
        Self::from_chars(" \t")
    }

    pub fn newlines() -> Self {
        Self::from_chars("\n\r")
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(first, last)| {
                if last < c {
                    std::cmp::Ordering::Less
                } else if first > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        Self::from_ranges(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    pub fn intersection(&self, other: &CharSet) -> CharSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_first, a_last) = self.ranges[i];
            let (b_first, b_last) = other.ranges[j];
            let first = a_first.max(b_first);
            let last = a_last.min(b_last);
            if first <= last {
                out.push((first, last));
            }
            if a_last < b_last {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }

    /// Every scalar value not in `self`.
    pub fn complement(&self) -> CharSet {
        let mut out = Vec::new();
        let mut next = 0u32;
        for &(first, last) in &self.ranges {
            push_scalar_range(&mut out, next, first as u32);
            next = last as u32 + 1;
        }
        push_scalar_range(&mut out, next, char::MAX as u32 + 1);
        Self::from_ranges(out)
    }
}

/// Pushes `[from, to)` split around the surrogate gap.
fn push_scalar_range(out: &mut Vec<(char, char)>, from: u32, to: u32) {
    let mut push = |from: u32, to: u32| {
        if from < to
            && let (Some(first), Some(last)) = (char::from_u32(from), char::from_u32(to - 1))
        {
            out.push((first, last));
        }
    };
    if to <= SURROGATE_START || from > SURROGATE_END {
        push(from, to);
    } else {
        push(from, SURROGATE_START);
        push(SURROGATE_END + 1, to);
    }
}

fn next_scalar(c: char) -> u32 {
    match c as u32 + 1 {
        SURROGATE_START => SURROGATE_END + 1,
        n => n,
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for &(first, last) in &self.ranges {
            if first == last {
                write!(f, "{}", first.escape_debug())?;
            } else {
                write!(f, "{}-{}", first.escape_debug(), last.escape_debug())?;
            }
        }
        f.write_str("]")
    }
}

/// The characters a rule could start matching on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirstSet {
    /// No useful bound; any character might start a match.
    Any,
    Chars(CharSet),
}

impl FirstSet {
    pub fn none() -> Self {
        FirstSet::Chars(CharSet::empty())
    }

    pub fn contains(&self, c: char) -> bool {
        match self {
            FirstSet::Any => true,
            FirstSet::Chars(set) => set.contains(c),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, FirstSet::Any)
    }

    pub fn union(&self, other: &FirstSet) -> FirstSet {
        match (self, other) {
            (FirstSet::Chars(a), FirstSet::Chars(b)) => FirstSet::Chars(a.union(b)),
            _ => FirstSet::Any,
        }
    }

    pub fn intersection(&self, other: &FirstSet) -> FirstSet {
        match (self, other) {
            (FirstSet::Any, other) | (other, FirstSet::Any) => other.clone(),
            (FirstSet::Chars(a), FirstSet::Chars(b)) => FirstSet::Chars(a.intersection(b)),
        }
    }
}
