//! The raw ↔ rendered span map.
//!
//! Rendering a tree produces an ordered list of [`RenderSpan`]s covering the
//! raw text. A span either passes its raw text through unchanged or replaces
//! it with literal content; replaced spans are atomic for range translation.
//! Spans are contiguous in both coordinate spaces, so concatenating their
//! rendered content yields the rendered text.

use std::ops::Range;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use xi_rope::Rope;

use super::attributes::{AttributeSet, PARSE_ERROR};
use super::formatting::Formatting;
use crate::parsing::SyntaxTreeNode;

#[derive(Clone, Debug, PartialEq)]
pub struct RenderSpan {
    pub raw: Range<usize>,
    pub rendered_start: usize,
    pub rendered_len: usize,
    /// Literal rendered content; `None` for pass-through text.
    pub replacement: Option<Arc<str>>,
    pub attributes: Arc<AttributeSet>,
}

impl RenderSpan {
    pub fn rendered(&self) -> Range<usize> {
        self.rendered_start..self.rendered_end()
    }

    pub fn rendered_end(&self) -> usize {
        self.rendered_start + self.rendered_len
    }

    pub fn is_replacement(&self) -> bool {
        self.replacement.is_some()
    }

    fn shifted(&self, raw_by: isize, rendered_by: isize) -> RenderSpan {
        RenderSpan {
            raw: shift(self.raw.start, raw_by)..shift(self.raw.end, raw_by),
            rendered_start: shift(self.rendered_start, rendered_by),
            rendered_len: self.rendered_len,
            replacement: self.replacement.clone(),
            attributes: Arc::clone(&self.attributes),
        }
    }
}

fn shift(offset: usize, by: isize) -> usize {
    offset.saturating_add_signed(by)
}

struct CacheEntry {
    node: Arc<SyntaxTreeNode>,
    inherited: Arc<AttributeSet>,
    /// Spans relative to the node's raw and rendered start.
    spans: Vec<RenderSpan>,
    generation: u64,
}

/// Rendered spans of frozen subtrees from the previous refresh, keyed by node
/// identity. Entries not used by the latest refresh are dropped.
#[derive(Default)]
pub(crate) struct RenderCache {
    entries: FxHashMap<usize, CacheEntry>,
    generation: u64,
    hits: u64,
}

impl RenderCache {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits
    }
}

/// Renders `root` (covering a prefix of `raw`) into spans. Raw text past the
/// end of the tree is passed through with the default attributes plus
/// `parse_error`.
pub(crate) fn render(
    root: Option<&Arc<SyntaxTreeNode>>,
    raw: &Rope,
    formatting: &Formatting,
    cache: &mut RenderCache,
) -> Vec<RenderSpan> {
    cache.generation += 1;
    let defaults = Arc::new(formatting.defaults().clone());
    let mut renderer = Renderer {
        formatting,
        raw,
        cache,
        spans: Vec::new(),
        rendered_len: 0,
    };
    let parsed = root.map_or(0, |root| root.length());
    if let Some(root) = root {
        renderer.walk(root, 0, &defaults);
    }
    if parsed < raw.len() {
        let attributes = formatting.defaults().clone().with(PARSE_ERROR, true);
        renderer.push(parsed..raw.len(), None, Arc::new(attributes));
    }
    let spans = renderer.spans;

    let generation = cache.generation;
    cache.entries.retain(|_, entry| entry.generation == generation);
    spans
}

struct Renderer<'a> {
    formatting: &'a Formatting,
    raw: &'a Rope,
    cache: &'a mut RenderCache,
    spans: Vec<RenderSpan>,
    rendered_len: usize,
}

impl Renderer<'_> {
    fn walk(
        &mut self,
        node: &Arc<SyntaxTreeNode>,
        raw_start: usize,
        inherited: &Arc<AttributeSet>,
    ) {
        if !node.is_frozen() || node.is_leaf() {
            self.compute(node, raw_start, inherited);
            return;
        }

        let key = Arc::as_ptr(node) as usize;
        if let Some(entry) = self.cache.entries.get_mut(&key)
            && Arc::ptr_eq(&entry.node, node)
            && (Arc::ptr_eq(&entry.inherited, inherited) || entry.inherited == *inherited)
        {
            entry.generation = self.cache.generation;
            self.cache.hits += 1;
            let (raw_by, rendered_by) = (raw_start as isize, self.rendered_len as isize);
            for span in &entry.spans {
                self.spans.push(span.shifted(raw_by, rendered_by));
            }
            self.rendered_len += entry
                .spans
                .iter()
                .map(|span| span.rendered_len)
                .sum::<usize>();
            return;
        }

        let first = self.spans.len();
        let rendered_start = self.rendered_len;
        self.compute(node, raw_start, inherited);
        let (raw_by, rendered_by) = (-(raw_start as isize), -(rendered_start as isize));
        let spans = self.spans[first..]
            .iter()
            .map(|span| span.shifted(raw_by, rendered_by))
            .collect();
        self.cache.entries.insert(
            key,
            CacheEntry {
                node: Arc::clone(node),
                inherited: Arc::clone(inherited),
                spans,
                generation: self.cache.generation,
            },
        );
    }

    fn compute(
        &mut self,
        node: &Arc<SyntaxTreeNode>,
        raw_start: usize,
        inherited: &Arc<AttributeSet>,
    ) {
        let attributes = match self.formatting.formatter(node.kind()) {
            Some(format) => {
                let mut attributes = AttributeSet::clone(inherited);
                format(node, &mut attributes);
                if attributes == **inherited {
                    Arc::clone(inherited)
                } else {
                    Arc::new(attributes)
                }
            }
            None => Arc::clone(inherited),
        };

        let raw = raw_start..raw_start + node.length();
        if let Some(replace) = self.formatting.replacement(node.kind()) {
            let source = self.raw.slice_to_cow(raw.clone());
            if let Some(text) = replace(node, &source) {
                self.push(raw, Some(Arc::from(text)), attributes);
                return;
            }
        }

        if node.is_leaf() {
            self.push(raw, None, attributes);
            return;
        }
        let mut offset = raw_start;
        for child in node.children() {
            self.walk(child, offset, &attributes);
            offset += child.length();
        }
    }

    fn push(
        &mut self,
        raw: Range<usize>,
        replacement: Option<Arc<str>>,
        attributes: Arc<AttributeSet>,
    ) {
        let rendered_len = replacement.as_ref().map_or(raw.len(), |text| text.len());
        if raw.is_empty() && rendered_len == 0 {
            return;
        }
        self.spans.push(RenderSpan {
            raw,
            rendered_start: self.rendered_len,
            rendered_len,
            replacement,
            attributes,
        });
        self.rendered_len += rendered_len;
    }
}

/// Concatenated rendered content of `spans`.
pub(crate) fn rendered_text(spans: &[RenderSpan], raw: &Rope) -> String {
    let mut out = String::new();
    for span in spans {
        match &span.replacement {
            Some(text) => out.push_str(text),
            None => out.push_str(&raw.slice_to_cow(span.raw.clone())),
        }
    }
    out
}

/// Rendered content in `range`. Both ends must fall on char boundaries of
/// the rendered text.
pub(crate) fn rendered_slice(spans: &[RenderSpan], raw: &Rope, range: Range<usize>) -> String {
    let mut out = String::with_capacity(range.len());
    let first = spans.partition_point(|span| span.rendered_end() <= range.start);
    for span in &spans[first..] {
        if span.rendered_start >= range.end {
            break;
        }
        let from = range.start.max(span.rendered_start) - span.rendered_start;
        let to = range.end.min(span.rendered_end()) - span.rendered_start;
        match &span.replacement {
            Some(text) => out.push_str(&text[from..to]),
            None => out.push_str(&raw.slice_to_cow(span.raw.start + from..span.raw.start + to)),
        }
    }
    out
}

/// Rendered position of raw `offset` as the start of a range. Inside a
/// replacement this is the replacement's rendered start.
pub(crate) fn rendered_start_for(
    spans: &[RenderSpan],
    rendered_len: usize,
    offset: usize,
) -> usize {
    let index = spans.partition_point(|span| span.raw.end <= offset);
    match spans.get(index) {
        Some(span) if span.raw.start <= offset => match span.replacement {
            None => span.rendered_start + (offset - span.raw.start),
            Some(_) => span.rendered_start,
        },
        Some(span) => span.rendered_start,
        None => rendered_len,
    }
}

/// Rendered position of raw `offset` as the end of a range. Inside a
/// replacement this is the replacement's rendered end.
pub(crate) fn rendered_end_for(spans: &[RenderSpan], offset: usize) -> usize {
    let index = spans.partition_point(|span| span.raw.start < offset);
    match index.checked_sub(1).and_then(|i| spans.get(i)) {
        Some(span) if offset <= span.raw.end => match span.replacement {
            None => span.rendered_start + (offset - span.raw.start),
            Some(_) => span.rendered_end(),
        },
        Some(span) => span.rendered_end(),
        None => 0,
    }
}

/// Raw position of rendered `offset` as the start of a range. Hidden spans
/// sitting at `offset` are included, so this is the smallest raw offset that
/// renders there.
pub(crate) fn raw_start_for(spans: &[RenderSpan], raw_len: usize, offset: usize) -> usize {
    let index = spans.partition_point(|span| {
        span.rendered_end() < offset || (span.rendered_end() == offset && span.rendered_len > 0)
    });
    match spans.get(index) {
        Some(span) if span.rendered_len == 0 || span.replacement.is_some() => span.raw.start,
        Some(span) => span.raw.start + (offset - span.rendered_start).min(span.raw.len()),
        None => raw_len,
    }
}

/// Raw position of rendered `offset` as the end of a range, including hidden
/// spans sitting at `offset`.
pub(crate) fn raw_end_for(spans: &[RenderSpan], offset: usize) -> usize {
    let index = spans.partition_point(|span| {
        span.rendered_start < offset || (span.rendered_start == offset && span.rendered_len == 0)
    });
    match index.checked_sub(1).and_then(|i| spans.get(i)) {
        Some(span) if span.rendered_len == 0 || span.replacement.is_some() => span.raw.end,
        Some(span) => span.raw.start + (offset - span.rendered_start).min(span.raw.len()),
        None => 0,
    }
}

/// Raw range an edit of non-empty rendered `range` replaces: like
/// [`raw_start_for`]..[`raw_end_for`] but leaving out hidden spans at either
/// end, so deleting the text next to a hidden delimiter keeps the delimiter.
pub(crate) fn raw_edit_range(
    spans: &[RenderSpan],
    raw_len: usize,
    range: Range<usize>,
) -> Range<usize> {
    let first = spans.partition_point(|span| span.rendered_end() <= range.start);
    let start = spans[first..]
        .iter()
        .find(|span| span.rendered_len > 0)
        .map_or(raw_len, |span| match span.replacement {
            None => span.raw.start + (range.start - span.rendered_start),
            Some(_) => span.raw.start,
        });
    let last = spans.partition_point(|span| span.rendered_start < range.end);
    let end = spans[..last]
        .iter()
        .rev()
        .find(|span| span.rendered_len > 0)
        .map_or(0, |span| match span.replacement {
            None => span.raw.start + (range.end - span.rendered_start).min(span.raw.len()),
            Some(_) => span.raw.end,
        });
    start..end.max(start)
}

/// Lengths of the common prefix and suffix of `old` and `new` after an edit
/// replaced raw `edit` with text shifting everything after it by `raw_delta`.
///
/// Prefix spans must end before the edit; suffix spans must start after it
/// and match once shifted.
pub(crate) fn common_ends(
    old: &[RenderSpan],
    new: &[RenderSpan],
    edit: &Range<usize>,
    raw_delta: isize,
    rendered_delta: isize,
) -> (usize, usize) {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(o, n)| o.raw.end <= edit.start && o == n)
        .count();
    let limit = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(limit)
        .take_while(|(o, n)| o.raw.start >= edit.end && o.shifted(raw_delta, rendered_delta) == **n)
        .count();
    (prefix, suffix)
}
