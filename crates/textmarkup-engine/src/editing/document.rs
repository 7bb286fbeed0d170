use std::ops::Range;
use std::sync::Arc;

use xi_rope::{Delta, Rope};

use super::attributes::AttributeSet;
use super::commands::{Cmd, transform_selection};
use super::formatting::Formatting;
use super::patch::{ChangeDelegate, Patch, TextChange};
use super::spans::{self, RenderCache, RenderSpan};
use crate::parsing::{Grammar, ParseBuffer, ParseError, text};

/// A parsed buffer together with its rendered projection.
///
/// Edits are made in rendered coordinates; they are translated to the raw
/// buffer, reparsed incrementally, and the rendered text is spliced where the
/// rendering changed.
pub struct ParsedText {
    buffer: ParseBuffer,
    formatting: Formatting,
    spans: Vec<RenderSpan>,
    rendered: Rope,
    cache: RenderCache,
    delegate: Option<Box<dyn ChangeDelegate + Send>>,
    selection: Range<usize>,
    version: u64,
}

impl ParsedText {
    pub fn new(text: &str, grammar: impl Into<Arc<Grammar>>, formatting: Formatting) -> Self {
        Self::from_buffer(ParseBuffer::new(text, grammar), formatting)
    }

    /// Wraps a buffer, parsing it first if that has not happened yet. A buffer
    /// parsed elsewhere keeps its warm memo table.
    pub fn from_buffer(mut buffer: ParseBuffer, formatting: Formatting) -> Self {
        if buffer.tree().is_none()
            && let Err(error) = buffer.parse()
        {
            log::debug!("rendering partial parse: {error}");
        }
        let mut cache = RenderCache::default();
        let spans = spans::render(buffer.tree(), buffer.text(), &formatting, &mut cache);
        let rendered = Rope::from(spans::rendered_text(&spans, buffer.text()));
        Self {
            buffer,
            formatting,
            spans,
            rendered,
            cache,
            delegate: None,
            selection: 0..0,
            version: 0,
        }
    }

    pub fn raw_text(&self) -> &Rope {
        self.buffer.text()
    }

    pub fn rendered_text(&self) -> &Rope {
        &self.rendered
    }

    pub fn rendered_len(&self) -> usize {
        self.rendered.len()
    }

    /// Attributes of the rendered text at `at` and the widest rendered range
    /// around it sharing them. `None` past the end.
    pub fn attributes(&self, at: usize) -> Option<(Arc<AttributeSet>, Range<usize>)> {
        if at >= self.rendered_len() {
            return None;
        }
        let index = self.spans.partition_point(|span| span.rendered_end() <= at);
        let span = self.spans.get(index)?;
        let attributes = &span.attributes;

        let mut start = span.rendered_start;
        for before in self.spans[..index].iter().rev() {
            if before.rendered_len == 0 {
                continue;
            }
            if before.attributes != *attributes {
                break;
            }
            start = before.rendered_start;
        }
        let mut end = span.rendered_end();
        for after in &self.spans[index + 1..] {
            if after.rendered_len == 0 {
                continue;
            }
            if after.attributes != *attributes {
                break;
            }
            end = after.rendered_end();
        }
        Some((Arc::clone(attributes), start..end))
    }

    /// Raw range covering every raw byte that renders into `rendered`.
    ///
    /// Replaced spans are atomic, and hidden spans at either end are
    /// included, so an empty rendered range maps to the hidden text sitting
    /// at that point.
    pub fn raw_range(&self, rendered: Range<usize>) -> Range<usize> {
        let start = spans::raw_start_for(&self.spans, self.buffer.len(), rendered.start);
        let end = spans::raw_end_for(&self.spans, rendered.end);
        start..end.max(start)
    }

    /// Rendered range that `raw` renders into. A replaced span overlapped by
    /// `raw` contributes its whole rendered content.
    pub fn rendered_range(&self, raw: Range<usize>) -> Range<usize> {
        let start = spans::rendered_start_for(&self.spans, self.rendered_len(), raw.start);
        let end = spans::rendered_end_for(&self.spans, raw.end);
        start..end.max(start)
    }

    /// Smallest raw offset rendering at `rendered`; where text typed at that
    /// rendered caret goes.
    pub fn raw_position(&self, rendered: usize) -> usize {
        spans::raw_start_for(&self.spans, self.buffer.len(), rendered)
    }

    /// Replaces rendered `range` with `text`.
    ///
    /// Replaced spans partly covered by `range` are replaced whole, but
    /// hidden spans at its ends are kept. Grammar failures after the edit are
    /// not errors here: the unparsed suffix is rendered with the
    /// `parse_error` attribute.
    pub fn replace_characters(
        &mut self,
        range: Range<usize>,
        text: &str,
    ) -> Result<TextChange, ParseError> {
        self.check_rendered_range(&range)?;
        let raw = self.edit_range(range.clone());
        let change = self.replace_raw(raw, text, range)?;
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.text_changed(&change);
        }
        Ok(change)
    }

    /// Applies a command and moves the selection across it.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, ParseError> {
        let (range, text) = cmd.compile();
        self.check_rendered_range(&range)?;
        let raw_start = self.edit_range(range.clone()).start;
        let change = self.replace_characters(range.clone(), text)?;

        let caret = spans::rendered_end_for(&self.spans, raw_start + text.len());
        let selection =
            transform_selection(&self.selection, &range, change.change_in_length, caret);
        self.selection = self.clamp(selection);
        Ok(Patch {
            change,
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }

    pub fn set_delegate(&mut self, delegate: impl ChangeDelegate + Send + 'static) {
        self.delegate = Some(Box::new(delegate));
    }

    pub fn clear_delegate(&mut self) {
        self.delegate = None;
    }

    pub fn buffer(&self) -> &ParseBuffer {
        &self.buffer
    }

    pub fn formatting(&self) -> &Formatting {
        &self.formatting
    }

    /// Incremented by every successful edit.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.selection = self.clamp(selection);
    }

    pub fn spans(&self) -> &[RenderSpan] {
        &self.spans
    }

    /// Number of subtrees whose rendering is cached for the next edit.
    pub fn cached_subtrees(&self) -> usize {
        self.cache.len()
    }

    /// Subtree renderings reused since this projection was created.
    pub fn render_cache_hits(&self) -> u64 {
        self.cache.hits()
    }

    fn check_rendered_range(&self, range: &Range<usize>) -> Result<(), ParseError> {
        let valid = range.start <= range.end
            && text::is_boundary(&self.rendered, range.start)
            && text::is_boundary(&self.rendered, range.end);
        if valid {
            Ok(())
        } else {
            Err(ParseError::InvalidRange {
                range: range.clone(),
                buffer_length: self.rendered_len(),
            })
        }
    }

    fn edit_range(&self, range: Range<usize>) -> Range<usize> {
        if range.is_empty() {
            let at = self.raw_position(range.start);
            at..at
        } else {
            spans::raw_edit_range(&self.spans, self.buffer.len(), range)
        }
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let len = self.rendered_len();
        let start = range.start.min(len);
        start..range.end.min(len).max(start)
    }

    fn replace_raw(
        &mut self,
        raw: Range<usize>,
        text: &str,
        edited: Range<usize>,
    ) -> Result<TextChange, ParseError> {
        match self.buffer.replace_characters(raw.clone(), text) {
            Ok(_) | Err(ParseError::IncompleteParsing { .. }) => {}
            Err(error) => return Err(error),
        }

        let old_len = self.rendered_len();
        let spans = spans::render(
            self.buffer.tree(),
            self.buffer.text(),
            &self.formatting,
            &mut self.cache,
        );
        let new_len = spans.last().map_or(0, RenderSpan::rendered_end);
        let raw_delta = text.len() as isize - raw.len() as isize;
        let rendered_delta = new_len as isize - old_len as isize;
        let (prefix, suffix) =
            spans::common_ends(&self.spans, &spans, &raw, raw_delta, rendered_delta);

        let changed_start = prefix
            .checked_sub(1)
            .map_or(0, |i| self.spans[i].rendered_end());
        let old_end = match suffix {
            0 => old_len,
            n => self.spans[self.spans.len() - n].rendered_start,
        };
        let new_end = match suffix {
            0 => new_len,
            n => spans[spans.len() - n].rendered_start,
        };

        let old_range = changed_start.min(edited.start)..old_end.max(edited.end);
        let replaced_end = old_range.end.saturating_add_signed(rendered_delta);
        let content =
            spans::rendered_slice(&spans, self.buffer.text(), old_range.start..replaced_end);
        let delta = Delta::simple_edit(old_range.clone(), Rope::from(content), old_len);
        self.rendered = delta.apply(&self.rendered);
        debug_assert_eq!(self.rendered.len(), new_len);
        self.spans = spans;
        self.version += 1;

        let change = TextChange {
            old_range,
            change_in_length: rendered_delta,
            changed_attributes_range: changed_start..new_end.max(changed_start),
        };
        log::debug!(
            "rendered {:?} -> {:?}, attributes changed in {:?}",
            change.old_range,
            change.new_range(),
            change.changed_attributes_range
        );
        Ok(change)
    }
}

impl std::fmt::Debug for ParsedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedText")
            .field("raw_len", &self.buffer.len())
            .field("rendered_len", &self.rendered_len())
            .field("spans", &self.spans.len())
            .field("version", &self.version)
            .finish()
    }
}
