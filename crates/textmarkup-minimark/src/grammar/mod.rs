//! # Minimark grammar
//!
//! A line-oriented Markdown subset. Every line is one block:
//!
//! | Line starts with | Block |
//! |------------------|-------|
//! | `\n` | [`BLANK_LINE`] |
//! | `#` to `######` and a space | [`HEADING`], tagged with [`HEADING_LEVEL`] |
//! | optional spaces, `-` or `*`, and a space | [`LIST_ITEM`] |
//! | anything else | [`PARAGRAPH`] |
//!
//! Inside headings, list items and paragraphs, `**strong**`, `*emphasis*` and
//! `` `code` `` become [`STRONG`], [`EMPHASIS`] and [`CODE`] nodes with
//! [`DELIMITER`] leaves on both sides. Markup characters that do not close
//! on the same line are plain [`TEXT`], so every input parses completely.
//!
//! Block rules and delimited inlines are memoized; an edit reparses the
//! lines it touches and reuses the rest.
//!
//! [`BLANK_LINE`]: crate::kinds::BLANK_LINE
//! [`HEADING`]: crate::kinds::HEADING
//! [`HEADING_LEVEL`]: crate::kinds::HEADING_LEVEL
//! [`LIST_ITEM`]: crate::kinds::LIST_ITEM
//! [`PARAGRAPH`]: crate::kinds::PARAGRAPH
//! [`STRONG`]: crate::kinds::STRONG
//! [`EMPHASIS`]: crate::kinds::EMPHASIS
//! [`CODE`]: crate::kinds::CODE
//! [`DELIMITER`]: crate::kinds::DELIMITER
//! [`TEXT`]: crate::kinds::TEXT

mod block;
mod inline;

use textmarkup_engine::parsing::{Grammar, GrammarBuilder, GrammarError};

use crate::kinds::DOCUMENT;

/// Builds the grammar. With `tracing`, parse buffers record enter/exit events
/// for the named rules (blocks and inlines).
pub fn build(tracing: bool) -> Result<Grammar, GrammarError> {
    let mut b = GrammarBuilder::new().with_tracing(tracing);
    let inlines = inline::inlines(&mut b);
    let block = block::block(&mut b, &inlines);
    let blocks = b.repeating(block, 0..);
    let document = b.wrapping(blocks, DOCUMENT);
    b.build(document)
}
