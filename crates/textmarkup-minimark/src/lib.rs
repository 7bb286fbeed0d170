//! # textmarkup-minimark
//!
//! A small Markdown-like grammar for [`textmarkup_engine`], with the
//! formatting that renders it: headings, list items, paragraphs and blank
//! lines, each holding `**strong**`, `*emphasis*` and `` `code` `` inlines.
//!
//! ```
//! let mut text = textmarkup_minimark::parsed_text("# Notes\n- **milk**\n").unwrap();
//! assert_eq!(text.rendered_text().to_string(), "# Notes\n• milk\n");
//!
//! // Edits use rendered offsets; typing at the end of "milk" stays inside
//! // the strong span
//! text.replace_characters(16..16, " oat").unwrap();
//! assert_eq!(text.raw_text().to_string(), "# Notes\n- **milk oat**\n");
//! ```

pub mod formatting;
pub mod grammar;
pub mod kinds;

pub use formatting::formatting;

use textmarkup_engine::editing::ParsedText;
use textmarkup_engine::parsing::{Grammar, GrammarError};

pub fn grammar() -> Result<Grammar, GrammarError> {
    grammar::build(false)
}

/// Parses `text` and renders it with [`formatting()`].
pub fn parsed_text(text: &str) -> Result<ParsedText, GrammarError> {
    Ok(ParsedText::new(text, grammar()?, formatting()))
}
