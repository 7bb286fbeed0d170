/*!
 * # Rendered projection
 *
 * [`ParsedText`] keeps two views of one buffer:
 *
 * - **raw**: the text the grammar parses, owned by a [`ParseBuffer`](crate::parsing::ParseBuffer)
 * - **rendered**: what an editing surface shows, derived from the tree
 *
 * ## Formatting
 *
 * A [`Formatting`] registry maps node types to formatting functions, which
 * overlay [`AttributeSet`]s top-down, and to replacement functions, which
 * render a node's whole span as other text. An empty replacement hides the
 * node, which is how delimiters disappear from the rendered view.
 *
 * ## Spans
 *
 * The rendered text is an ordered list of [`RenderSpan`]s, each passing raw
 * text through or holding replacement content. Replaced spans are atomic:
 * [`ParsedText::raw_range`] and [`ParsedText::rendered_range`] widen any
 * partial overlap to the whole span.
 *
 * ## Edits
 *
 * Edits are given in rendered coordinates, either directly through
 * [`ParsedText::replace_characters`] or as a [`Cmd`] through
 * [`ParsedText::apply`]. After the incremental reparse, only subtrees whose
 * node identity changed are rendered again; the rest comes from a cache keyed
 * by frozen node. The resulting [`TextChange`] is returned and passed to the
 * [`ChangeDelegate`], if one is set.
 *
 * ```rust
 * use textmarkup_engine::editing::{AttributeSet, Formatting, ParsedText};
 * use textmarkup_engine::parsing::{CharSet, GrammarBuilder, NodeType};
 *
 * const WORD: NodeType = NodeType::new("word");
 *
 * let mut b = GrammarBuilder::new();
 * let letters = b.char_class(CharSet::ascii_letters());
 * let letters = b.repeating(letters, 0..);
 * let word = b.wrapping(letters, WORD);
 * let grammar = b.build(word).unwrap();
 *
 * let formatting = Formatting::new()
 *     .with_defaults(AttributeSet::new().with("font", "serif"))
 *     .format(WORD, |_, attributes| attributes.set("bold", true));
 * let mut text = ParsedText::new("hello", grammar, formatting);
 *
 * let change = text.replace_characters(5..5, "s").unwrap();
 * assert_eq!(text.rendered_text().to_string(), "hellos");
 * assert_eq!(change.change_in_length, 1);
 * let (attributes, range) = text.attributes(0).unwrap();
 * assert!(attributes.flag("bold"));
 * assert_eq!(range, 0..6);
 * ```
 */

pub mod attributes;
pub mod commands;
pub mod document;
pub mod formatting;
pub mod patch;
pub mod spans;

pub use attributes::{AttributeSet, AttributeValue, PARSE_ERROR};
pub use commands::Cmd;
pub use document::ParsedText;
pub use formatting::{FormatFn, Formatting, ReplaceFn};
pub use patch::{ChangeDelegate, Patch, TextChange};
pub use spans::RenderSpan;

#[cfg(test)]
mod tests;
