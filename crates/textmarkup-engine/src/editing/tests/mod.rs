//! Projection behaviour over a small inline grammar with `**strong**` runs
//! whose delimiters are hidden from the rendered text.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::editing::{AttributeSet, Cmd, Formatting, PARSE_ERROR, ParsedText, TextChange};
use crate::parsing::{CharSet, Grammar, GrammarBuilder, NodeType, ParseError};

const DOCUMENT: NodeType = NodeType::new("document");
const STRONG: NodeType = NodeType::new("strong");
const DELIMITER: NodeType = NodeType::new("delimiter");
const TEXT: NodeType = NodeType::new("text");
const WORD: NodeType = NodeType::new("word");

/// `document = (strong | text)*`, `strong = "**" (!"**" .)+ "**"`,
/// `text = [^*]+ | "*"`.
fn inline_grammar() -> Grammar {
    let mut b = GrammarBuilder::new();
    let marker = b.literal("**");
    let delimiter = b.absorbing(marker, DELIMITER);
    let not_marker = b.not_assertion(marker);
    let any = b.dot();
    let inner = b.in_order([not_marker, any]);
    let inner = b.repeating(inner, 1..);
    let inner = b.wrapping(inner, TEXT);
    let strong = b.in_order([delimiter, inner, delimiter]);
    let strong = b.wrapping(strong, STRONG);
    let strong = b.memoizing(strong);
    b.named(strong, "strong");

    let plain = b.char_class(CharSet::from_chars("*").complement());
    let plain = b.repeating(plain, 1..);
    let star = b.literal("*");
    let text = b.choice([plain, star]);
    let text = b.absorbing(text, TEXT);
    let text = b.memoizing(text);

    let inline = b.choice([strong, text]);
    let inlines = b.repeating(inline, 0..);
    let document = b.wrapping(inlines, DOCUMENT);
    b.build(document).unwrap()
}

fn formatting() -> Formatting {
    Formatting::new()
        .with_defaults(AttributeSet::new().with("font", "serif"))
        .format(STRONG, |_, attributes| attributes.set("bold", true))
        .hide(DELIMITER)
}

fn parsed(text: &str) -> ParsedText {
    ParsedText::new(text, inline_grammar(), formatting())
}

fn rendered(text: &ParsedText) -> String {
    text.rendered_text().to_string()
}

#[test]
fn hidden_kinds_have_a_replacement() {
    let formatting = formatting();
    assert!(formatting.has_replacement(DELIMITER));
    assert!(!formatting.has_replacement(STRONG));
    assert_eq!(formatting.defaults(), &AttributeSet::new().with("font", "serif"));
}

#[test]
fn hidden_delimiters() {
    let text = parsed("**bold**");
    assert_eq!(rendered(&text), "bold");
    assert_eq!(text.rendered_range(0..2), 0..0);
    assert_eq!(text.raw_range(0..4), 0..8);
}

#[test]
fn partial_overlap_expands_to_the_atomic_span() {
    let text = parsed("a **bold** b");
    assert_eq!(rendered(&text), "a bold b");
    // Half of the opening delimiter
    assert_eq!(text.rendered_range(3..4), 2..2);
    assert_eq!(text.raw_range(2..2), 2..4);
    assert_eq!(text.raw_range(2..6), 2..10);
}

#[test]
fn range_mapping_round_trip_covers_the_raw_range() {
    let text = parsed("x **bold** and *more*");
    let len = text.raw_text().len();
    for start in 0..=len {
        for end in start..=len {
            let back = text.raw_range(text.rendered_range(start..end));
            assert!(
                back.start <= start && back.end >= end,
                "{start}..{end} came back as {back:?}"
            );
        }
    }
}

#[test]
fn editing_inside_strong_reports_only_the_changed_leaf() {
    let mut text = parsed("**bold** and more");
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    text.set_delegate(move |change: &TextChange| sink.lock().unwrap().push(change.clone()));

    let change = text.replace_characters(2..2, "x").unwrap();

    assert_eq!(rendered(&text), "boxld and more");
    assert_eq!(text.raw_text().to_string(), "**boxld** and more");
    assert_eq!(
        change,
        TextChange {
            old_range: 0..4,
            change_in_length: 1,
            changed_attributes_range: 0..5,
        }
    );
    assert_eq!(*changes.lock().unwrap(), vec![change]);
}

#[test]
fn attributes_merge_equal_neighbours() {
    let text = parsed("**bold** and more");
    let (bold, range) = text.attributes(1).unwrap();
    assert!(bold.flag("bold"));
    assert_eq!(range, 0..4);

    let (plain, range) = text.attributes(5).unwrap();
    assert!(!plain.flag("bold"));
    assert_eq!(plain.get("font").map(ToString::to_string).as_deref(), Some("\"serif\""));
    assert_eq!(range, 4..13);

    assert!(text.attributes(13).is_none());
}

#[test]
fn unchanged_subtrees_are_not_rendered_again() {
    let mut text = parsed("**bold** and more");
    let strong = Arc::clone(&text.buffer().tree().unwrap().children()[0]);
    assert_eq!(text.render_cache_hits(), 0);

    text.replace_characters(13..13, "!").unwrap();

    assert_eq!(rendered(&text), "bold and more!");
    assert!(Arc::ptr_eq(&text.buffer().tree().unwrap().children()[0], &strong));
    assert_eq!(text.render_cache_hits(), 1);
    assert_eq!(text.cached_subtrees(), 1);
}

#[rstest]
#[case::insert_plain("**bold** and more", 9, 9, "very ")]
#[case::open_strong("plain words here", 6, 6, "**")]
#[case::close_strong("**open words", 7, 7, "**")]
#[case::delete_across_strong("a **b** c **d** e", 1, 6, "")]
#[case::replace_all("**x**", 0, 1, "plain")]
fn incremental_projection_matches_fresh(
    #[case] initial: &str,
    #[case] start: usize,
    #[case] end: usize,
    #[case] insert: &str,
) {
    let mut text = parsed(initial);
    let before = rendered(&text);
    let change = text.replace_characters(start..end, insert).unwrap();

    let fresh = parsed(&text.raw_text().to_string());
    assert_eq!(rendered(&text), rendered(&fresh));
    assert_eq!(text.spans(), fresh.spans());

    // The change describes the rendered splice exactly
    let after = rendered(&text);
    let new_range = change.new_range();
    assert_eq!(before[..change.old_range.start], after[..new_range.start]);
    assert_eq!(before[change.old_range.end..], after[new_range.end..]);
}

#[test]
fn typing_at_a_hidden_delimiter_goes_before_it() {
    let mut text = parsed("**bold**");
    assert_eq!(text.raw_position(0), 0);
    text.replace_characters(0..0, "x").unwrap();
    assert_eq!(text.raw_text().to_string(), "x**bold**");
    assert_eq!(rendered(&text), "xbold");
}

#[test]
fn commands_move_the_selection() {
    let mut text = parsed("**bold** and more");
    text.set_selection(2..2);

    let patch = text
        .apply(Cmd::InsertText {
            at: 2,
            text: "x".into(),
        })
        .unwrap();
    assert_eq!(patch.new_selection, 3..3);
    assert_eq!(patch.version, 1);

    text.set_selection(6..9);
    let patch = text.apply(Cmd::DeleteRange { range: 5..10 }).unwrap();
    assert_eq!(rendered(&text), "boxldmore");
    assert_eq!(patch.new_selection, 5..5);
    assert_eq!(text.version(), 2);

    let patch = text
        .apply(Cmd::ReplaceRange {
            range: 0..5,
            text: "gone".into(),
        })
        .unwrap();
    assert_eq!(rendered(&text), "gonemore");
    assert_eq!(patch.new_selection, 4..4);
}

#[test]
fn invalid_ranges_are_rejected() {
    let mut text = parsed("**é**");
    assert_eq!(rendered(&text), "é");
    assert!(matches!(
        text.replace_characters(0..1, "e"),
        Err(ParseError::InvalidRange { .. })
    ));
    assert!(matches!(
        text.replace_characters(1..9, ""),
        Err(ParseError::InvalidRange { .. })
    ));
    assert_eq!(text.version(), 0);
}

fn words_grammar() -> Grammar {
    let mut b = GrammarBuilder::new();
    let letters = b.char_class(CharSet::ascii_letters());
    let letters = b.repeating(letters, 0..);
    let word = b.wrapping(letters, WORD);
    b.build(word).unwrap()
}

#[test]
fn unparsed_suffix_is_marked() {
    let mut text = ParsedText::new("abc123", words_grammar(), Formatting::new());
    assert_eq!(rendered(&text), "abc123");
    assert!(matches!(
        text.buffer().last_error(),
        Some(ParseError::IncompleteParsing { length: 3, .. })
    ));
    let (attributes, range) = text.attributes(4).unwrap();
    assert!(attributes.flag(PARSE_ERROR));
    assert_eq!(range, 3..6);

    let change = text.replace_characters(3..6, "def").unwrap();
    assert_eq!(change.changed_attributes_range, 0..6);
    assert!(text.buffer().last_error().is_none());
    let (attributes, range) = text.attributes(4).unwrap();
    assert!(!attributes.flag(PARSE_ERROR));
    assert_eq!(range, 0..6);
}
