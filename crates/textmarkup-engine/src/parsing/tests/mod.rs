//! Rule semantics and incremental reparse, exercised through small in-test
//! grammars.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use xi_rope::Rope;

use crate::parsing::{
    CharSet, CompareOptions, Grammar, GrammarBuilder, MemoizationTable, NodeType, ParseBuffer,
    ParseError, ParsingResult, PropertyKey, Rule, RuleId, TraceEvent, format_tree,
};

const DOCUMENT: NodeType = NodeType::new("document");
const LINE: NodeType = NodeType::new("line");
const BLANK: NodeType = NodeType::new("blank");

/// `document = (line | blank)*`, `line = [^\r\n]+ "\n"?`, `blank = "\n"`.
fn lines_grammar(tracing: bool) -> (Grammar, RuleId) {
    let mut b = GrammarBuilder::new().with_tracing(tracing);
    let letter = b.char_class(CharSet::newlines().complement());
    let body = b.repeating(letter, 1..);
    let newline = b.literal("\n");
    let end = b.zero_or_one(newline);
    let line = b.in_order([body, end]);
    let line = b.wrapping(line, LINE);
    let line = b.memoizing(line);
    b.named(line, "line");
    let blank = b.absorbing(newline, BLANK);
    let block = b.choice([line, blank]);
    let blocks = b.repeating(block, 0..);
    let document = b.wrapping(blocks, DOCUMENT);
    (b.build(document).unwrap(), line)
}

fn apply(grammar: &Grammar, rule: RuleId, text: &str) -> ParsingResult {
    let rope = Rope::from(text);
    let mut memo = MemoizationTable::new(rope.len());
    grammar.parse_rule(rule, &rope, 0, &mut memo)
}

fn single_rule(make: impl FnOnce(&mut GrammarBuilder) -> RuleId) -> (Grammar, RuleId) {
    let mut b = GrammarBuilder::new();
    let rule = make(&mut b);
    (b.build(rule).unwrap(), rule)
}

// Rule semantics

#[test]
fn sequence_of_literals() {
    let (grammar, rule) = single_rule(|b| {
        let hash = b.literal("#");
        let space = b.literal(" ");
        b.in_order([hash, space])
    });
    let result = apply(&grammar, rule, "# x");
    assert!(result.succeeded);
    assert_eq!(result.length, 2);
    assert!(result.examined_length >= 2);
}

#[rstest]
#[case("dog", true, 3, 3)]
#[case("fox", false, 0, 1)]
#[case("cow", false, 0, 2)]
fn ordered_choice(
    #[case] text: &str,
    #[case] succeeded: bool,
    #[case] length: usize,
    #[case] examined: usize,
) {
    let (grammar, rule) = single_rule(|b| {
        let cat = b.literal("cat");
        let dog = b.literal("dog");
        b.choice([cat, dog])
    });
    let result = apply(&grammar, rule, text);
    assert_eq!(
        (result.succeeded, result.length, result.examined_length),
        (succeeded, length, examined)
    );
}

#[test]
fn choice_pruning_skips_every_alternative() {
    let (grammar, rule) = single_rule(|b| {
        let cat = b.literal("cat");
        let dog = b.literal("dog");
        b.choice([cat, dog])
    });
    let mut buffer = ParseBuffer::new("fox", grammar);
    assert!(buffer.parse().is_err());
    let cat = RuleId::from_index(0);
    assert_eq!(buffer.rule_statistics(cat).total_applications, 0);
    assert_eq!(buffer.rule_statistics(rule).total_applications, 1);
}

#[rstest]
#[case("123a", true, 3, 4)]
#[case("7", true, 1, 2)]
#[case("a", false, 0, 1)]
fn repeating_digits(
    #[case] text: &str,
    #[case] succeeded: bool,
    #[case] length: usize,
    #[case] examined: usize,
) {
    let (grammar, rule) = single_rule(|b| {
        let digit = b.char_class(CharSet::ascii_digits());
        b.repeating(digit, 1..)
    });
    let result = apply(&grammar, rule, text);
    assert_eq!(
        (result.succeeded, result.length, result.examined_length),
        (succeeded, length, examined)
    );
}

#[test]
fn repeating_respects_upper_bound() {
    let (grammar, rule) = single_rule(|b| {
        let any = b.dot();
        b.repeating(any, ..=2)
    });
    assert_eq!(apply(&grammar, rule, "abc").length, 2);
}

#[test]
fn repeating_stops_on_zero_length_match() {
    let (grammar, rule) = single_rule(|b| {
        let a = b.literal("a");
        let maybe_a = b.zero_or_one(a);
        b.repeating(maybe_a, 0..)
    });
    let result = apply(&grammar, rule, "aab");
    assert!(result.succeeded);
    assert_eq!(result.length, 2);
}

#[rstest]
#[case("abc", true, 3)]
#[case("abx", false, 3)]
#[case("ab", false, 3)]
#[case("x", false, 1)]
fn literal_examined_length(#[case] text: &str, #[case] succeeded: bool, #[case] examined: usize) {
    let (grammar, rule) = single_rule(|b| b.literal("abc"));
    let result = apply(&grammar, rule, text);
    assert_eq!((result.succeeded, result.examined_length), (succeeded, examined));
}

#[test]
fn case_insensitive_literal() {
    let (grammar, rule) = single_rule(|b| b.literal_with("HeLLo", CompareOptions::CASE_INSENSITIVE));
    assert!(apply(&grammar, rule, "hello").succeeded);
    assert!(!apply(&grammar, rule, "help!").succeeded);
}

#[test]
fn multibyte_characters_are_consumed_whole() {
    let (grammar, rule) = single_rule(|b| {
        let any = b.dot();
        b.repeating(any, 0..)
    });
    assert_eq!(apply(&grammar, rule, "é😀").length, 6);
}

#[test]
fn lookahead_consumes_nothing() {
    let (grammar, rule) = single_rule(|b| {
        let ab = b.literal("ab");
        b.assertion(ab)
    });
    let result = apply(&grammar, rule, "abc");
    assert_eq!(result, ParsingResult::success(0, 2));

    let (grammar, rule) = single_rule(|b| {
        let x = b.literal("x");
        let not_x = b.not_assertion(x);
        let any = b.dot();
        b.in_order([not_x, any])
    });
    assert_eq!(apply(&grammar, rule, "y").length, 1);
    assert!(!apply(&grammar, rule, "x").succeeded);
}

#[test]
fn wrapping_a_typed_node_adds_a_parent() {
    const INNER: NodeType = NodeType::new("inner");
    const OUTER: NodeType = NodeType::new("outer");
    let (grammar, rule) = single_rule(|b| {
        let x = b.literal("x");
        let inner = b.wrapping(x, INNER);
        b.wrapping(inner, OUTER)
    });
    let node = apply(&grammar, rule, "x").node.unwrap();
    assert_eq!(node.kind(), OUTER);
    assert_eq!(node.children()[0].kind(), INNER);
    assert_eq!(node.length(), 1);
}

#[test]
fn absorbing_discards_structure() {
    const A: NodeType = NodeType::new("a");
    const OPAQUE: NodeType = NodeType::new("opaque");
    let (grammar, rule) = single_rule(|b| {
        let a = b.literal("a");
        let a = b.wrapping(a, A);
        let pair = b.in_order([a, a]);
        b.absorbing(pair, OPAQUE)
    });
    let node = apply(&grammar, rule, "aa").node.unwrap();
    assert_eq!(node.kind(), OPAQUE);
    assert!(node.is_leaf());
    assert_eq!(node.length(), 2);
}

#[test]
fn property_tag_annotates_the_result_node() {
    const ITEM: NodeType = NodeType::new("item");
    const IN_LIST: PropertyKey<bool> = PropertyKey::new("inList");
    let (grammar, rule) = single_rule(|b| {
        let dash = b.literal("-");
        let tagged = b.property_tag(dash, &IN_LIST, true);
        b.wrapping(tagged, ITEM)
    });
    let node = apply(&grammar, rule, "-").node.unwrap();
    assert_eq!(node.kind(), ITEM);
    assert_eq!(node.property(&IN_LIST), Some(&true));
}

#[rstest]
#[case::tagged_first("abc", true, 0)]
#[case::tagged_second("cab", false, 1)]
fn property_tag_stays_on_its_own_span(
    #[case] text: &str,
    #[case] tagged_first: bool,
    #[case] tagged_child: usize,
) {
    const WRAPPED: NodeType = NodeType::new("wrapped");
    const MARKED: PropertyKey<bool> = PropertyKey::new("marked");
    let (grammar, rule) = single_rule(|b| {
        let a = b.literal("a");
        let bee = b.literal("b");
        let c = b.literal("c");
        let ab = b.in_order([a, bee]);
        let tagged = b.property_tag(ab, &MARKED, true);
        let sequence = if tagged_first {
            b.in_order([tagged, c])
        } else {
            b.in_order([c, tagged])
        };
        b.wrapping(sequence, WRAPPED)
    });
    let node = apply(&grammar, rule, text).node.unwrap();
    assert_eq!(node.kind(), WRAPPED);
    assert_eq!(node.length(), 3);
    assert_eq!(node.property(&MARKED), None);
    assert_eq!(node.children().len(), 2);
    let child = &node.children()[tagged_child];
    assert_eq!(child.length(), 2);
    assert_eq!(child.property(&MARKED), Some(&true));
}

#[test]
fn mixed_text_and_nodes_keep_the_length_invariant() {
    const WORD: NodeType = NodeType::new("word");
    let (grammar, rule) = single_rule(|b| {
        let space = b.literal(" ");
        let letter = b.char_class(CharSet::ascii_letters());
        let letters = b.repeating(letter, 1..);
        let word = b.wrapping(letters, WORD);
        let pair = b.in_order([space, word, space]);
        b.wrapping(pair, DOCUMENT)
    });
    let rope = Rope::from(" ab ");
    let mut memo = MemoizationTable::new(rope.len());
    let node = grammar.parse_rule(rule, &rope, 0, &mut memo).node.unwrap();
    insta::assert_snapshot!(format_tree(&rope, &node), @r#"
    document 0..4
      documentFragment 0..1 " "
      word 1..3 "ab"
      documentFragment 3..4 " "
    "#);
}

// Parse buffer

#[test]
fn parses_lines_into_a_document() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("ab\n\ncd", grammar);
    let root = buffer.parse().unwrap();
    insta::assert_snapshot!(format_tree(buffer.text(), &root), @r#"
    document 0..6
      line 0..3 "ab\n"
      blank 3..4 "\n"
      line 4..6 "cd"
    "#);
}

#[test]
fn empty_buffer_parses_to_empty_document() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("", grammar);
    let root = buffer.parse().unwrap();
    assert_eq!(root.kind(), DOCUMENT);
    assert_eq!(root.length(), 0);
    assert!(buffer.is_empty());
}

#[test]
fn incomplete_parse_keeps_the_parsed_prefix() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("a\rb", grammar);
    let error = buffer.parse().unwrap_err();
    assert_eq!(
        error,
        ParseError::IncompleteParsing {
            length: 1,
            buffer_length: 3
        }
    );
    assert_eq!(buffer.last_error(), Some(&error));
    assert_eq!(buffer.tree().map(|root| root.length()), Some(1));
}

#[test]
fn invalid_ranges_are_rejected_without_editing() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("é", grammar);
    buffer.parse().unwrap();
    assert!(matches!(
        buffer.replace_characters(1..2, "x"),
        Err(ParseError::InvalidRange { .. })
    ));
    assert!(matches!(
        buffer.replace_characters(0..5, "x"),
        Err(ParseError::InvalidRange { buffer_length: 2, .. })
    ));
    assert_eq!(buffer.slice(0..2), "é");
}

#[test]
fn parsing_twice_is_deterministic() {
    let text = "one\ntwo\n\nthree";
    let (first, _) = lines_grammar(false);
    let (second, _) = lines_grammar(false);
    let mut a = ParseBuffer::new(text, first);
    let mut b = ParseBuffer::new(text, second);
    assert_eq!(a.parse().unwrap(), b.parse().unwrap());
}

#[test]
fn memoized_and_fresh_results_are_identical() {
    let (grammar, line) = lines_grammar(false);
    let rope = Rope::from("ab\ncd");
    let mut memo = MemoizationTable::new(rope.len());
    let fresh = grammar.parse_rule(line, &rope, 3, &mut memo);
    assert!(memo.contains(line, 3));
    let cached = grammar.parse_rule(line, &rope, 3, &mut memo);
    assert_eq!(fresh, cached);
    assert_eq!(memo.statistics().hits, 1);
}

#[test]
fn clearing_the_memo_forces_a_cold_parse() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("ab\ncd", grammar);
    let warm = buffer.parse().unwrap();
    assert!(buffer.memo_statistics().entries > 0);

    buffer.clear_memo();
    assert_eq!(buffer.memo_statistics().entries, 0);

    let cold = buffer.parse().unwrap();
    assert_eq!(cold, warm);
    assert!(!Arc::ptr_eq(&cold.children()[0], &warm.children()[0]));
}

#[test]
fn edit_reuses_memoized_lines_on_both_sides() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("ab\ncd\nef", grammar);
    let before = buffer.parse().unwrap();
    let hits_before = buffer.memo_statistics().hits;

    let after = buffer.replace_characters(3..5, "xyz").unwrap();
    assert_eq!(buffer.slice(0..buffer.len()), "ab\nxyz\nef");
    // Both unchanged lines and the end-of-input failure are reused.
    assert_eq!(buffer.memo_statistics().hits - hits_before, 3);

    assert!(Arc::ptr_eq(&before.children()[0], &after.children()[0]));
    assert!(Arc::ptr_eq(&before.children()[2], &after.children()[2]));

    let (grammar, _) = lines_grammar(false);
    let mut fresh = ParseBuffer::new("ab\nxyz\nef", grammar);
    assert_eq!(after, fresh.parse().unwrap());
}

#[test]
fn path_to_index_descends_to_the_leaf() {
    let (grammar, _) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("ab\ncd", grammar);
    buffer.parse().unwrap();
    let path = buffer.path_to_index(4);
    let kinds: Vec<_> = path.iter().map(|entry| (entry.node.kind(), entry.range())).collect();
    assert_eq!(kinds, vec![(DOCUMENT, 0..5), (LINE, 3..5)]);
    assert!(buffer.path_to_index(6).is_empty());
}

#[test]
fn rule_statistics_count_applications() {
    let (grammar, line) = lines_grammar(false);
    let mut buffer = ParseBuffer::new("ab", grammar);
    buffer.parse().unwrap();
    let stats = buffer.rule_statistics(line);
    assert_eq!((stats.total_applications, stats.successes), (2, 1));
}

#[test]
fn tracing_grammar_records_named_rules() {
    let (grammar, _) = lines_grammar(true);
    let mut buffer = ParseBuffer::new("ab", grammar);
    buffer.parse().unwrap();
    let trace = buffer.trace().unwrap();
    let events: Vec<_> = trace
        .entries()
        .iter()
        .map(|entry| (entry.rule.as_str(), entry.index, entry.event))
        .collect();
    assert_eq!(
        events,
        vec![
            ("line", 0, TraceEvent::Enter),
            ("line", 0, TraceEvent::Exit { succeeded: true, length: 2 }),
            ("line", 2, TraceEvent::Enter),
            ("line", 2, TraceEvent::Exit { succeeded: false, length: 0 }),
        ]
    );

    let (grammar, _) = lines_grammar(false);
    let mut quiet = ParseBuffer::new("ab", grammar);
    quiet.parse().unwrap();
    assert!(quiet.trace().is_none());
}

proptest! {
    #[test]
    fn incremental_reparse_matches_cold_parse(
        text in "[ab\n]{0,24}",
        start in 0usize..32,
        removed in 0usize..8,
        inserted in "[ab\n]{0,6}",
    ) {
        let start = start.min(text.len());
        let end = (start + removed).min(text.len());

        let (grammar, _) = lines_grammar(false);
        let mut incremental = ParseBuffer::new(&text, grammar);
        incremental.parse().unwrap();
        let edited = incremental.replace_characters(start..end, &inserted).unwrap();

        let expected_text = format!("{}{}{}", &text[..start], inserted, &text[end..]);
        let (grammar, _) = lines_grammar(false);
        let mut cold = ParseBuffer::new(&expected_text, grammar);
        prop_assert_eq!(incremental.slice(0..incremental.len()), expected_text.as_str());
        prop_assert_eq!(edited, cold.parse().unwrap());
    }
}

/// Choices over lookahead, optional and nullable sequences, so that pruning
/// depends on the guard of empty matches as well as on FIRST sets.
fn lookahead_grammar() -> Grammar {
    let mut b = GrammarBuilder::new();
    let x = b.literal("x");
    let y = b.literal("y");
    let ab = b.char_class(CharSet::from_chars("ab"));
    let at_x = b.assertion(x);
    let at_ab = b.assertion(ab);
    let maybe_y = b.zero_or_one(y);
    let maybe_ab = b.zero_or_one(ab);
    let not_ab = b.not_assertion(ab);
    let any = b.dot();

    let y_then_x = b.in_order([maybe_y, at_x]);
    let x_then_ab = b.in_order([at_x, x, maybe_ab]);
    let y_then_ab = b.in_order([maybe_y, at_ab]);
    let nested = b.choice([y_then_ab, x_then_ab]);
    let guarded = b.choice([y_then_x, nested, ab]);
    let empty_before_x = b.in_order([at_x, maybe_y]);
    let optional_choice = b.choice([empty_before_x, maybe_ab]);
    let negated = b.in_order([not_ab, any]);
    let unbounded = b.choice([negated, y]);
    let document = b.choice([guarded, optional_choice, unbounded]);
    b.build(document).unwrap()
}

fn apply_at(grammar: &Grammar, rule: RuleId, rope: &Rope, index: usize) -> ParsingResult {
    let mut memo = MemoizationTable::new(rope.len());
    grammar.parse_rule(rule, rope, index, &mut memo)
}

proptest! {
    #[test]
    fn opening_characters_cover_empty_matches(text in "[xyabc]{0,8}") {
        let grammar = lookahead_grammar();
        let rope = Rope::from(text.as_str());

        for index in 0..=text.len() {
            let Some(next) = text[index..].chars().next() else {
                continue;
            };
            for rule in grammar.rule_ids() {
                let result = apply_at(&grammar, rule, &rope, index);
                if result.succeeded {
                    prop_assert!(
                        grammar.possible_opening_characters(rule).contains(next),
                        "rule {} matched {:?} at {} but excludes {:?}",
                        rule,
                        text,
                        index,
                        next
                    );
                }

                let Some(Rule::Choice(alternatives)) = grammar.rule(rule) else {
                    continue;
                };
                let unpruned = alternatives
                    .iter()
                    .map(|&alternative| apply_at(&grammar, alternative, &rope, index))
                    .find(|result| result.succeeded);
                prop_assert_eq!(
                    (result.succeeded, result.length, result.node.clone()),
                    unpruned.map_or((false, 0, None), |r| (r.succeeded, r.length, r.node))
                );
            }
        }
    }
}
