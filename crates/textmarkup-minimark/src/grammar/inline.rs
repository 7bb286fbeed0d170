//! Inline rules: delimited spans and plain text.

use textmarkup_engine::parsing::{CharSet, GrammarBuilder, NodeType, RuleId};

use crate::kinds::{CODE, DELIMITER, EMPHASIS, STRONG, TEXT};

/// Entry points for block rules.
pub(super) struct Inlines {
    /// Zero or more inlines.
    pub any: RuleId,
    /// One or more inlines.
    pub some: RuleId,
}

pub(super) fn inlines(b: &mut GrammarBuilder) -> Inlines {
    let newline = b.literal("\n");
    // Strong before emphasis: both open with `*`
    let strong = delimited(b, "**", STRONG, newline);
    let emphasis = delimited(b, "*", EMPHASIS, newline);
    let code = delimited(b, "`", CODE, newline);
    let text = plain_text(b);

    let inline = b.choice([strong, emphasis, code, text]);
    Inlines {
        any: b.repeating(inline, 0..),
        some: b.repeating(inline, 1..),
    }
}

/// `mark (!mark !"\n" .)+ mark`, with the marks as [`DELIMITER`] leaves.
fn delimited(b: &mut GrammarBuilder, mark: &str, kind: NodeType, newline: RuleId) -> RuleId {
    let mark_rule = b.literal(mark);
    let delimiter = b.absorbing(mark_rule, DELIMITER);
    let not_mark = b.not_assertion(mark_rule);
    let not_newline = b.not_assertion(newline);
    let any = b.dot();
    let body_char = b.in_order([not_mark, not_newline, any]);
    let body = b.repeating(body_char, 1..);
    let body = b.wrapping(body, TEXT);

    let rule = b.in_order([delimiter, body, delimiter]);
    let rule = b.wrapping(rule, kind);
    let rule = b.memoizing(rule);
    b.named(rule, kind.name())
}

/// A run of ordinary characters, or one markup character that did not open
/// a span.
fn plain_text(b: &mut GrammarBuilder) -> RuleId {
    let ordinary = b.char_class(CharSet::from_chars("*`\n").complement());
    let run = b.repeating(ordinary, 1..);
    let star = b.literal("*");
    let backtick = b.literal("`");
    let text = b.choice([run, star, backtick]);
    let text = b.absorbing(text, TEXT);
    let text = b.memoizing(text);
    b.named(text, "text")
}
