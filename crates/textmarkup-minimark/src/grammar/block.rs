//! Block rules. Each block is one line including its newline.

use textmarkup_engine::parsing::{GrammarBuilder, RuleId};

use super::inline::Inlines;
use crate::kinds::{
    BLANK_LINE, HEADING, HEADING_DELIMITER, HEADING_LEVEL, LIST_DELIMITER, LIST_ITEM,
    MAX_HEADING_LEVEL, PARAGRAPH,
};

pub(super) fn block(b: &mut GrammarBuilder, inlines: &Inlines) -> RuleId {
    let newline = b.literal("\n");
    let line_end = b.zero_or_one(newline);

    let blank = b.absorbing(newline, BLANK_LINE);
    let heading = heading(b, inlines.any, line_end);
    let list_item = list_item(b, inlines.any, line_end);

    let paragraph = b.in_order([inlines.some, line_end]);
    let paragraph = b.wrapping(paragraph, PARAGRAPH);
    let paragraph = b.memoizing(paragraph);
    b.named(paragraph, "paragraph");

    b.choice([blank, heading, list_item, paragraph])
}

/// One alternative per level, so the level can be tagged on the node.
fn heading(b: &mut GrammarBuilder, inlines: RuleId, line_end: RuleId) -> RuleId {
    let levels: Vec<RuleId> = (1..=MAX_HEADING_LEVEL)
        .map(|level| {
            let marker = b.literal(format!("{} ", "#".repeat(level)));
            let marker = b.absorbing(marker, HEADING_DELIMITER);
            let heading = b.in_order([marker, inlines, line_end]);
            let heading = b.wrapping(heading, HEADING);
            b.property_tag(heading, &HEADING_LEVEL, level)
        })
        .collect();
    let heading = b.choice(levels);
    let heading = b.memoizing(heading);
    b.named(heading, "heading")
}

fn list_item(b: &mut GrammarBuilder, inlines: RuleId, line_end: RuleId) -> RuleId {
    let space = b.literal(" ");
    let indent = b.repeating(space, 0..);
    let dash = b.literal("- ");
    let star = b.literal("* ");
    let bullet = b.choice([dash, star]);
    let marker = b.in_order([indent, bullet]);
    let marker = b.absorbing(marker, LIST_DELIMITER);

    let item = b.in_order([marker, inlines, line_end]);
    let item = b.wrapping(item, LIST_ITEM);
    let item = b.memoizing(item);
    b.named(item, "listItem")
}
