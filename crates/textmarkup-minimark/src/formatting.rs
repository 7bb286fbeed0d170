//! How minimark renders: inline delimiters are hidden, list markers become
//! bullets, and headings keep their `#`s but in markup style.

use textmarkup_engine::editing::{AttributeSet, Formatting};

use crate::kinds::{
    CODE, DELIMITER, EMPHASIS, HEADING, HEADING_DELIMITER, HEADING_LEVEL, LIST_DELIMITER,
    LIST_ITEM, MAX_HEADING_LEVEL, STRONG,
};

/// Attribute names set by [`formatting`].
pub mod attribute {
    pub const FAMILY: &str = "family";
    pub const SIZE: &str = "size";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const HEADING_LEVEL: &str = "heading_level";
    pub const LIST_ITEM: &str = "list_item";
    /// Visible markup characters, typically drawn dimmed.
    pub const MARKUP: &str = "markup";
}

pub const BODY_FAMILY: &str = "body";
pub const CODE_FAMILY: &str = "monospace";
pub const BODY_SIZE: i64 = 16;

pub fn formatting() -> Formatting {
    Formatting::new()
        .with_defaults(
            AttributeSet::new()
                .with(attribute::FAMILY, BODY_FAMILY)
                .with(attribute::SIZE, BODY_SIZE),
        )
        .format(HEADING, |node, attributes| {
            let level = node.property(&HEADING_LEVEL).copied().unwrap_or(1);
            attributes.set(attribute::BOLD, true);
            attributes.set(attribute::HEADING_LEVEL, level as i64);
            attributes.set(attribute::SIZE, heading_size(level));
        })
        .format(HEADING_DELIMITER, |_, attributes| {
            attributes.set(attribute::MARKUP, true)
        })
        .format(LIST_ITEM, |_, attributes| {
            attributes.set(attribute::LIST_ITEM, true)
        })
        .format(STRONG, |_, attributes| attributes.set(attribute::BOLD, true))
        .format(EMPHASIS, |_, attributes| {
            attributes.set(attribute::ITALIC, true)
        })
        .format(CODE, |_, attributes| {
            attributes.set(attribute::FAMILY, CODE_FAMILY)
        })
        .hide(DELIMITER)
        .replace(LIST_DELIMITER, |_, raw| Some(bullet(raw)))
}

/// Two points larger per level above the deepest.
fn heading_size(level: usize) -> i64 {
    let steps = MAX_HEADING_LEVEL.saturating_sub(level) as i64;
    BODY_SIZE + 2 * steps
}

/// Keeps the indentation and swaps `-` or `*` for a bullet.
fn bullet(marker: &str) -> String {
    let indent = marker.len() - marker.trim_start_matches(' ').len();
    format!("{}• ", " ".repeat(indent))
}
