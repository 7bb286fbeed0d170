//! Node types and properties produced by the minimark grammar.

use textmarkup_engine::parsing::{NodeType, PropertyKey};

// Blocks
pub const DOCUMENT: NodeType = NodeType::new("document");
pub const HEADING: NodeType = NodeType::new("heading");
pub const PARAGRAPH: NodeType = NodeType::new("paragraph");
pub const LIST_ITEM: NodeType = NodeType::new("listItem");
pub const BLANK_LINE: NodeType = NodeType::new("blankLine");

// Inlines
pub const TEXT: NodeType = NodeType::new("text");
pub const STRONG: NodeType = NodeType::new("strong");
pub const EMPHASIS: NodeType = NodeType::new("emphasis");
pub const CODE: NodeType = NodeType::new("code");

// Markup characters
/// `**`, `*` or `` ` `` around an inline.
pub const DELIMITER: NodeType = NodeType::new("delimiter");
/// `#`s and the space after them.
pub const HEADING_DELIMITER: NodeType = NodeType::new("headingDelimiter");
/// Indentation, `-` or `*`, and the space after it.
pub const LIST_DELIMITER: NodeType = NodeType::new("listDelimiter");

/// Number of `#`s, set on [`HEADING`] nodes.
pub const HEADING_LEVEL: PropertyKey<usize> = PropertyKey::new("headingLevel");

/// Deepest heading level the grammar recognizes.
pub const MAX_HEADING_LEVEL: usize = 6;
