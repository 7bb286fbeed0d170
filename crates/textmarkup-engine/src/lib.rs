pub mod editing;
pub mod parsing;

// Re-export key types for easier usage
pub use editing::{AttributeSet, ChangeDelegate, Cmd, Formatting, ParsedText, Patch, TextChange};
pub use parsing::{
    Grammar, GrammarBuilder, NodeType, ParseBuffer, ParseError, RuleId, SyntaxTreeNode,
};
