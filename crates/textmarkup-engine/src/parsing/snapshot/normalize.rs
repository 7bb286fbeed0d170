use std::fmt::Write;

use serde::Serialize;
use xi_rope::Rope;

use crate::parsing::node::SyntaxTreeNode;
use crate::parsing::text::preview;

#[derive(Debug, Serialize)]
pub struct TreeSnap {
    pub kind: String,
    pub span: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnap>,
}

/// Converts a tree to a serializable form with absolute spans. Leaves carry a
/// preview of their text.
pub fn normalize(rope: &Rope, root: &SyntaxTreeNode) -> TreeSnap {
    normalize_at(rope, root, 0)
}

fn normalize_at(rope: &Rope, node: &SyntaxTreeNode, start: usize) -> TreeSnap {
    let end = start + node.length();
    let mut offset = start;
    let children = node
        .children()
        .iter()
        .map(|child| {
            let snap = normalize_at(rope, child, offset);
            offset += child.length();
            snap
        })
        .collect();
    TreeSnap {
        kind: node.kind().name().to_string(),
        span: (start, end),
        text: node.is_leaf().then(|| preview(rope, start..end, 40)),
        properties: node.properties().names().map(str::to_string).collect(),
        children,
    }
}

/// One line per node, indented by depth:
///
/// ```text
/// heading 0..5
///   documentFragment 0..2 "# "
/// ```
pub fn format_tree(rope: &Rope, root: &SyntaxTreeNode) -> String {
    let mut out = String::new();
    write_snap(&mut out, &normalize(rope, root), 0);
    out
}

fn write_snap(out: &mut String, snap: &TreeSnap, depth: usize) {
    let _ = write!(
        out,
        "{:indent$}{} {}..{}",
        "",
        snap.kind,
        snap.span.0,
        snap.span.1,
        indent = depth * 2
    );
    if !snap.properties.is_empty() {
        let _ = write!(out, " [{}]", snap.properties.join(", "));
    }
    if let Some(text) = &snap.text {
        let _ = write!(out, " {text:?}");
    }
    out.push('\n');
    for child in &snap.children {
        write_snap(out, child, depth + 1);
    }
}
