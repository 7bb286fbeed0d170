use crate::parsing::node::SyntaxTreeNode;

/// Panics if `root` is longer than the buffer or any interior node's length
/// differs from the sum of its children's.
pub fn check(buffer_length: usize, root: &SyntaxTreeNode) {
    assert!(
        root.length() <= buffer_length,
        "root spans {} bytes but the buffer holds {}",
        root.length(),
        buffer_length
    );
    check_node(root, 0);
}

fn check_node(node: &SyntaxTreeNode, start: usize) {
    if node.is_leaf() {
        return;
    }
    let sum: usize = node.children().iter().map(|child| child.length()).sum();
    assert_eq!(
        node.length(),
        sum,
        "{} at {start} has length {} but its children sum to {sum}",
        node.kind(),
        node.length()
    );
    let mut offset = start;
    for child in node.children() {
        check_node(child, offset);
        offset += child.length();
    }
}
