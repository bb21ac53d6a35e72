//! Canonical, position-independent rendering of syntax nodes.
//!
//! Two statements are "the same" exactly when their canonical renderings
//! match. The comparison is syntactic: token-identical statements with
//! different spacing are equal, semantically equivalent rewrites are not.

use tree_sitter::Node;

/// Literal kinds whose interior whitespace is significant and must not be
/// re-tokenized.
const ATOMIC_KINDS: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "rune_literal",
];

/// Render a node to its canonical form: token leaves joined by single
/// spaces, with source coordinates erased.
pub fn canonical(node: Node<'_>, source: &str) -> String {
    let mut tokens = Vec::new();
    collect_tokens(node, source, &mut tokens);
    tokens.join(" ")
}

fn collect_tokens(node: Node<'_>, source: &str, out: &mut Vec<String>) {
    if node.child_count() == 0 || ATOMIC_KINDS.contains(&node.kind()) {
        let text = source[node.byte_range()].trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(child, source, out);
    }
}

/// Structural equality of two nodes, possibly from different trees.
pub fn same_node(a: Node<'_>, a_source: &str, b: Node<'_>, b_source: &str) -> bool {
    canonical(a, a_source) == canonical(b, b_source)
}
