//! Locating the wiring function and the insertion point inside it.

use tree_sitter::Node;

/// Conventional anchor function name used by the scaffolding templates.
pub const DEFAULT_ANCHOR_FUNCTION: &str = "Routes";

/// Conventional receiver identifier for wiring calls.
pub const DEFAULT_WIRING_RECEIVER: &str = "router";

/// Names of the anchor function and the wiring receiver.
///
/// Both are conventions established by the surrounding templates and are
/// supplied by the caller, typically from a wiring script's `[anchor]`
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    /// Function whose body is the sole mutation target for statements.
    pub function: String,
    /// Receiver identifier that marks a statement as part of the wiring
    /// block (`router` in `router.GET(...)`).
    pub receiver: String,
}

impl AnchorSpec {
    pub fn new(function: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            receiver: receiver.into(),
        }
    }
}

impl Default for AnchorSpec {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR_FUNCTION, DEFAULT_WIRING_RECEIVER)
    }
}

/// Find the anchor function: top-level declarations in document order, first
/// function whose name matches wins.
pub fn find_function<'t>(root: Node<'t>, source: &str, name: &str) -> Option<Node<'t>> {
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        if decl.kind() != "function_declaration" {
            continue;
        }
        let Some(ident) = decl.child_by_field_name("name") else {
            continue;
        };
        if &source[ident.byte_range()] == name {
            return Some(decl);
        }
    }
    None
}

/// The body block of a function declaration.
pub fn function_body(func: Node<'_>) -> Option<Node<'_>> {
    func.child_by_field_name("body")
}

/// Body nodes of a function declaration, in document order.
///
/// Comments are included; they never match the wiring pattern and their
/// canonical form never collides with a statement's, so downstream scans
/// treat them as opaque.
pub fn body_statements(func: Node<'_>) -> Vec<Node<'_>> {
    let Some(body) = function_body(func) else {
        return Vec::new();
    };
    block_statements(body)
}

/// Statements of a block node.
///
/// The grammar wraps a block's statements in a statement_list layer;
/// callers always get the statements themselves.
pub fn block_statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut stmts = Vec::new();
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        if child.kind() == "statement_list" {
            let mut list_cursor = child.walk();
            for stmt in child.named_children(&mut list_cursor) {
                stmts.push(stmt);
            }
        } else {
            stmts.push(child);
        }
    }
    stmts
}

/// A statement is a wiring call when it is an expression statement wrapping
/// a call through the wiring receiver: `router.GET("/", h1)`.
///
/// Chained receivers (`router.Group("/api").GET(...)`) do not count; the
/// operand must be the bare receiver identifier.
pub fn is_wiring_call(stmt: Node<'_>, source: &str, receiver: &str) -> bool {
    if stmt.kind() != "expression_statement" {
        return false;
    }
    let Some(call) = stmt.named_child(0) else {
        return false;
    };
    if call.kind() != "call_expression" {
        return false;
    }
    let Some(callee) = call.child_by_field_name("function") else {
        return false;
    };
    if callee.kind() != "selector_expression" {
        return false;
    }
    let Some(operand) = callee.child_by_field_name("operand") else {
        return false;
    };
    operand.kind() == "identifier" && &source[operand.byte_range()] == receiver
}

/// Index of the last wiring call in a statement list, if any.
///
/// Route statements accumulate just past the existing block, so repeated
/// insertions preserve request order without knowing how many came before.
pub fn last_wiring_index(stmts: &[Node<'_>], source: &str, receiver: &str) -> Option<usize> {
    let mut found = None;
    for (i, stmt) in stmts.iter().enumerate() {
        if is_wiring_call(*stmt, source, receiver) {
            found = Some(i);
        }
    }
    found
}

/// Index of the first wiring call in a statement list, if any.
///
/// Dependency initialization lands just ahead of the wiring block.
pub fn first_wiring_index(stmts: &[Node<'_>], source: &str, receiver: &str) -> Option<usize> {
    stmts
        .iter()
        .position(|stmt| is_wiring_call(*stmt, source, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::{GoParser, ParsedSource};

    const ROUTER_GO: &str = r#"package routes

import "net/http"

func helper() {}

func Routes() {
	var router = NewRouter()
	router.GET("/", h1)
	router.GET("/health", h2)
	log.Println("wired")
}

func Routes() {
	// shadowed duplicate, never reached by the locator
}
"#;

    fn parse<'a>(parser: &mut GoParser, source: &'a str) -> ParsedSource<'a> {
        let parsed = parser.parse_with_source(source).unwrap();
        assert!(!parsed.has_errors());
        parsed
    }

    #[test]
    fn finds_first_matching_function() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, ROUTER_GO);

        let func = find_function(parsed.root_node(), ROUTER_GO, "Routes").unwrap();
        let text = parsed.node_text(func);
        assert!(text.contains("NewRouter"));
        assert!(!text.contains("shadowed"));
    }

    #[test]
    fn missing_function_is_none() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, ROUTER_GO);

        assert!(find_function(parsed.root_node(), ROUTER_GO, "Register").is_none());
    }

    #[test]
    fn body_statements_yields_statements_not_the_list_wrapper() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, ROUTER_GO);

        let func = find_function(parsed.root_node(), ROUTER_GO, "Routes").unwrap();
        let stmts = body_statements(func);

        assert!(stmts.iter().all(|s| s.kind() != "statement_list"));
        assert_eq!(stmts[1].kind(), "expression_statement");
    }

    #[test]
    fn wiring_indices() {
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, ROUTER_GO);

        let func = find_function(parsed.root_node(), ROUTER_GO, "Routes").unwrap();
        let stmts = body_statements(func);

        // var decl, two router calls, one log call
        assert_eq!(stmts.len(), 4);
        assert_eq!(first_wiring_index(&stmts, ROUTER_GO, "router"), Some(1));
        assert_eq!(last_wiring_index(&stmts, ROUTER_GO, "router"), Some(2));
        assert_eq!(last_wiring_index(&stmts, ROUTER_GO, "mux"), None);
    }

    #[test]
    fn chained_receiver_is_not_a_wiring_call() {
        let source = "package p\n\nfunc Routes() {\n\trouter.Group(\"/api\").GET(\"/\", h)\n}\n";
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, source);

        let func = find_function(parsed.root_node(), source, "Routes").unwrap();
        let stmts = body_statements(func);
        assert_eq!(first_wiring_index(&stmts, source, "router"), None);
    }

    #[test]
    fn assignment_is_not_a_wiring_call() {
        let source = "package p\n\nfunc Routes() {\n\trouter := NewRouter()\n}\n";
        let mut parser = GoParser::new().unwrap();
        let parsed = parse(&mut parser, source);

        let func = find_function(parsed.root_node(), source, "Routes").unwrap();
        let stmts = body_statements(func);
        assert_eq!(last_wiring_index(&stmts, source, "router"), None);
    }
}
