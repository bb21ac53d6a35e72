//! Compiling raw statement fragments in a synthetic file shell.

use crate::patch::anchor;
use crate::patch::canon;
use crate::patch::errors::PatchError;
use crate::ts::GoParser;

/// A statement fragment compiled inside a throwaway `package p` / `func f`
/// shell.
///
/// Only the fragment's own text and its canonical rendering flow into a
/// target file; coordinates from the synthetic shell are discarded here so
/// they can never corrupt the layout of the surrounding tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFragment {
    text: String,
    canonical: String,
}

impl CompiledFragment {
    /// The trimmed fragment text, ready to splice.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Canonical rendering used for duplicate suppression.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Parse a raw snippet as exactly one Go statement.
///
/// Anything else - empty input, syntax errors, multiple statements - is a
/// fragment syntax error: a schematic authoring bug, fatal to the request
/// and never retried.
pub fn compile_statement(
    parser: &mut GoParser,
    snippet: &str,
) -> Result<CompiledFragment, PatchError> {
    let fragment_error = || PatchError::FragmentSyntax {
        snippet: snippet.to_string(),
    };

    let text = snippet.trim();
    if text.is_empty() {
        return Err(fragment_error());
    }

    let wrapped = format!("package p\n\nfunc f() {{\n\t{text}\n}}\n");
    let parsed = parser
        .parse_with_source(&wrapped)
        .map_err(|_| fragment_error())?;
    if parsed.has_errors() {
        return Err(fragment_error());
    }

    let root = parsed.root_node();
    let mut cursor = root.walk();
    let func = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "function_declaration")
        .ok_or_else(fragment_error)?;

    let stmts: Vec<_> = anchor::body_statements(func)
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .collect();
    let [stmt] = stmts.as_slice() else {
        return Err(fragment_error());
    };

    Ok(CompiledFragment {
        text: text.to_string(),
        canonical: canon::canonical(*stmt, &wrapped),
    })
}
