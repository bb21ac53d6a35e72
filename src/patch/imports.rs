//! Planning import insertions.
//!
//! Dedup is exact on the (path, alias) pair: a bare import only matches
//! another bare import of the same path, and the same path under a second
//! alias is a distinct spec. The first import declaration in document order
//! is the canonical insertion target; when none exists a new declaration is
//! created directly after the package clause.

use crate::edit::Splice;
use crate::ts::ParsedSource;
use thiserror::Error;
use tree_sitter::Node;

/// One `(path, alias)` pair from an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    pub alias: Option<String>,
}

impl ImportSpec {
    pub fn new(path: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            path: path.into(),
            alias,
        }
    }

    /// Go source rendering: `alias "path"` or `"path"`.
    fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} \"{}\"", alias, self.path),
            None => format!("\"{}\"", self.path),
        }
    }
}

/// What an AddImport request resolves to against one parsed file.
#[derive(Debug)]
pub enum ImportPlan {
    /// The exact (path, alias) pair is already imported.
    AlreadyPresent,
    /// The splice that adds the spec.
    Splice(Splice),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("no package clause found")]
    MissingPackageClause,
}

/// Resolve an AddImport request against a parsed file.
pub fn plan_import(
    parsed: &ParsedSource<'_>,
    spec: &ImportSpec,
) -> Result<ImportPlan, ImportError> {
    let source = parsed.source;
    let root = parsed.root_node();

    let decls = import_declarations(root);

    // Dedup scans every declaration, not just the insertion target.
    for decl in &decls {
        for node in spec_nodes(*decl) {
            if let Some(existing) = spec_parts(node, source) {
                if existing == *spec {
                    return Ok(ImportPlan::AlreadyPresent);
                }
            }
        }
    }

    if let Some(decl) = decls.first() {
        return Ok(ImportPlan::Splice(extend_declaration(*decl, source, spec)));
    }

    // No import declaration: create one as the first declaration after the
    // package clause.
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")
        .ok_or(ImportError::MissingPackageClause)?;

    Ok(ImportPlan::Splice(Splice::insert(
        clause.end_byte(),
        format!("\n\nimport {}", spec.render()),
    )))
}

fn import_declarations<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .filter(|n| n.kind() == "import_declaration")
        .collect()
}

/// The import_spec nodes of one declaration, whether grouped or single.
fn spec_nodes<'t>(decl: Node<'t>) -> Vec<Node<'t>> {
    let mut specs = Vec::new();
    let mut cursor = decl.walk();
    for child in decl.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => specs.push(child),
            "import_spec_list" => {
                let mut list_cursor = child.walk();
                for spec in child.named_children(&mut list_cursor) {
                    if spec.kind() == "import_spec" {
                        specs.push(spec);
                    }
                }
            }
            _ => {}
        }
    }
    specs
}

/// Extract the (path, alias) pair from an import_spec node.
fn spec_parts(spec: Node<'_>, source: &str) -> Option<ImportSpec> {
    let path_node = spec.child_by_field_name("path")?;
    let raw = &source[path_node.byte_range()];
    let path = raw.trim_matches(|c| c == '"' || c == '`').to_string();
    let alias = spec
        .child_by_field_name("name")
        .map(|n| source[n.byte_range()].to_string());
    Some(ImportSpec { path, alias })
}

/// Append a spec to an existing declaration.
fn extend_declaration(decl: Node<'_>, source: &str, spec: &ImportSpec) -> Splice {
    if let Some(list) = grouped_list(decl) {
        if let Some(close) = closing_paren(list) {
            let pos = close.start_byte();
            let line_start = source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let prefix = &source[line_start..pos];
            if prefix.chars().all(|c| c == ' ' || c == '\t') {
                // Closing paren on its own line: add a spec line above it.
                return Splice::insert(line_start, format!("\t{}\n", spec.render()));
            }
            // Single-line group; semicolon-separate.
            return Splice::insert(pos, format!("; {}", spec.render()));
        }
    }

    // Single-spec declaration: rewrite it into a grouped block holding the
    // old spec and the new one.
    let old_text = &source[decl.byte_range()];
    let existing = spec_nodes(decl)
        .first()
        .map(|n| source[n.byte_range()].to_string());
    let new_text = match existing {
        Some(existing) => format!("import (\n\t{}\n\t{}\n)", existing, spec.render()),
        None => format!("import (\n\t{}\n)", spec.render()),
    };
    Splice::replace(decl.start_byte(), decl.end_byte(), new_text, old_text)
}

fn grouped_list(decl: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = decl.walk();
    let found = decl
        .named_children(&mut cursor)
        .find(|n| n.kind() == "import_spec_list");
    found
}

fn closing_paren(list: Node<'_>) -> Option<Node<'_>> {
    let mut found = None;
    for i in 0..list.child_count() {
        if let Some(child) = list.child(i) {
            if child.kind() == ")" {
                found = Some(child);
            }
        }
    }
    found
}
