//! Patch sessions: load, locate, compile, dedupe, splice, serialize.

use crate::edit::{atomic_write, Splice};
use crate::patch::anchor::{self, AnchorSpec};
use crate::patch::canon;
use crate::patch::errors::PatchError;
use crate::patch::fragment;
use crate::patch::imports::{self, ImportError, ImportPlan, ImportSpec};
use crate::ts::GoParser;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// One mutation to perform against a target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchRequest {
    /// Add an import spec to the file's import block.
    AddImport { path: String, alias: Option<String> },
    /// Insert a dependency/initialization statement ahead of the wiring
    /// block in the anchor function.
    AddStatementBeforeAnchor { source: String },
    /// Insert a route-registration statement just past the wiring block in
    /// the anchor function.
    AddStatementAfterAnchor { source: String },
}

/// Result of applying one patch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "PatchOutcome should be checked for applied/already-applied"]
pub enum PatchOutcome {
    /// The buffer was changed.
    Applied,
    /// An equivalent import or statement was already present.
    AlreadyApplied,
}

/// Where a compiled statement lands relative to the wiring block.
#[derive(Debug, Clone, Copy)]
enum Placement {
    BeforeBlock,
    AfterBlock,
}

/// A patch session over one target file.
///
/// Load once, apply any number of requests, commit once. Each request
/// re-parses the current buffer, computes one verified splice, and adopts
/// the spliced buffer only after it re-parses cleanly; a failed request
/// leaves the buffer untouched. Nothing reaches disk before [`commit`].
///
/// [`commit`]: PatchSession::commit
pub struct PatchSession {
    path: PathBuf,
    anchor: AnchorSpec,
    source: String,
    parser: GoParser,
    dirty: bool,
}

impl PatchSession {
    /// Open a session: read the file and reject it unless it parses cleanly.
    pub fn open(path: impl AsRef<Path>, anchor: AnchorSpec) -> Result<Self, PatchError> {
        let path = path.as_ref().to_path_buf();
        let source = fs::read_to_string(&path).map_err(|source| PatchError::Io {
            path: path.clone(),
            source,
        })?;

        let mut parser = GoParser::new().map_err(|source| PatchError::Parse {
            path: path.clone(),
            source,
        })?;
        parser
            .parse_valid(&source)
            .map_err(|source| PatchError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            anchor,
            source,
            parser,
            dirty: false,
        })
    }

    /// The target file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current (possibly patched) source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether any request has changed the buffer since open.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply one patch request to the session buffer.
    pub fn apply(&mut self, request: &PatchRequest) -> Result<PatchOutcome, PatchError> {
        let splice = match request {
            PatchRequest::AddImport { path, alias } => {
                match self.plan_import(&ImportSpec::new(path.clone(), alias.clone()))? {
                    Some(splice) => splice,
                    None => return Ok(PatchOutcome::AlreadyApplied),
                }
            }
            PatchRequest::AddStatementBeforeAnchor { source } => {
                match self.plan_statement(source, Placement::BeforeBlock)? {
                    Some(splice) => splice,
                    None => return Ok(PatchOutcome::AlreadyApplied),
                }
            }
            PatchRequest::AddStatementAfterAnchor { source } => {
                match self.plan_statement(source, Placement::AfterBlock)? {
                    Some(splice) => splice,
                    None => return Ok(PatchOutcome::AlreadyApplied),
                }
            }
        };

        let candidate = splice.apply(&self.source)?;

        // A splice that breaks the tree is discarded wholesale; the session
        // keeps its previous buffer.
        let broken = self
            .parser
            .parse_with_source(&candidate)
            .map(|parsed| parsed.has_errors())
            .unwrap_or(true);
        if broken {
            return Err(PatchError::BrokenSplice {
                path: self.path.clone(),
            });
        }

        self.source = candidate;
        self.dirty = true;
        Ok(PatchOutcome::Applied)
    }

    /// Write the session buffer back over the target file atomically.
    ///
    /// A no-op when no request changed the buffer, preserving the original
    /// bytes exactly.
    pub fn commit(self) -> Result<(), PatchError> {
        if !self.dirty {
            return Ok(());
        }
        atomic_write(&self.path, self.source.as_bytes())?;
        Ok(())
    }

    fn plan_import(&mut self, spec: &ImportSpec) -> Result<Option<Splice>, PatchError> {
        let parsed = self
            .parser
            .parse_with_source(&self.source)
            .map_err(|source| PatchError::Parse {
                path: self.path.clone(),
                source,
            })?;

        match imports::plan_import(&parsed, spec) {
            Ok(ImportPlan::AlreadyPresent) => Ok(None),
            Ok(ImportPlan::Splice(splice)) => Ok(Some(splice)),
            Err(ImportError::MissingPackageClause) => Err(PatchError::MissingPackageClause {
                path: self.path.clone(),
            }),
        }
    }

    fn plan_statement(
        &mut self,
        snippet: &str,
        placement: Placement,
    ) -> Result<Option<Splice>, PatchError> {
        let fragment = fragment::compile_statement(&mut self.parser, snippet)?;

        let parsed = self
            .parser
            .parse_with_source(&self.source)
            .map_err(|source| PatchError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let func = anchor::find_function(parsed.root_node(), &self.source, &self.anchor.function)
            .ok_or_else(|| PatchError::NoAnchor {
                function: self.anchor.function.clone(),
                path: self.path.clone(),
            })?;
        let body = anchor::function_body(func).ok_or_else(|| PatchError::NoAnchor {
            function: self.anchor.function.clone(),
            path: self.path.clone(),
        })?;
        let stmts = anchor::body_statements(func);

        // Dedup against every statement in the anchor body.
        for stmt in &stmts {
            if canon::canonical(*stmt, &self.source) == fragment.canonical() {
                return Ok(None);
            }
        }

        let splice = match placement {
            Placement::AfterBlock => {
                match anchor::last_wiring_index(&stmts, &self.source, &self.anchor.receiver) {
                    Some(i) => insert_after(&self.source, stmts[i], fragment.text()),
                    None => insert_at_block_end(&self.source, body, fragment.text()),
                }
            }
            Placement::BeforeBlock => {
                match anchor::first_wiring_index(&stmts, &self.source, &self.anchor.receiver) {
                    Some(i) => insert_before(&self.source, stmts[i], fragment.text()),
                    None => insert_at_block_end(&self.source, body, fragment.text()),
                }
            }
        };

        Ok(Some(splice))
    }
}

/// Apply exactly one patch request to a file: load, patch, write back.
///
/// This is the legacy one-request-per-session contract; callers with several
/// requests against one file should hold a [`PatchSession`] instead and
/// commit once.
pub fn apply_patch(
    path: impl AsRef<Path>,
    anchor: &AnchorSpec,
    request: &PatchRequest,
) -> Result<PatchOutcome, PatchError> {
    let mut session = PatchSession::open(path, anchor.clone())?;
    let outcome = session.apply(request)?;
    session.commit()?;
    Ok(outcome)
}

fn line_start(source: &str, at: usize) -> usize {
    source[..at].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading whitespace of the line containing `at`.
fn line_indent(source: &str, at: usize) -> &str {
    let start = line_start(source, at);
    let line = &source[start..];
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}

/// Insert `text` as a new statement directly after `node`.
fn insert_after(source: &str, node: Node<'_>, text: &str) -> Splice {
    let end = node.end_byte();
    let rest_of_line = source[end..].split('\n').next().unwrap_or("");
    if rest_of_line.trim().is_empty() {
        let indent = line_indent(source, node.start_byte());
        Splice::insert(end, format!("\n{indent}{text}"))
    } else {
        // Reference statement shares its line with following tokens.
        Splice::insert(end, format!("; {text}"))
    }
}

/// Insert `text` as a new statement directly before `node`.
fn insert_before(source: &str, node: Node<'_>, text: &str) -> Splice {
    let start = node.start_byte();
    let prefix = &source[line_start(source, start)..start];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        Splice::insert(start, format!("{text}\n{prefix}"))
    } else {
        Splice::insert(start, format!("{text}; "))
    }
}

/// Insert `text` as the last statement of a block body.
fn insert_at_block_end(source: &str, body: Node<'_>, text: &str) -> Splice {
    let close = closing_brace(body);
    let pos = close
        .map(|n| n.start_byte())
        .unwrap_or_else(|| body.end_byte().saturating_sub(1));

    let start = line_start(source, pos);
    let prefix = &source[start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        // Closing brace on its own line: new statement goes one level in.
        return Splice::insert(start, format!("{prefix}\t{text}\n"));
    }

    let has_stmts = body.named_child_count() > 0;
    if has_stmts {
        Splice::insert(pos, format!("; {text} "))
    } else if source[..pos].ends_with(char::is_whitespace) {
        Splice::insert(pos, format!("{text} "))
    } else {
        Splice::insert(pos, format!(" {text} "))
    }
}

fn closing_brace(body: Node<'_>) -> Option<Node<'_>> {
    let mut found = None;
    for i in 0..body.child_count() {
        if let Some(child) = body.child(i) {
            if child.kind() == "}" {
                found = Some(child);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTER_GO: &str = r#"package routes

import (
	"net/http"
)

func Routes() {
	var router = NewRouter()
	router.GET("/", h1)
	router.GET("/health", h2)
}
"#;

    fn session_with(source: &str) -> (tempfile::TempDir, PatchSession) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.go");
        fs::write(&path, source).unwrap();
        let session = PatchSession::open(&path, AnchorSpec::default()).unwrap();
        (dir, session)
    }

    #[test]
    fn open_rejects_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.go");
        fs::write(&path, "package routes\n\nfunc Routes( {\n").unwrap();

        let result = PatchSession::open(&path, AnchorSpec::default());
        assert!(matches!(result, Err(PatchError::Parse { .. })));
    }

    #[test]
    fn route_lands_after_wiring_block() {
        let (_dir, mut session) = session_with(ROUTER_GO);

        let outcome = session
            .apply(&PatchRequest::AddStatementAfterAnchor {
                source: "router.GET(\"/login\", h3)".to_string(),
            })
            .unwrap();

        assert_eq!(outcome, PatchOutcome::Applied);
        let expected = "\trouter.GET(\"/\", h1)\n\trouter.GET(\"/health\", h2)\n\trouter.GET(\"/login\", h3)\n";
        assert!(session.source().contains(expected), "{}", session.source());
    }

    #[test]
    fn dependency_lands_before_wiring_block() {
        let (_dir, mut session) = session_with(ROUTER_GO);

        session
            .apply(&PatchRequest::AddStatementBeforeAnchor {
                source: "h3 := auth.NewHandler()".to_string(),
            })
            .unwrap();

        let expected =
            "\tvar router = NewRouter()\n\th3 := auth.NewHandler()\n\trouter.GET(\"/\", h1)\n";
        assert!(session.source().contains(expected), "{}", session.source());
    }

    #[test]
    fn statement_insertion_is_idempotent() {
        let (_dir, mut session) = session_with(ROUTER_GO);
        let request = PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/login\", h3)".to_string(),
        };

        assert_eq!(session.apply(&request).unwrap(), PatchOutcome::Applied);
        let once = session.source().to_string();
        assert_eq!(
            session.apply(&request).unwrap(),
            PatchOutcome::AlreadyApplied
        );
        assert_eq!(session.source(), once);
    }

    #[test]
    fn placement_holds_with_trailing_non_wiring_statement() {
        let source = "package routes\n\nfunc Routes() {\n\tvar router = NewRouter()\n\trouter.GET(\"/\", h1)\n\tlog.Println(\"wired\")\n}\n";
        let (_dir, mut session) = session_with(source);
        let before = PatchRequest::AddStatementBeforeAnchor {
            source: "h2 := auth.NewHandler()".to_string(),
        };
        let after = PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/login\", h2)".to_string(),
        };

        assert_eq!(session.apply(&before).unwrap(), PatchOutcome::Applied);
        assert_eq!(session.apply(&after).unwrap(), PatchOutcome::Applied);

        // Dependency ahead of the wiring block, route after its last call,
        // trailing statement untouched.
        assert_eq!(
            session.source(),
            "package routes\n\nfunc Routes() {\n\tvar router = NewRouter()\n\th2 := auth.NewHandler()\n\trouter.GET(\"/\", h1)\n\trouter.GET(\"/login\", h2)\n\tlog.Println(\"wired\")\n}\n"
        );

        assert_eq!(session.apply(&before).unwrap(), PatchOutcome::AlreadyApplied);
        assert_eq!(session.apply(&after).unwrap(), PatchOutcome::AlreadyApplied);
    }

    #[test]
    fn spacing_variant_counts_as_duplicate() {
        let (_dir, mut session) = session_with(ROUTER_GO);

        let outcome = session
            .apply(&PatchRequest::AddStatementAfterAnchor {
                source: "router . GET( \"/health\" , h2 )".to_string(),
            })
            .unwrap();

        assert_eq!(outcome, PatchOutcome::AlreadyApplied);
    }

    #[test]
    fn insertions_accumulate_in_request_order() {
        let (_dir, mut session) = session_with(ROUTER_GO);

        for route in ["/c", "/d"] {
            session
                .apply(&PatchRequest::AddStatementAfterAnchor {
                    source: format!("router.GET(\"{route}\", h)"),
                })
                .unwrap();
        }

        let c = session.source().find("\"/c\"").unwrap();
        let d = session.source().find("\"/d\"").unwrap();
        let health = session.source().find("\"/health\"").unwrap();
        assert!(health < c && c < d);
    }

    #[test]
    fn fallback_appends_at_end_of_body() {
        let source = "package routes\n\nfunc Routes() {\n\tsetup()\n}\n";
        let (_dir, mut session) = session_with(source);

        session
            .apply(&PatchRequest::AddStatementAfterAnchor {
                source: "router.GET(\"/\", h1)".to_string(),
            })
            .unwrap();

        assert_eq!(
            session.source(),
            "package routes\n\nfunc Routes() {\n\tsetup()\n\trouter.GET(\"/\", h1)\n}\n"
        );
    }

    #[test]
    fn fallback_into_empty_body() {
        let source = "package routes\n\nfunc Routes() {\n}\n";
        let (_dir, mut session) = session_with(source);

        session
            .apply(&PatchRequest::AddStatementAfterAnchor {
                source: "router.GET(\"/\", h1)".to_string(),
            })
            .unwrap();

        assert_eq!(
            session.source(),
            "package routes\n\nfunc Routes() {\n\trouter.GET(\"/\", h1)\n}\n"
        );
    }

    #[test]
    fn single_line_body_keeps_statement_order() {
        let source =
            "package routes\n\nfunc Routes() { var router = NewRouter(); router.GET(\"/\", h1) }\n";
        let (_dir, mut session) = session_with(source);
        let request = PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/login\", h2)".to_string(),
        };

        session.apply(&request).unwrap();
        assert_eq!(
            session.source(),
            "package routes\n\nfunc Routes() { var router = NewRouter(); router.GET(\"/\", h1); router.GET(\"/login\", h2) }\n"
        );

        assert_eq!(
            session.apply(&request).unwrap(),
            PatchOutcome::AlreadyApplied
        );
    }

    #[test]
    fn missing_anchor_is_a_hard_error_for_statements() {
        let source = "package routes\n\nfunc Register() {}\n";
        let (_dir, mut session) = session_with(source);

        let result = session.apply(&PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/\", h1)".to_string(),
        });
        assert!(matches!(result, Err(PatchError::NoAnchor { .. })));
    }

    #[test]
    fn imports_do_not_need_the_anchor() {
        let source = "package routes\n\nfunc Register() {}\n";
        let (_dir, mut session) = session_with(source);

        let outcome = session
            .apply(&PatchRequest::AddImport {
                path: "net/http".to_string(),
                alias: None,
            })
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Applied);
        assert!(session.source().contains("import \"net/http\""));
    }

    #[test]
    fn failed_request_leaves_buffer_untouched() {
        let (_dir, mut session) = session_with(ROUTER_GO);

        let result = session.apply(&PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/login\"".to_string(),
        });
        assert!(matches!(result, Err(PatchError::FragmentSyntax { .. })));
        assert_eq!(session.source(), ROUTER_GO);
        assert!(!session.is_dirty());
    }

    #[test]
    fn commit_writes_once_and_preserves_untouched_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.go");
        fs::write(&path, ROUTER_GO).unwrap();

        let mut session = PatchSession::open(&path, AnchorSpec::default()).unwrap();
        session
            .apply(&PatchRequest::AddImport {
                path: "example.com/app/auth".to_string(),
                alias: Some("authApp".to_string()),
            })
            .unwrap();
        session
            .apply(&PatchRequest::AddStatementAfterAnchor {
                source: "router.GET(\"/login\", h3)".to_string(),
            })
            .unwrap();
        session.commit().unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("authApp \"example.com/app/auth\""));
        assert!(written.contains("router.GET(\"/login\", h3)"));
        // Declarations not touched by the patch keep their exact bytes.
        assert!(written.contains("func Routes() {\n\tvar router = NewRouter()\n"));
    }

    #[test]
    fn clean_session_commit_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.go");
        fs::write(&path, ROUTER_GO).unwrap();

        let session = PatchSession::open(&path, AnchorSpec::default()).unwrap();
        session.commit().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), ROUTER_GO);
    }

    #[test]
    fn one_shot_apply_patch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.go");
        fs::write(&path, ROUTER_GO).unwrap();

        let request = PatchRequest::AddStatementAfterAnchor {
            source: "router.GET(\"/login\", h3)".to_string(),
        };
        let anchor = AnchorSpec::default();

        assert_eq!(
            apply_patch(&path, &anchor, &request).unwrap(),
            PatchOutcome::Applied
        );
        assert_eq!(
            apply_patch(&path, &anchor, &request).unwrap(),
            PatchOutcome::AlreadyApplied
        );

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("/login").count(), 1);
    }
}
