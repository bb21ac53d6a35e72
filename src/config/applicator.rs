//! Running wiring scripts against a project.
//!
//! Actions run strictly in script order. All actions targeting one file
//! share a single [`PatchSession`], so earlier insertions are visible to
//! later dedup checks and each file is written at most once, at the end.
//! A failed action is reported and the run continues; the version gate is
//! the only whole-script abort.

use crate::config::schema::{ActionOp, ProjectManifest, WiringScript};
use crate::config::version::{self, VersionError};
use crate::patch::errors::PatchError;
use crate::patch::{PatchOutcome, PatchRequest, PatchSession};
use crate::safety::{ProjectGuard, SafetyError};
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of one wiring action.
#[derive(Debug)]
pub enum ActionResult {
    /// The target buffer was changed (or would be, in check mode).
    Applied { file: PathBuf },
    /// An equivalent import or statement was already present.
    AlreadyApplied { file: PathBuf },
    /// The whole script was skipped by the generator version gate.
    SkippedVersion { requirement: String },
    /// The action failed; later actions still ran.
    Failed { reason: String },
}

impl ActionResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionResult::Failed { .. })
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Applied { file } => write!(f, "applied to {}", file.display()),
            ActionResult::AlreadyApplied { file } => {
                write!(f, "already applied to {}", file.display())
            }
            ActionResult::SkippedVersion { requirement } => {
                write!(f, "skipped: generator version outside '{requirement}'")
            }
            ActionResult::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug)]
pub enum ApplicationError {
    Version(VersionError),
    Safety(SafetyError),
    Patch(PatchError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(err) => write!(f, "{err}"),
            ApplicationError::Safety(err) => write!(f, "{err}"),
            ApplicationError::Patch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(err) => Some(err),
            ApplicationError::Safety(err) => Some(err),
            ApplicationError::Patch(err) => Some(err),
        }
    }
}

/// Per-action results of a script run, keyed by action id.
pub type ScriptReport = Vec<(String, ActionResult)>;

/// Run a wiring script against a project and write the changes.
pub fn apply_script(
    script: &WiringScript,
    project_root: &Path,
    manifest: &ProjectManifest,
) -> Result<ScriptReport, ApplicationError> {
    run_script(script, project_root, manifest, true)
}

/// Dry-run a wiring script: everything short of writing files.
///
/// Reports what [`apply_script`] would do, including dedup and anchor
/// failures, without touching the project.
pub fn check_script(
    script: &WiringScript,
    project_root: &Path,
    manifest: &ProjectManifest,
) -> Result<ScriptReport, ApplicationError> {
    run_script(script, project_root, manifest, false)
}

fn run_script(
    script: &WiringScript,
    project_root: &Path,
    manifest: &ProjectManifest,
    commit: bool,
) -> Result<ScriptReport, ApplicationError> {
    let requirement = script.meta.version_range.as_deref();
    let matches = version::matches_requirement(&manifest.generator_version, requirement)
        .map_err(ApplicationError::Version)?;
    if !matches {
        let requirement = requirement.unwrap_or_default().to_string();
        return Ok(script
            .actions
            .iter()
            .map(|action| {
                (
                    action.id.clone(),
                    ActionResult::SkippedVersion {
                        requirement: requirement.clone(),
                    },
                )
            })
            .collect());
    }

    let guard = ProjectGuard::new(project_root).map_err(ApplicationError::Safety)?;
    let anchor = script.anchor.to_spec();

    // Sessions in first-use order so commits are deterministic.
    let mut sessions: Vec<(PathBuf, PatchSession)> = Vec::new();
    let mut report = ScriptReport::new();

    for action in &script.actions {
        let relative = render(&action.file, &manifest.module);
        let file = match guard.validate_path(&relative) {
            Ok(file) => file,
            Err(err) => {
                report.push((action.id.clone(), ActionResult::Failed {
                    reason: err.to_string(),
                }));
                continue;
            }
        };

        let session = match session_for(&mut sessions, &file, &anchor) {
            Ok(session) => session,
            Err(err) => {
                report.push((action.id.clone(), ActionResult::Failed {
                    reason: err.to_string(),
                }));
                continue;
            }
        };

        let request = to_request(&action.op, &manifest.module);
        let result = match session.apply(&request) {
            Ok(PatchOutcome::Applied) => ActionResult::Applied { file },
            Ok(PatchOutcome::AlreadyApplied) => ActionResult::AlreadyApplied { file },
            Err(err) => ActionResult::Failed {
                reason: err.to_string(),
            },
        };
        report.push((action.id.clone(), result));
    }

    if commit {
        for (file, session) in sessions {
            if let Err(err) = session.commit() {
                report.push((
                    format!("commit {}", file.display()),
                    ActionResult::Failed {
                        reason: err.to_string(),
                    },
                ));
            }
        }
    }

    Ok(report)
}

fn session_for<'s>(
    sessions: &'s mut Vec<(PathBuf, PatchSession)>,
    file: &Path,
    anchor: &crate::patch::AnchorSpec,
) -> Result<&'s mut PatchSession, PatchError> {
    if let Some(idx) = sessions.iter().position(|(path, _)| path == file) {
        return Ok(&mut sessions[idx].1);
    }
    let session = PatchSession::open(file, anchor.clone())?;
    sessions.push((file.to_path_buf(), session));
    let idx = sessions.len() - 1;
    Ok(&mut sessions[idx].1)
}

/// Substitute the `{module}` placeholder the generator's templates use.
fn render(text: &str, module: &str) -> String {
    text.replace("{module}", module)
}

fn to_request(op: &ActionOp, module: &str) -> PatchRequest {
    match op {
        ActionOp::AddImport { import, alias } => PatchRequest::AddImport {
            path: render(import, module),
            alias: alias.clone(),
        },
        ActionOp::AddDependency { code } => PatchRequest::AddStatementBeforeAnchor {
            source: render(code, module),
        },
        ActionOp::AddRoute { code } => PatchRequest::AddStatementAfterAnchor {
            source: render(code, module),
        },
    }
}
