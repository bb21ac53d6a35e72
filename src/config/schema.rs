use crate::patch::anchor::{AnchorSpec, DEFAULT_ANCHOR_FUNCTION, DEFAULT_WIRING_RECEIVER};
use serde::Deserialize;
use std::fmt;

/// Name of the project manifest the generator leaves at the project root.
pub const MANIFEST_FILE: &str = "wirepatch.toml";

/// A wiring script: the ordered action list that hooks a new context or
/// plugin into an already-generated project.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WiringScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
}

impl WiringScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.actions.is_empty() {
            issues.push(ValidationIssue::EmptyActionList);
        }

        if self.anchor.function.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                action_id: None,
                field: "anchor.function",
            });
        }
        if self.anchor.receiver.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                action_id: None,
                field: "anchor.receiver",
            });
        }

        for action in &self.actions {
            if action.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    action_id: None,
                    field: "id",
                });
            }
            if action.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    action_id: Some(action.id.clone()),
                    field: "file",
                });
            }

            match &action.op {
                ActionOp::AddImport { import, .. } => {
                    if import.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            action_id: Some(action.id.clone()),
                            field: "import",
                        });
                    }
                }
                ActionOp::AddDependency { code } | ActionOp::AddRoute { code } => {
                    if code.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            action_id: Some(action.id.clone()),
                            field: "code",
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement checked against the project's generator version.
    #[serde(default)]
    pub version_range: Option<String>,
}

/// Anchor convention for every action in the script.
#[derive(Debug, Deserialize, Clone)]
pub struct AnchorConfig {
    #[serde(default = "default_anchor_function")]
    pub function: String,
    #[serde(default = "default_wiring_receiver")]
    pub receiver: String,
}

impl AnchorConfig {
    pub fn to_spec(&self) -> AnchorSpec {
        AnchorSpec::new(self.function.clone(), self.receiver.clone())
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            function: default_anchor_function(),
            receiver: default_wiring_receiver(),
        }
    }
}

fn default_anchor_function() -> String {
    DEFAULT_ANCHOR_FUNCTION.to_string()
}

fn default_wiring_receiver() -> String {
    DEFAULT_WIRING_RECEIVER.to_string()
}

/// One wiring action against one target file.
#[derive(Debug, Deserialize, Clone)]
pub struct ActionDefinition {
    pub id: String,
    /// Target file, relative to the project root. May contain the
    /// `{module}` placeholder.
    pub file: String,
    #[serde(flatten)]
    pub op: ActionOp,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionOp {
    /// Add an import spec to the target's import block.
    AddImport {
        import: String,
        #[serde(default)]
        alias: Option<String>,
    },
    /// Insert a dependency/initialization statement ahead of the wiring
    /// block.
    AddDependency { code: String },
    /// Insert a route registration just past the wiring block.
    AddRoute { code: String },
}

/// Project manifest written by the generator when it scaffolds a project.
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectManifest {
    /// Go module path of the generated project.
    pub module: String,
    /// Version of the generator that scaffolded the project.
    #[serde(default = "default_generator_version")]
    pub generator_version: String,
}

fn default_generator_version() -> String {
    "0.0.0".to_string()
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyActionList,
    MissingField {
        action_id: Option<String>,
        field: &'static str,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyActionList => write!(f, "wiring script contains no actions"),
            ValidationIssue::MissingField { action_id, field } => match action_id {
                Some(id) => write!(f, "action '{id}' missing required field '{field}'"),
                None => write!(f, "script missing required field '{field}'"),
            },
        }
    }
}
