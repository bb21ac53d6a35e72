//! Loading wiring scripts and project manifests from TOML.

use crate::config::schema::{ProjectManifest, ValidationError, WiringScript};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        message: String,
    },
    Validation(ValidationError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Toml { path, message } => match path {
                Some(path) => write!(f, "invalid TOML in {}: {message}", path.display()),
                None => write!(f, "invalid TOML: {message}"),
            },
            ConfigError::Validation(err) => write!(f, "invalid wiring script: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { .. } => None,
            ConfigError::Validation(err) => Some(err),
        }
    }
}

/// Parse and validate a wiring script from TOML text.
pub fn load_script_from_str(text: &str) -> Result<WiringScript, ConfigError> {
    let script: WiringScript =
        toml_edit::de::from_str(text).map_err(|err| ConfigError::Toml {
            path: None,
            message: err.to_string(),
        })?;
    script.validate().map_err(ConfigError::Validation)?;
    Ok(script)
}

/// Read, parse, and validate a wiring script file.
pub fn load_script_from_path(path: &Path) -> Result<WiringScript, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_script_from_str(&text).map_err(|err| match err {
        ConfigError::Toml { message, .. } => ConfigError::Toml {
            path: Some(path.to_path_buf()),
            message,
        },
        other => other,
    })
}

/// Read the project manifest the generator left at the project root.
pub fn load_manifest_from_path(path: &Path) -> Result<ProjectManifest, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml_edit::de::from_str(&text).map_err(|err| ConfigError::Toml {
        path: Some(path.to_path_buf()),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ActionOp;

    const SCRIPT: &str = r#"
[meta]
name = "add-auth-context"
description = "Wire the auth context into the router"
version_range = ">=0.1.0, <0.3.0"

[anchor]
function = "Routes"
receiver = "router"

[[actions]]
id = "import-auth"
type = "add-import"
file = "internal/server/routes.go"
import = "{module}/internal/auth"
alias = "authApp"

[[actions]]
id = "init-auth"
type = "add-dependency"
file = "internal/server/routes.go"
code = "authHandler := authApp.NewHandler()"

[[actions]]
id = "route-auth"
type = "add-route"
file = "internal/server/routes.go"
code = "router.POST(\"/login\", authHandler.Login)"
"#;

    #[test]
    fn parses_full_script() {
        let script = load_script_from_str(SCRIPT).unwrap();
        assert_eq!(script.meta.name, "add-auth-context");
        assert_eq!(script.anchor.function, "Routes");
        assert_eq!(script.actions.len(), 3);

        assert!(matches!(
            &script.actions[0].op,
            ActionOp::AddImport { import, alias: Some(alias) }
                if import == "{module}/internal/auth" && alias == "authApp"
        ));
        assert!(matches!(&script.actions[1].op, ActionOp::AddDependency { .. }));
        assert!(matches!(&script.actions[2].op, ActionOp::AddRoute { .. }));
    }

    #[test]
    fn anchor_defaults_when_section_missing() {
        let script = load_script_from_str(
            "[[actions]]\nid = \"a\"\ntype = \"add-route\"\nfile = \"r.go\"\ncode = \"router.GET(\\\"/\\\", h)\"\n",
        )
        .unwrap();
        assert_eq!(script.anchor.function, "Routes");
        assert_eq!(script.anchor.receiver, "router");
    }

    #[test]
    fn rejects_unknown_action_type() {
        let result = load_script_from_str(
            "[[actions]]\nid = \"a\"\ntype = \"rename-symbol\"\nfile = \"r.go\"\ncode = \"x\"\n",
        );
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn rejects_empty_action_list() {
        let result = load_script_from_str("[meta]\nname = \"empty\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_blank_required_field() {
        let result = load_script_from_str(
            "[[actions]]\nid = \"a\"\ntype = \"add-route\"\nfile = \"r.go\"\ncode = \"  \"\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn parses_manifest() {
        let manifest: ProjectManifest = toml_edit::de::from_str(
            "module = \"example.com/app\"\ngenerator_version = \"0.2.1\"\n",
        )
        .unwrap();
        assert_eq!(manifest.module, "example.com/app");
        assert_eq!(manifest.generator_version, "0.2.1");
    }

    #[test]
    fn manifest_version_defaults_when_absent() {
        let manifest: ProjectManifest =
            toml_edit::de::from_str("module = \"example.com/app\"\n").unwrap();
        assert_eq!(manifest.generator_version, "0.0.0");
    }
}
