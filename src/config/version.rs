//! Generator version gating for wiring scripts.
//!
//! A script can declare the generator versions whose scaffold layout it
//! understands. Gating happens before any file is touched, so a script
//! written for a newer scaffold never half-applies to an older one.

use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone)]
pub enum VersionError {
    InvalidVersion { value: String, message: String },
    InvalidRequirement { value: String, message: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, message } => {
                write!(f, "invalid generator version '{value}': {message}")
            }
            VersionError::InvalidRequirement { value, message } => {
                write!(f, "invalid version_range '{value}': {message}")
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check a project's generator version against a script's requirement.
///
/// `None` means the script declares no gate and applies everywhere.
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(requirement) = requirement else {
        return Ok(true);
    };

    let version = Version::parse(version).map_err(|err| VersionError::InvalidVersion {
        value: version.to_string(),
        message: err.to_string(),
    })?;
    let req = VersionReq::parse(requirement).map_err(|err| VersionError::InvalidRequirement {
        value: requirement.to_string(),
        message: err.to_string(),
    })?;

    Ok(req.matches(&version))
}
