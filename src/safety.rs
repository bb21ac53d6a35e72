use std::path::{Path, PathBuf};
use thiserror::Error;

/// Project safety checks to prevent patching files outside the target project.
#[derive(Debug, Clone)]
pub struct ProjectGuard {
    /// Absolute path to project root
    project_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("path is outside project: {path} (project: {project})")]
    OutsideProject { path: PathBuf, project: PathBuf },

    #[error("path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl ProjectGuard {
    /// Create a new project guard with the given root.
    ///
    /// The project root will be canonicalized to handle symlinks correctly.
    /// Vendored module sources and git metadata inside the project are never
    /// valid patch targets.
    pub fn new(project_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let project_root = project_root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();
        for dir in ["vendor", ".git"] {
            if let Ok(path) = project_root.join(dir).canonicalize() {
                forbidden_paths.push(path);
            }
        }

        Ok(Self {
            project_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to patch.
    ///
    /// Returns the canonicalized absolute path if safe. Relative paths are
    /// resolved against the project root.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        // Canonicalize to resolve symlinks and .. components
        let canonical = absolute.canonicalize()?;

        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.project_root) {
            return Err(SafetyError::OutsideProject {
                path: canonical.to_path_buf(),
                project: self.project_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the project root.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn validate_path_inside_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path();
        let guard = ProjectGuard::new(project).unwrap();

        let file = project.join("internal/routes/router.go");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        assert!(guard.validate_path(&file).is_ok());
    }

    #[test]
    fn validate_path_outside_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let guard = ProjectGuard::new(&project).unwrap();

        let outside = temp_dir.path().join("outside.go");
        fs::write(&outside, b"").unwrap();

        let result = guard.validate_path(&outside);
        assert!(matches!(result, Err(SafetyError::OutsideProject { .. })));
    }

    #[test]
    fn validate_path_in_vendor() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path();
        let vendored = project.join("vendor/example.com/dep/dep.go");
        fs::create_dir_all(vendored.parent().unwrap()).unwrap();
        fs::write(&vendored, b"").unwrap();

        let guard = ProjectGuard::new(project).unwrap();

        let result = guard.validate_path(&vendored);
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn validate_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path();
        let guard = ProjectGuard::new(project).unwrap();

        let file = project.join("main.go");
        fs::write(&file, b"").unwrap();

        assert!(guard.validate_path("main.go").is_ok());
    }

    #[test]
    #[cfg(unix)]
    fn validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let project = temp_dir.path().join("project");
        fs::create_dir_all(&project).unwrap();

        let outside = temp_dir.path().join("outside.go");
        fs::write(&outside, b"").unwrap();

        let link = project.join("escape.go");
        symlink(&outside, &link).unwrap();

        let guard = ProjectGuard::new(&project).unwrap();
        let result = guard.validate_path(&link);

        // Canonical path resolves outside the project
        assert!(matches!(result, Err(SafetyError::OutsideProject { .. })));
    }
}
