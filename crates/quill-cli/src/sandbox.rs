//! Sandbox path validation for file and git tools

use std::path::{Component, Path, PathBuf};

/// Root directory every file-touching tool is confined to.
///
/// Validation is lexical: the candidate is made absolute against the
/// root, `.` and `..` components are resolved without touching the
/// filesystem, and the result must stay at or below the root. Symlinks
/// are not chased; this guards against model mistakes, not adversaries.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a path, returning its normalized absolute form.
    ///
    /// The error is operator-readable text suitable for a tool result.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let candidate = Path::new(path);
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        let normalized = normalize(&absolute);

        if normalized == self.root || normalized.starts_with(&self.root) {
            Ok(normalized)
        } else {
            Err(format!(
                "Access denied: path '{}' is outside the project directory '{}'",
                path,
                self.root.display()
            ))
        }
    }

    /// Path relative to the sandbox root, for display
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Resolve `.` and `..` lexically
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
