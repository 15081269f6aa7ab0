//! Allow-list containment checks for filesystem targets.
//!
//! Every tool parameter that names a path goes through [`PathGuard::allowed`]
//! before the tool runs. Containment is tested on canonical paths with
//! component-wise prefix matching, so `/foo` never matches `/foobar` and
//! symlinks cannot escape a root.

use std::path::{Component, Path, PathBuf};

/// Tests whether a target path lies inside one of the allow-listed roots.
///
/// Roots are canonical absolute directories, validated at config load.
#[derive(Debug, Clone)]
pub struct PathGuard {
    roots: Vec<PathBuf>,
}

impl PathGuard {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Resolve `target` to its canonical absolute form.
    ///
    /// The target itself may not exist yet (file creation): the longest
    /// existing ancestor is canonicalized and the remaining components are
    /// re-appended, rejecting any `..` in the non-existing tail. Relative
    /// paths and unresolvable paths yield `None`.
    #[must_use]
    pub fn resolve(&self, target: &Path) -> Option<PathBuf> {
        if !target.is_absolute() {
            return None;
        }

        let mut existing = target.to_path_buf();
        let mut tail: Vec<std::ffi::OsString> = Vec::new();
        loop {
            if existing.exists() {
                break;
            }
            let name = existing.file_name()?.to_os_string();
            tail.push(name);
            existing = existing.parent()?.to_path_buf();
        }

        let mut resolved = existing.canonicalize().ok()?;
        for component in tail.iter().rev() {
            match Path::new(component).components().next() {
                Some(Component::Normal(_)) => resolved.push(component),
                // `..` or `.` in a non-existing suffix cannot be resolved safely.
                _ => return None,
            }
        }
        Some(resolved)
    }

    /// Whether `target` is contained in some allow-listed root.
    ///
    /// Failure to resolve is reported as "not allowed", never as an error;
    /// callers surface a uniform access-denied message.
    #[must_use]
    pub fn allowed(&self, target: &Path) -> bool {
        let Some(resolved) = self.resolve(target) else {
            return false;
        };
        self.roots.iter().any(|root| resolved.strip_prefix(root).is_ok())
    }
}
