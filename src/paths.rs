// src/paths.rs

//! Path helpers shared by the filter, the compiler adapter and the bundle host.

use std::path::{Component, Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slash_str(rel));
    }

    // macOS in particular hands out /private/var/... for /var/... paths.
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(slash_str(rel));
        }
    }

    None
}

/// Render a path with forward slashes regardless of platform.
pub fn slash_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Join `path` onto `base` when it is relative, then drop `.` and resolve
/// `..` lexically. Does not touch the filesystem.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_str_strips_root() {
        let rel = relative_str(Path::new("/proj/src"), Path::new("/proj/src/features/a.js"));
        assert_eq!(rel.as_deref(), Some("features/a.js"));
    }

    #[test]
    fn relative_str_rejects_unrelated_paths() {
        assert_eq!(
            relative_str(Path::new("/proj/src"), Path::new("/elsewhere/a.js")),
            None
        );
    }

    #[test]
    fn absolutize_resolves_dots() {
        let p = absolutize(Path::new("/proj/src"), Path::new("./lib/../runtime.js"));
        assert_eq!(p, PathBuf::from("/proj/src/runtime.js"));
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        let p = absolutize(Path::new("/proj"), Path::new("/abs/x.js"));
        assert_eq!(p, PathBuf::from("/abs/x.js"));
    }
}
