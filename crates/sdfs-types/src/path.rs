//! Sandbox path rules.
//!
//! Sandbox paths are absolute, `/`-separated strings where `/` is the root of
//! the exposed filesystem. They never name anything outside the sandbox:
//! [`normalize`] clamps `..` at the root, and [`to_host`] / [`from_host`]
//! translate between sandbox paths and a host directory that backs them.
//!
//! Canonical form has no trailing separator (except the root itself) and no
//! `.` / `..` / empty segments.

use std::path::{Component, Path, PathBuf};

/// Path separator.
pub const SEPARATOR: char = '/';

/// The sandbox root.
pub const ROOT: &str = "/";

const SELF_REFERENCE: &str = ".";
const PARENT_REFERENCE: &str = "..";

/// Returns true if the path starts at the root.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Returns true if the path is exactly the root.
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Path-level validity: no embedded NULs, no backslashes.
///
/// The empty path and the root are always valid.
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || is_root(path) {
        return true;
    }
    !path.contains('\0') && !path.contains('\\')
}

/// Name-level validity for a single leaf segment.
///
/// A name must be non-empty, must not contain a separator, and must not be
/// `.` or `..`.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.contains(SEPARATOR) {
        return false;
    }
    if name == SELF_REFERENCE || name == PARENT_REFERENCE {
        return false;
    }
    is_valid_path(name)
}

/// Returns true if `child` lies strictly below `parent` (at any depth).
///
/// Both paths are compared as given; normalize them first if they may carry
/// `.` or `..` segments.
pub fn is_parent_of(parent: &str, child: &str) -> bool {
    if is_root(parent) {
        return is_absolute(child) && !is_root(child);
    }
    if parent.len() >= child.len() || !child.starts_with(parent) {
        return false;
    }
    child[parent.len()..].starts_with(SEPARATOR)
}

/// Non-empty segments of a path, in order.
pub fn split(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Canonicalize a path: make it absolute, drop `.` and empty segments, resolve
/// `..` (never above the root), strip any trailing separator.
pub fn normalize(path: &str) -> String {
    let mut canonical: Vec<&str> = Vec::new();
    for segment in split(path) {
        match segment {
            SELF_REFERENCE => {}
            PARENT_REFERENCE => {
                canonical.pop();
            }
            other => canonical.push(other),
        }
    }
    if canonical.is_empty() {
        return ROOT.to_string();
    }
    let mut result = String::with_capacity(path.len() + 1);
    for segment in canonical {
        result.push(SEPARATOR);
        result.push_str(segment);
    }
    result
}

/// Append a relative segment to a directory path.
pub fn join(parent: &str, name: &str) -> String {
    let name = name.trim_start_matches(SEPARATOR);
    if parent.ends_with(SEPARATOR) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Resolve a possibly-relative path against an absolute base directory.
pub fn absolutize(path: &str, base: &str) -> String {
    if is_absolute(path) {
        normalize(path)
    } else {
        normalize(&join(base, path))
    }
}

/// The containing directory. The parent of the root is the root.
pub fn parent(path: &str) -> String {
    let canonical = normalize(path);
    match canonical.rfind(SEPARATOR) {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => canonical[..idx].to_string(),
    }
}

/// The leaf segment. The root has the empty name.
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
        .rsplit(SEPARATOR)
        .next()
        .unwrap_or("")
}

/// Map a sandbox path onto the host directory `base`.
///
/// The path is normalized first, so the result is always `base` or below it.
pub fn to_host(base: &Path, path: &str) -> PathBuf {
    let mut host = base.to_path_buf();
    for segment in split(&normalize(path)) {
        host.push(segment);
    }
    host
}

/// Map a host path back into the sandbox rooted at `base`.
///
/// Returns `None` if `host` is not `base` or below it, or if any component is
/// not valid UTF-8.
pub fn from_host(base: &Path, host: &Path) -> Option<String> {
    let relative = host.strip_prefix(base).ok()?;
    let mut inner = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                inner.push(SEPARATOR);
                inner.push_str(segment.to_str()?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if inner.is_empty() {
        inner.push_str(ROOT);
    }
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_absolute_and_root() {
        assert!(is_absolute("/"));
        assert!(is_absolute("/a/b"));
        assert!(!is_absolute("a/b"));
        assert!(is_root("/"));
        assert!(!is_root("/a"));
    }

    #[test]
    fn test_valid_path() {
        assert!(is_valid_path(""));
        assert!(is_valid_path("/"));
        assert!(is_valid_path("/a/b.txt"));
        assert!(!is_valid_path("/a\\b"));
        assert!(!is_valid_path("/a\0b"));
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("b.txt"));
        assert!(is_valid_name("..hidden"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("a/b"));
        assert!(!is_valid_name("a\\b"));
    }

    #[test]
    fn test_is_parent_of() {
        assert!(is_parent_of("/a", "/a/b"));
        assert!(is_parent_of("/a", "/a/b/c"));
        assert!(is_parent_of("/", "/a"));
        assert!(!is_parent_of("/", "/"));
        assert!(!is_parent_of("/a", "/a"));
        assert!(!is_parent_of("/a", "/ab"));
        assert!(!is_parent_of("/a/b", "/a"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/a/./b/"), "/a/b");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/../../x"), "/x");
        assert_eq!(normalize("a//b"), "/a/b");
    }

    #[test]
    fn test_join_and_absolutize() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(join("/a/", "b"), "/a/b");
        assert_eq!(absolutize("c", "/a/b"), "/a/b/c");
        assert_eq!(absolutize("../c", "/a/b"), "/a/c");
        assert_eq!(absolutize("/x/y", "/a/b"), "/x/y");
    }

    #[test]
    fn test_parent_and_leaf() {
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/a"), "/");
        assert_eq!(parent("/a/b.txt"), "/a");
        assert_eq!(leaf_name("/"), "");
        assert_eq!(leaf_name("/a/b.txt"), "b.txt");
        assert_eq!(leaf_name("/a/dir/"), "dir");
    }

    #[test]
    fn test_host_mapping() {
        let base = Path::new("/srv/card");
        assert_eq!(to_host(base, "/"), PathBuf::from("/srv/card"));
        assert_eq!(to_host(base, "/a/b"), PathBuf::from("/srv/card/a/b"));
        assert_eq!(to_host(base, "/../../etc"), PathBuf::from("/srv/card/etc"));

        assert_eq!(from_host(base, Path::new("/srv/card")).as_deref(), Some("/"));
        assert_eq!(
            from_host(base, Path::new("/srv/card/a/b")).as_deref(),
            Some("/a/b")
        );
        assert_eq!(from_host(base, Path::new("/srv/other")), None);
    }
}
