//! Manifest-relative path handling.
//!
//! Manifest paths are POSIX-style (`/` separated), relative, and
//! case-preserving. These helpers convert between them and native paths and
//! refuse anything that would escape the managed root.

use anyhow::{Result, bail};
use std::path::{Component, Path, PathBuf};

/// Convert `path` (under `root`) to a forward-slash relative string.
///
/// Returns `None` when `path` is not inside `root` or is not valid UTF-8.
#[must_use]
pub fn to_posix_relative(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Whether a manifest path is a plain relative path with no `..`, no empty
/// segments, no backslashes and no drive or root prefix.
#[must_use]
pub fn is_safe_relative(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') || path.contains(':') {
        return false;
    }
    path.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Join a manifest-relative path onto `root`, rejecting unsafe paths.
pub fn join_relative(root: &Path, path: &str) -> Result<PathBuf> {
    if !is_safe_relative(path) {
        bail!("Refusing unsafe relative path: {path}");
    }
    Ok(path.split('/').fold(root.to_path_buf(), |acc, segment| acc.join(segment)))
}
