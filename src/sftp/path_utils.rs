//! Path helpers for SFTP operations
//!
//! Remote SFTP paths always use `/` (even against Windows servers); local
//! paths use the platform separator via `PathBuf`.

use std::path::{Path, PathBuf};

/// Join remote SFTP path components using `/` separator.
pub fn join_remote_path(base: &str, component: &str) -> String {
    if base.is_empty() {
        component.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// Directory part of a remote path, `path.Dir` style.
///
/// - `/home/a/file` → `/home/a`
/// - `/file` → `/`
/// - `file` → `.`
pub fn remote_parent(path: &str) -> String {
    let trimmed = trim_trailing_slashes(path);
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trim_trailing_slashes(&trimmed[..idx]).to_string(),
        None if path.starts_with('/') => "/".to_string(),
        None => ".".to_string(),
    }
}

/// Last component of a remote path, `None` for `/`, `""`, `.` and `..`
pub fn remote_base_name(path: &str) -> Option<&str> {
    let trimmed = trim_trailing_slashes(path);
    let name = match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    };
    match name {
        "" | "." | ".." => None,
        n => Some(n),
    }
}

/// Sibling path for a rename: the directory of `old_path` joined with `new_name`
pub fn sibling_path(old_path: &str, new_name: &str) -> String {
    let parent = remote_parent(old_path);
    if parent == "." {
        new_name.to_string()
    } else {
        join_remote_path(&parent, new_name)
    }
}

/// Convert a local-style path to remote form (`\` → `/`)
pub fn to_remote_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join a local directory and a file name with the platform separator
pub fn join_local_path(base: &Path, component: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    path.push(component);
    path
}

fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}
