//! Path confinement.
//!
//! Every path that comes from a request goes through [`confine`] before the
//! filesystem is touched. The check runs in two stages:
//!
//! 1. Lexical: the candidate is joined onto the root (if relative), `.` and
//!    `..` are folded, and the result must still start with the root. A
//!    request like `../../etc` is rejected here before the candidate is
//!    ever looked up on disk.
//! 2. Symlinks: the longest existing prefix is canonicalized and the result
//!    must start with the canonical root, so a link pointing outside the root
//!    is rejected as well.
//!
//! Comparison is component-wise (`Path::starts_with`), so trailing
//! separators and `/root-sibling` style prefixes cannot pass. On
//! case-insensitive filesystems the lexical stage is case-sensitive, which can
//! only produce false rejections; canonicalization settles the rest.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::FileServerError;

/// Returns true if `candidate` resolves to `root` or something below it.
///
/// Relative candidates are interpreted relative to `root`.
pub fn is_safe(root: &Path, candidate: &Path) -> bool {
    confine(root, candidate).is_ok()
}

/// Resolve `candidate` against `root` and verify it stays inside.
///
/// Returns the resolved path (symlinks resolved for the part that exists).
/// The target itself does not need to exist.
pub fn confine(root: &Path, candidate: &Path) -> Result<PathBuf, FileServerError> {
    let given_root = normalize_lexically(root).ok_or(FileServerError::AccessDenied)?;
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(err) => {
            warn!("Shared root is not accessible: {}: {}", root.display(), err);
            return Err(FileServerError::AccessDenied);
        }
    };

    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    // Absolute candidates may spell the root either way (e.g. through a
    // symlinked parent); the canonical check below settles it.
    let normalized = normalize_lexically(&joined).ok_or(FileServerError::AccessDenied)?;
    let under_given_root = given_root.is_absolute() && normalized.starts_with(&given_root);
    if !normalized.starts_with(&root) && !under_given_root {
        warn!("Path escapes shared root: {:?}", candidate);
        return Err(FileServerError::AccessDenied);
    }

    let resolved = resolve_existing_prefix(&normalized).map_err(|err| {
        warn!("Could not resolve {:?}: {}", candidate, err);
        FileServerError::AccessDenied
    })?;
    if !resolved.starts_with(&root) {
        warn!(
            "Symlink escape attempt: {:?} resolved to {:?}",
            candidate, resolved
        );
        return Err(FileServerError::AccessDenied);
    }

    Ok(resolved)
}

/// Map the optional `directory` request parameter to a confined path.
///
/// Missing, empty and `.` mean the root itself. Absolute values must lie
/// under the root; relative values are taken relative to it.
pub fn resolve_directory(root: &Path, directory: Option<&str>) -> Result<PathBuf, FileServerError> {
    let directory = directory.map(str::trim).unwrap_or_default();
    if directory.is_empty() || directory == "." {
        return confine(root, Path::new(""));
    }
    confine(root, Path::new(directory))
}

/// Resolve a caller-supplied file or folder name inside an already confined
/// directory.
pub fn resolve_entry(root: &Path, dir: &Path, name: &str) -> Result<PathBuf, FileServerError> {
    if name.contains('\0') {
        return Err(FileServerError::AccessDenied);
    }
    confine(root, &dir.join(name))
}

/// Path of `path` relative to `root`, `/`-separated. Empty for the root.
pub fn relative_to_root(root: &Path, path: &Path) -> String {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    path.strip_prefix(&root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Fold `.` and `..` without touching the filesystem.
///
/// Returns `None` for paths containing a NUL byte.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => {
                if name.to_string_lossy().contains('\0') {
                    return None;
                }
                out.push(name);
            }
        }
    }
    Some(out)
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for name in missing.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let Some(name) = existing.file_name() else {
                    return Err(err);
                };
                missing.push(name.to_os_string());
                existing.pop();
            }
            Err(err) => return Err(err),
        }
    }
}
