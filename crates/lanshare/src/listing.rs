//! Directory listings.

use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::Path;

use mime_guess::Mime;
use serde::Serialize;

use crate::error::FileServerError;

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_previewable: bool,
}

/// Guess a media type from the file name. `None` means the type is unknown.
pub fn detect_media_type(name: impl AsRef<Path>) -> Option<Mime> {
    mime_guess::from_path(name).first()
}

/// List the immediate children of `dir`.
///
/// Directories come first, then files; each group is ordered by
/// case-insensitive name. Entries starting with `.` are skipped unless
/// `show_hidden` is set.
pub fn list_directory(dir: &Path, show_hidden: bool) -> Result<Vec<DirectoryEntry>, FileServerError> {
    let entries = std::fs::read_dir(dir).map_err(|err| match err.kind() {
        ErrorKind::NotFound => FileServerError::not_found("Directory not found."),
        _ => err.into(),
    })?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        if !show_hidden && name.starts_with('.') {
            continue;
        }

        // Follow symlinks so a link to a directory lists as one.
        let is_dir = entry.path().is_dir();
        let is_previewable = !is_dir && detect_media_type(&name).is_some();

        listing.push(DirectoryEntry {
            name,
            is_dir,
            is_previewable,
        });
    }

    listing.sort_by(compare_entries);
    Ok(listing)
}

fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
