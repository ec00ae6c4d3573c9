//! On-demand zip archives.
//!
//! Two shapes are supported: a flat selection of names from one directory and
//! a whole subfolder walked recursively. Both are compressed with deflate into
//! an anonymous temp file, which is then streamed back as a single attachment.

use std::collections::HashSet;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tempfile::tempfile;
use tokio_util::io::ReaderStream;
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::ArchiveConfig;
use crate::error::FileServerError;
use crate::guard;
use crate::responder::{Disposition, content_disposition};

pub const SELECTION_ARCHIVE_NAME: &str = "selected_files.zip";

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveLimits {
    pub max_bytes: u64,
    pub max_entries: u64,
}

impl ArchiveLimits {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            max_entries: config.max_entries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory on disk and the name it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

/// Zip the selected `names` from `dir` into `selected_files.zip`.
///
/// Names that do not exist are skipped. An empty selection is rejected before
/// any archive work starts.
pub async fn archive_selection(
    root: &Path,
    dir: &Path,
    names: Vec<String>,
    limits: ArchiveLimits,
) -> Result<Response, FileServerError> {
    let names: Vec<String> = names.into_iter().filter(|n| !n.trim().is_empty()).collect();
    if names.is_empty() {
        return Err(FileServerError::bad_request("No files selected."));
    }

    let entries = selection_entries(root, dir, &names)?;
    debug!(
        "Archiving {} of {} selected entries from {}",
        entries.len(),
        names.len(),
        dir.display()
    );

    let (file, size) = build_archive_file(entries, limits).await?;
    Ok(zip_response(file, size, SELECTION_ARCHIVE_NAME))
}

/// Zip every file below `dir/foldername` into `<foldername>.zip`, keeping the
/// folder's internal layout.
pub async fn archive_folder(
    root: &Path,
    dir: &Path,
    foldername: Option<&str>,
    limits: ArchiveLimits,
) -> Result<Response, FileServerError> {
    let foldername = match foldername.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(FileServerError::bad_request("Folder name not specified.")),
    };

    let folder = guard::resolve_entry(root, dir, foldername)?;
    if !folder.is_dir() {
        return Err(FileServerError::not_found("Folder not found."));
    }

    let base_name = archive_name(foldername)
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| folder.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "folder".to_string());
    let zip_name = format!("{}.zip", base_name);

    debug!("Archiving folder {} as {}", folder.display(), zip_name);

    let entries = tokio::task::spawn_blocking(move || folder_entries(&folder))
        .await??;
    let (file, size) = build_archive_file(entries, limits).await?;
    Ok(zip_response(file, size, &zip_name))
}

/// Resolve a selection into archive entries, dropping names that don't exist.
///
/// Names that collapse to the same archive path (`x.txt` twice, or `x.txt`
/// and `./x.txt`) are stored once. Names that collapse to nothing, such as
/// `.`, are skipped.
pub fn selection_entries(
    root: &Path,
    dir: &Path,
    names: &[String],
) -> Result<Vec<ArchiveEntry>, FileServerError> {
    let mut entries = Vec::with_capacity(names.len());
    let mut seen = HashSet::new();

    for name in names {
        let source = guard::resolve_entry(root, dir, name)?;
        let kind = if source.is_file() {
            EntryKind::File
        } else if source.is_dir() {
            EntryKind::Directory
        } else {
            debug!("Skipping missing selection entry: {}", name);
            continue;
        };

        let archived = archive_name(name);
        if archived.is_empty() {
            debug!("Skipping selection entry with no archive name: {}", name);
            continue;
        }
        if !seen.insert(archived.clone()) {
            debug!("Skipping duplicate selection entry: {}", name);
            continue;
        }

        entries.push(ArchiveEntry {
            source,
            name: archived,
            kind,
        });
    }

    Ok(entries)
}

/// Walk `folder` and list every file with its `/`-separated path relative to
/// `folder`. Symlinks are not followed.
pub fn folder_entries(folder: &Path) -> Result<Vec<ArchiveEntry>, FileServerError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(folder)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(ArchiveEntry {
            source: entry.into_path(),
            name: relative,
            kind: EntryKind::File,
        });
    }

    Ok(entries)
}

/// Reject the archive up front if it would exceed the configured limits.
pub fn enforce_limits(entries: &[ArchiveEntry], limits: ArchiveLimits) -> Result<(), FileServerError> {
    let mut total_bytes = 0u64;
    let mut total_entries = 0u64;

    for entry in entries {
        total_entries = total_entries.saturating_add(1);
        if entry.kind == EntryKind::File {
            let size = std::fs::metadata(&entry.source)?.len();
            total_bytes = total_bytes.saturating_add(size);
        }

        if limits.max_entries > 0 && total_entries > limits.max_entries {
            return Err(FileServerError::ArchiveTooManyEntries {
                entries: total_entries,
                limit: limits.max_entries,
            });
        }

        if limits.max_bytes > 0 && total_bytes > limits.max_bytes {
            return Err(FileServerError::ArchiveTooLarge {
                size: total_bytes,
                limit: limits.max_bytes,
            });
        }
    }

    Ok(())
}

/// Write `entries` as a deflate-compressed zip into `writer`.
///
/// A peer hang-up surfacing from the writer comes back as
/// [`FileServerError::ClientDisconnected`].
pub fn write_archive<W: Write + Seek>(writer: W, entries: &[ArchiveEntry]) -> Result<W, FileServerError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in entries {
        match entry.kind {
            EntryKind::File => {
                let mut input = std::fs::File::open(&entry.source)?;
                let large = input.metadata()?.len() >= u64::from(u32::MAX);
                zip.start_file(entry.name.as_str(), options.large_file(large))?;
                std::io::copy(&mut input, &mut zip)?;
            }
            EntryKind::Directory => {
                zip.add_directory(format!("{}/", entry.name), options)?;
            }
        }
    }

    Ok(zip.finish()?)
}

async fn build_archive_file(
    entries: Vec<ArchiveEntry>,
    limits: ArchiveLimits,
) -> Result<(tokio::fs::File, u64), FileServerError> {
    let (file, size) = tokio::task::spawn_blocking(move || {
        enforce_limits(&entries, limits)?;
        let mut file = write_archive(tempfile()?, &entries)?;
        file.flush()?;
        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        Ok::<_, FileServerError>((file, size))
    })
    .await??;

    Ok((tokio::fs::File::from_std(file), size))
}

fn zip_response(file: tokio::fs::File, size: u64, zip_name: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(Disposition::Attachment, zip_name),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

/// Normalize a caller-supplied name into a `/`-separated archive path.
fn archive_name(name: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts.join("/")
}
