//! Single-file responses: forced download and inline preview.

use std::path::Path;

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::FileServerError;
use crate::guard;
use crate::listing::detect_media_type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Browser saves the body as a file.
    Attachment,
    /// Browser renders the body in place.
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        }
    }
}

/// Build a `Content-Disposition` value that survives non-ASCII names.
///
/// The quoted `filename` is an ASCII fallback; `filename*` carries the real
/// name percent-encoded as UTF-8.
pub fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        fallback,
        urlencoding::encode(file_name)
    )
}

/// Serve `filename` from `dir` as an attachment. Always revalidates.
pub async fn download(root: &Path, dir: &Path, filename: Option<&str>) -> Result<Response, FileServerError> {
    let filename = require_filename(filename)?;
    let path = guard::resolve_entry(root, dir, filename)?;

    let mime = detect_media_type(filename)
        .map(|m| m.to_string())
        .unwrap_or_else(|| mime_guess::mime::APPLICATION_OCTET_STREAM.to_string());

    debug!("Downloading file: {}", path.display());
    let name = display_name(filename, &path);
    stream_file(&path, &name, mime, Disposition::Attachment, Some("no-cache")).await
}

/// Serve `filename` from `dir` inline with its detected media type.
///
/// The type comes from the requested name, not from a symlink's target, so
/// it agrees with the listing. Files whose type cannot be determined are
/// refused with a 400.
pub async fn preview(root: &Path, dir: &Path, filename: Option<&str>) -> Result<Response, FileServerError> {
    let filename = require_filename(filename)?;
    let path = guard::resolve_entry(root, dir, filename)?;

    let Some(mime) = detect_media_type(filename) else {
        return Err(FileServerError::bad_request(
            "Unable to determine file type for preview.",
        ));
    };

    debug!("Previewing file: {} as {}", path.display(), mime);
    let name = display_name(filename, &path);
    stream_file(&path, &name, mime.to_string(), Disposition::Inline, None).await
}

fn require_filename(filename: Option<&str>) -> Result<&str, FileServerError> {
    match filename {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(FileServerError::bad_request("Filename not specified.")),
    }
}

/// Name shown to the client: the last component of what was asked for.
fn display_name(filename: &str, resolved: &Path) -> String {
    Path::new(filename)
        .file_name()
        .or_else(|| resolved.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string())
}

async fn stream_file(
    path: &Path,
    name: &str,
    content_type: String,
    disposition: Disposition,
    cache_control: Option<&'static str>,
) -> Result<Response, FileServerError> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FileServerError::not_found("File not found."),
            _ => err.into(),
        })?;
    if !metadata.is_file() {
        return Err(FileServerError::not_found("File not found."));
    }

    let file = fs::File::open(path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, metadata.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(disposition, name),
            ),
        ],
        body,
    )
        .into_response();

    if let Some(cache_control) = cache_control {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static(cache_control),
        );
    }

    Ok(response)
}
