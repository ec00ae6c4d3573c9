//! HTTP handlers.
//!
//! Each handler confines the `directory` parameter first, then hands off to
//! the component that does the work. Errors are mapped to status codes by
//! [`FileServerError`]'s `IntoResponse` impl.

use axum::{
    Json,
    extract::{Query, State},
    response::{Html, Response},
};
use axum_extra::extract::Form;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AppState;
use crate::archive::{self, ArchiveLimits};
use crate::error::FileServerError;
use crate::guard;
use crate::listing;
use crate::page;
use crate::responder;

/// Query parameters for the listing page
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Directory to list (relative to the shared root, or absolute under it)
    pub directory: Option<String>,
}

/// Query parameters for download and preview
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub directory: Option<String>,
    pub filename: Option<String>,
}

/// Query parameters for whole-folder archives
#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub directory: Option<String>,
    pub foldername: Option<String>,
}

/// Form body for selection archives; `selected_files` repeats once per file.
#[derive(Debug, Deserialize)]
pub struct SelectionForm {
    pub directory: Option<String>,
    #[serde(default)]
    pub selected_files: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub root: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        root: state.root_dir.display().to_string(),
    })
}

/// GET / - Render the listing page for a directory
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, FileServerError> {
    let dir = guard::resolve_directory(&state.root_dir, query.directory.as_deref())?;
    let show_hidden = state.config.listing.show_hidden;

    debug!("Listing directory: {}", dir.display());

    let listing_dir = dir.clone();
    let entries =
        tokio::task::spawn_blocking(move || listing::list_directory(&listing_dir, show_hidden))
            .await??;

    let relative = guard::relative_to_root(&state.root_dir, &dir);
    Ok(Html(page::render_listing(&relative, &entries).into_string()))
}

/// GET /download - Send a file as an attachment
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FileServerError> {
    let dir = guard::resolve_directory(&state.root_dir, query.directory.as_deref())?;
    responder::download(&state.root_dir, &dir, query.filename.as_deref()).await
}

/// GET /preview - Send a file inline with its media type
pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<Response, FileServerError> {
    let dir = guard::resolve_directory(&state.root_dir, query.directory.as_deref())?;
    responder::preview(&state.root_dir, &dir, query.filename.as_deref()).await
}

/// POST /download_selected - Zip the checked files of one directory
pub async fn download_selected(
    State(state): State<AppState>,
    Form(form): Form<SelectionForm>,
) -> Result<Response, FileServerError> {
    let dir = guard::resolve_directory(&state.root_dir, form.directory.as_deref())?;
    let limits = ArchiveLimits::from_config(&state.config.archive);
    archive::archive_selection(&state.root_dir, &dir, form.selected_files, limits).await
}

/// GET /download_folder - Zip a subfolder recursively
pub async fn download_folder(
    State(state): State<AppState>,
    Query(query): Query<FolderQuery>,
) -> Result<Response, FileServerError> {
    let dir = guard::resolve_directory(&state.root_dir, query.directory.as_deref())?;
    let limits = ArchiveLimits::from_config(&state.config.archive);
    archive::archive_folder(&state.root_dir, &dir, query.foldername.as_deref(), limits).await
}
