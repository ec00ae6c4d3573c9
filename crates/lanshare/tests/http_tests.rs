//! HTTP integration tests.

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use lanshare::{AppState, Config};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipArchive;

/// A shared root laid out as:
///
/// ```text
/// share/
///   a.txt
///   b
///   blob.unknownext
///   x.txt
///   sub/
///     a/b.txt
/// ```
struct Fixture {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("share");
        fs::create_dir_all(root.join("sub/a")).unwrap();
        fs::write(root.join("a.txt"), "alpha").unwrap();
        fs::write(root.join("b"), "no extension").unwrap();
        fs::write(root.join("blob.unknownext"), "???").unwrap();
        fs::write(root.join("x.txt"), "x marks the spot").unwrap();
        fs::write(root.join("sub/a/b.txt"), "nested").unwrap();

        let root = root.canonicalize().unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    fn app(&self) -> Router {
        self.app_with(Config::default())
    }

    fn app_with(&self, config: Config) -> Router {
        lanshare::app(AppState::with_config(self.root.clone(), config))
    }
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .method(Method::GET)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn post_form(app: Router, uri: &str, form: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn disposition(response: &Response) -> String {
    response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string()
}

fn encode(path: &Path) -> String {
    urlencoding::encode(&path.to_string_lossy()).into_owned()
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["root"], fixture.root.display().to_string());
}

#[tokio::test]
async fn test_index_lists_root_by_default() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let page = body_text(response).await;
    assert!(page.contains("Index of /"));
    assert!(page.contains("/preview?directory=&amp;filename=a.txt"));
    assert!(!page.contains("/preview?directory=&amp;filename=b\""));
    assert!(page.contains("/download_folder?directory=&amp;foldername=sub"));
}

#[tokio::test]
async fn test_index_accepts_relative_and_absolute_directory() {
    let fixture = Fixture::new();

    let page = body_text(get(fixture.app(), "/?directory=sub").await).await;
    assert!(page.contains("Index of /sub"));
    assert!(page.contains("href=\"/?directory=sub%2Fa\""));

    let uri = format!("/?directory={}", encode(&fixture.root.join("sub")));
    let response = get(fixture.app(), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Index of /sub"));
}

#[tokio::test]
async fn test_index_escape_is_forbidden() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/?directory=../../etc").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "Access denied.");

    let response = get(fixture.app(), "/?directory=%2Fetc").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_index_missing_directory_is_not_found() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/?directory=nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_on_file_is_internal_error_with_message() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/?directory=a.txt").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_index_hides_dotfiles_when_configured() {
    let fixture = Fixture::new();
    fs::write(fixture.root.join(".secret"), "x").unwrap();

    let page = body_text(get(fixture.app(), "/").await).await;
    assert!(page.contains(".secret"));

    let mut config = Config::default();
    config.listing.show_hidden = false;
    let page = body_text(get(fixture.app_with(config), "/").await).await;
    assert!(!page.contains(".secret"));
}

// ============================================================================
// Download and preview
// ============================================================================

#[tokio::test]
async fn test_download_file() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/download?filename=a.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(disposition(&response).starts_with("attachment; filename=\"a.txt\""));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body_text(response).await, "alpha");
}

#[tokio::test]
async fn test_download_from_subdirectory() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/download?directory=sub%2Fa&filename=b.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "nested");
}

#[tokio::test]
async fn test_download_reads_current_content() {
    let fixture = Fixture::new();
    assert_eq!(
        body_text(get(fixture.app(), "/download?filename=a.txt").await).await,
        "alpha"
    );
    fs::write(fixture.root.join("a.txt"), "changed").unwrap();
    assert_eq!(
        body_text(get(fixture.app(), "/download?filename=a.txt").await).await,
        "changed"
    );
}

#[tokio::test]
async fn test_download_errors() {
    let fixture = Fixture::new();

    let response = get(fixture.app(), "/download").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(fixture.app(), "/download?filename=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(fixture.app(), "/download?filename=missing.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(fixture.app(), "/download?directory=../../etc&filename=passwd").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(fixture.app(), "/download?filename=..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_preview_file_inline() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/preview?filename=a.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert!(disposition(&response).starts_with("inline;"));
    assert_eq!(body_text(response).await, "alpha");
}

#[tokio::test]
async fn test_preview_unknown_type_is_bad_request() {
    let fixture = Fixture::new();
    for name in ["blob.unknownext", "b"] {
        let response = get(fixture.app(), &format!("/preview?filename={}", name)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_preview_errors() {
    let fixture = Fixture::new();

    let response = get(fixture.app(), "/preview").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(fixture.app(), "/preview?filename=ghost.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(fixture.app(), "/preview?directory=..&filename=a.txt").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Archives
// ============================================================================

#[tokio::test]
async fn test_download_selected_skips_missing() {
    let fixture = Fixture::new();
    let response = post_form(
        fixture.app(),
        "/download_selected",
        "directory=&selected_files=x.txt&selected_files=missing.txt",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert!(disposition(&response).contains("filename=\"selected_files.zip\""));

    let bytes = body_bytes(response).await;
    assert_eq!(zip_names(bytes.clone()), vec!["x.txt"]);

    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    archive
        .by_name("x.txt")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "x marks the spot");
}

#[tokio::test]
async fn test_download_selected_without_directory_field() {
    let fixture = Fixture::new();
    let response = post_form(
        fixture.app(),
        "/download_selected",
        "selected_files=a.txt&selected_files=x.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(zip_names(body_bytes(response).await), vec!["a.txt", "x.txt"]);
}

#[tokio::test]
async fn test_download_selected_repeated_names_are_stored_once() {
    let fixture = Fixture::new();
    let response = post_form(
        fixture.app(),
        "/download_selected",
        "selected_files=x.txt&selected_files=x.txt&selected_files=.%2Fx.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(zip_names(body_bytes(response).await), vec!["x.txt"]);
}

#[tokio::test]
async fn test_download_selected_current_directory_adds_no_entry() {
    let fixture = Fixture::new();
    let response = post_form(
        fixture.app(),
        "/download_selected",
        "selected_files=.&selected_files=a.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(zip_names(body_bytes(response).await), vec!["a.txt"]);
}

#[tokio::test]
async fn test_download_selected_empty_is_bad_request() {
    let fixture = Fixture::new();

    let response = post_form(fixture.app(), "/download_selected", "directory=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "No files selected.");

    let response = post_form(fixture.app(), "/download_selected", "").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_selected_escape_is_forbidden() {
    let fixture = Fixture::new();

    let response = post_form(
        fixture.app(),
        "/download_selected",
        "directory=..&selected_files=a.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_form(
        fixture.app(),
        "/download_selected",
        "selected_files=..%2F..%2Fetc%2Fpasswd",
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_folder_preserves_nesting() {
    let fixture = Fixture::new();
    let response = get(fixture.app(), "/download_folder?foldername=sub").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(disposition(&response).contains("filename=\"sub.zip\""));
    assert_eq!(zip_names(body_bytes(response).await), vec!["a/b.txt"]);
}

#[tokio::test]
async fn test_download_folder_errors() {
    let fixture = Fixture::new();

    let response = get(fixture.app(), "/download_folder?foldername=nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(fixture.app(), "/download_folder?foldername=a.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(fixture.app(), "/download_folder").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(fixture.app(), "/download_folder?directory=../..&foldername=etc").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_archive_limits_are_enforced() {
    let fixture = Fixture::new();
    let mut config = Config::default();
    config.archive.max_entries = 1;

    let response = post_form(
        fixture.app_with(config),
        "/download_selected",
        "selected_files=a.txt&selected_files=x.txt",
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_forbidden() {
    use std::os::unix::fs::symlink;

    let fixture = Fixture::new();
    let outside = TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), "secret").unwrap();
    symlink(outside.path(), fixture.root.join("escape")).unwrap();

    let response = get(fixture.app(), "/?directory=escape").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(fixture.app(), "/download?directory=escape&filename=secret.txt").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(fixture.app(), "/download_folder?foldername=escape").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_in_root_is_served_under_its_own_name() {
    use std::os::unix::fs::symlink;

    let fixture = Fixture::new();
    fs::write(fixture.root.join("data.bin2"), "linked").unwrap();
    symlink(fixture.root.join("data.bin2"), fixture.root.join("notes.txt")).unwrap();

    let page = body_text(get(fixture.app(), "/").await).await;
    assert!(page.contains("/preview?directory=&amp;filename=notes.txt"));

    let response = get(fixture.app(), "/preview?filename=notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_text(response).await, "linked");

    let response = get(fixture.app(), "/download?filename=notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(disposition(&response).contains("filename=\"notes.txt\""));
}
