//! HTML rendering of the browsing page.

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::listing::DirectoryEntry;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; padding: 0 1rem; }
h1 { font-size: 1.3rem; word-break: break-all; }
table { border-collapse: collapse; width: 100%; }
td { padding: .35rem .5rem; border-bottom: 1px solid #eee; }
td.actions { text-align: right; white-space: nowrap; }
td.actions a { margin-left: .75rem; }
a { color: #0b62d6; text-decoration: none; }
a:hover { text-decoration: underline; }
.empty { color: #888; font-style: italic; }
button { margin-top: 1rem; padding: .4rem 1rem; }
"#;

/// Render the listing page for `relative_dir` (empty for the shared root).
pub fn render_listing(relative_dir: &str, entries: &[DirectoryEntry]) -> Markup {
    let heading = format!("/{}", relative_dir);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "lanshare: " (heading) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Index of " (heading) }
                @if let Some(parent) = parent_of(relative_dir) {
                    p { a href=(listing_url(&parent)) { "⬆ Parent directory" } }
                }
                form method="post" action="/download_selected" {
                    input type="hidden" name="directory" value=(relative_dir);
                    table {
                        @if entries.is_empty() {
                            tr { td .empty { "This directory is empty." } }
                        }
                        @for entry in entries {
                            (entry_row(relative_dir, entry))
                        }
                    }
                    @if entries.iter().any(|e| !e.is_dir) {
                        button type="submit" { "Download selected" }
                    }
                }
            }
        }
    }
}

fn entry_row(relative_dir: &str, entry: &DirectoryEntry) -> Markup {
    let child = join_relative(relative_dir, &entry.name);

    html! {
        tr {
            td {
                @if !entry.is_dir {
                    input type="checkbox" name="selected_files" value=(entry.name);
                }
            }
            @if entry.is_dir {
                td { a href=(listing_url(&child)) { "📁 " (entry.name) "/" } }
                td .actions {
                    a href=(action_url("/download_folder", relative_dir, "foldername", &entry.name)) {
                        "Download folder"
                    }
                }
            } @else {
                td { "📄 " (entry.name) }
                td .actions {
                    @if entry.is_previewable {
                        a href=(action_url("/preview", relative_dir, "filename", &entry.name)) target="_blank" {
                            "Preview"
                        }
                    }
                    a href=(action_url("/download", relative_dir, "filename", &entry.name)) {
                        "Download"
                    }
                }
            }
        }
    }
}

fn listing_url(relative_dir: &str) -> String {
    if relative_dir.is_empty() {
        return "/".to_string();
    }
    format!("/?directory={}", urlencoding::encode(relative_dir))
}

fn action_url(path: &str, relative_dir: &str, key: &str, name: &str) -> String {
    format!(
        "{}?directory={}&{}={}",
        path,
        urlencoding::encode(relative_dir),
        key,
        urlencoding::encode(name)
    )
}

fn join_relative(relative_dir: &str, name: &str) -> String {
    if relative_dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", relative_dir, name)
    }
}

/// Parent of a `/`-separated relative directory; `None` at the root.
fn parent_of(relative_dir: &str) -> Option<String> {
    if relative_dir.is_empty() {
        return None;
    }
    Some(
        relative_dir
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default(),
    )
}
