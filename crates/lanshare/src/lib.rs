//! Share a directory over the local network.
//!
//! Every request is confined to a single shared root (see [`guard`]). On top
//! of that the crate offers directory listings, single-file download and
//! preview, and zip archives of a selection or a whole subfolder. It can be
//! run as the `lanshare` binary or embedded through [`app`].

pub mod archive;
pub mod banner;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod listing;
pub mod page;
pub mod responder;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::FileServerError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared root, canonical and fixed for the process lifetime
    pub root_dir: PathBuf,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState with the given root directory and default config.
    pub fn new(root_dir: PathBuf) -> Self {
        Self::with_config(root_dir, Config::default())
    }

    /// Create a new AppState with the given root directory and config.
    pub fn with_config(root_dir: PathBuf, config: Config) -> Self {
        Self {
            root_dir,
            config: Arc::new(config),
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::file_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
