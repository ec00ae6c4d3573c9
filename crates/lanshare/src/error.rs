use std::io::ErrorKind;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum FileServerError {
    /// The requested path resolves outside the shared root. The message never
    /// says whether the target exists.
    #[error("Access denied.")]
    AccessDenied,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The peer went away while we were producing the response.
    #[error("client disconnected")]
    ClientDisconnected,

    #[error("Archive too large: {size} bytes exceeds limit of {limit} bytes")]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("Archive has too many entries: {entries} exceeds limit of {limit}")]
    ArchiveTooManyEntries { entries: u64, limit: u64 },

    #[error("{0}")]
    Io(std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl FileServerError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ClientDisconnected => StatusCode::NO_CONTENT,
            Self::ArchiveTooLarge { .. } | Self::ArchiveTooManyEntries { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Io(_) | Self::Archive(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Returns true for the error kinds a socket produces when the peer hangs up.
pub fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

impl From<std::io::Error> for FileServerError {
    fn from(err: std::io::Error) -> Self {
        if is_disconnect(err.kind()) {
            return Self::ClientDisconnected;
        }
        if err.kind() == ErrorKind::NotFound {
            return Self::NotFound(err.to_string());
        }
        Self::Io(err)
    }
}

impl From<zip::result::ZipError> for FileServerError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => io.into(),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for FileServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Io(std::io::Error::other(err.to_string()))
    }
}

impl IntoResponse for FileServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::ClientDisconnected => {
                debug!("Client disconnected before the response completed");
                return StatusCode::NO_CONTENT.into_response();
            }
            Self::AccessDenied => debug!("Rejected request outside shared root"),
            _ if status.is_server_error() => error!("Request failed: {}", self),
            _ => debug!("Request rejected ({}): {}", status, self),
        }

        (status, self.to_string()).into_response()
    }
}
