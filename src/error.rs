use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::Path;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request path could not be percent-decoded.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Resource not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem metadata could not be read.
    #[error("Access error: {0}")]
    Access(String),

    /// Feed could not be encoded as XML.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify a filesystem error on `path`.
    pub fn from_fs(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(path.display().to_string()),
            _ => AppError::Access(format!("{}: {}", path.display(), err)),
        }
    }

    /// HTTP status the transport reports for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_client_error() {
            tracing::warn!(error = %self, "Request rejected");
        } else {
            tracing::error!(error = %self, "Request error");
        }

        (status, self.to_string()).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
