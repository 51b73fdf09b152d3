use crate::{
    files::FilesError, pagination::PaginationError, refresh::RefreshError, store::StoreError,
    upstream::UpstreamError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// Crate-level error, mapped onto HTTP status codes at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum ReelcastError {
    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ReelcastError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReelcastError::Unauthorized => StatusCode::UNAUTHORIZED,
            ReelcastError::Validation(_) => StatusCode::BAD_REQUEST,
            ReelcastError::NotFound(_) => StatusCode::NOT_FOUND,
            ReelcastError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ReelcastError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReelcastError::Refresh(RefreshError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ReelcastError::Refresh(_) => StatusCode::BAD_GATEWAY,
            ReelcastError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PaginationError> for ReelcastError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::PageOutOfRange { .. } => ReelcastError::NotFound(err.to_string()),
            PaginationError::InvalidPage | PaginationError::InvalidLimit(_) => {
                ReelcastError::Validation(err.to_string())
            }
        }
    }
}

impl From<FilesError> for ReelcastError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotJson | FilesError::InvalidJson(_) => {
                ReelcastError::Validation(err.to_string())
            }
            // Traversal attempts are reported exactly like missing files
            FilesError::NotFound => ReelcastError::NotFound("File not found".to_string()),
            FilesError::Listing(_) => ReelcastError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for ReelcastError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ReelcastError>;
