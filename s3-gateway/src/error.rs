//! Error types and their HTTP translation.
//!
//! `StorageError` is what the storage wrapper raises. Each error belongs to
//! exactly one `ErrorKind`, and each kind maps to exactly one status code.
//! `ApiError` carries the status, a client-safe message and the request
//! path, and renders the JSON body every failing endpoint returns.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::BackendError;

/// Message returned for a blank or missing object key
pub const BLANK_KEY_MESSAGE: &str = "Key cannot be null or empty";

/// Message returned when an upload is missing, unnamed or empty
pub const INVALID_FILE_MESSAGE: &str = "File is not valid";

/// Message returned when the query string cannot be parsed
pub const INVALID_QUERY_MESSAGE: &str = "Invalid query parameters";

/// Message returned for failures that must not leak detail
pub const UNEXPECTED_MESSAGE: &str = "Unexpected error";

/// Failure categories, each with a single HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    UploadFailure,
    DeletionFailure,
    StorageFailure,
    Unexpected,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::UploadFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::DeletionFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors raised by the storage wrapper
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unable to upload file: {key}")]
    Upload {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("Unable to delete file: {key}")]
    Deletion {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to download file: {key}")]
    Download {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("Storage client unavailable: {0}")]
    Connect(#[source] BackendError),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Upload { .. } => ErrorKind::UploadFailure,
            StorageError::Deletion { .. } => ErrorKind::DeletionFailure,
            StorageError::Download { .. } => ErrorKind::StorageFailure,
            StorageError::Connect(_) => ErrorKind::Unexpected,
        }
    }
}

/// Error body shared by every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

/// An error on its way out of a handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    path: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, path: impl Into<String>) -> Self {
        let message = match kind {
            ErrorKind::Unexpected => UNEXPECTED_MESSAGE.to_string(),
            _ => message.into(),
        };
        Self {
            status: kind.status_code(),
            message,
            path: path.into(),
        }
    }

    /// Upload missing, without a filename, or empty
    pub fn invalid_file(path: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, INVALID_FILE_MESSAGE, path)
    }

    pub fn from_storage(err: StorageError, path: impl Into<String>) -> Self {
        let kind = err.kind();
        if kind.status_code().is_server_error() {
            // Backend detail goes to the log only
            tracing::error!(error = ?err, "Storage operation failed");
        } else {
            tracing::debug!(error = %err, "Storage request rejected");
        }
        Self::new(kind, err.to_string(), path)
    }

    /// Body could not be read as multipart, e.g. the size limit was hit
    pub fn from_multipart(err: MultipartError, path: impl Into<String>) -> Self {
        tracing::warn!(error = %err, "Failed to read multipart body");
        Self {
            status: err.status(),
            message: err.body_text(),
            path: path.into(),
        }
    }

    /// Request was not multipart/form-data at all
    pub fn from_rejection(rejection: MultipartRejection, path: impl Into<String>) -> Self {
        tracing::debug!(error = %rejection, "Rejected non-multipart upload");
        Self {
            status: rejection.status(),
            message: INVALID_FILE_MESSAGE.to_string(),
            path: path.into(),
        }
    }

    /// Query string did not parse, e.g. a repeated `key`
    pub fn from_query(rejection: QueryRejection, path: impl Into<String>) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        Self::new(ErrorKind::InvalidArgument, INVALID_QUERY_MESSAGE, path)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status.as_u16(),
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.message.clone(),
            path: self.path.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn backend_failure() -> BackendError {
        BackendError::Backend("connection reset; secret=hunter2".to_string())
    }

    #[test]
    fn test_status_mapping_table() {
        let cases = [
            (StorageError::InvalidArgument("Key cannot be null or empty".into()), 400),
            (StorageError::NotFound("a.txt".into()), 404),
            (StorageError::Upload { key: "a.txt".into(), source: backend_failure() }, 500),
            (StorageError::Deletion { key: "a.txt".into(), source: backend_failure() }, 500),
            (StorageError::Download { key: "a.txt".into(), source: backend_failure() }, 500),
            (StorageError::Connect(backend_failure()), 500),
        ];

        for (err, status) in cases {
            assert_eq!(err.kind().status_code().as_u16(), status, "{:?}", err);
        }
    }

    #[test]
    fn test_messages_hide_backend_detail() {
        let err = StorageError::Upload {
            key: "report.pdf".into(),
            source: backend_failure(),
        };
        let api = ApiError::from_storage(err, "/s3/create");

        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "Unable to upload file: report.pdf");
        assert!(!api.message().contains("hunter2"));
    }

    #[test]
    fn test_unexpected_is_generic() {
        let api = ApiError::from_storage(StorageError::Connect(backend_failure()), "/s3/read");
        assert_eq!(
            api.to_body(),
            ErrorBody {
                status: 500,
                error: "Internal Server Error".to_string(),
                message: UNEXPECTED_MESSAGE.to_string(),
                path: "/s3/read".to_string(),
            }
        );
    }

    #[test]
    fn test_not_found_body() {
        let api = ApiError::from_storage(StorageError::NotFound("missing.png".into()), "/s3/read");
        assert_eq!(
            api.to_body(),
            ErrorBody {
                status: 404,
                error: "Not Found".to_string(),
                message: "File not found: missing.png".to_string(),
                path: "/s3/read".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_file() {
        let body = ApiError::invalid_file("/s3/create").to_body();
        assert_eq!(body.status, 400);
        assert_eq!(body.error, "Bad Request");
        assert_eq!(body.message, INVALID_FILE_MESSAGE);
    }
}
