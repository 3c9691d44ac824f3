use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("Source object not found: {key}")]
    ObjectNotFound { key: String },

    /// Optimistic transition lock lost: another worker already advanced the
    /// document. Not a user-facing failure; the losing attempt aborts cleanly.
    #[error("Transition conflict for document {document_id}: expected {expected}, found {actual}")]
    Conflict {
        document_id: String,
        expected: String,
        actual: String,
    },

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("Object storage error")]
    Storage(#[from] StorageError),

    #[error("Document conversion failed")]
    Convert(#[from] ConvertError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

/// Object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Access denied: {key}")]
    AccessDenied { key: String },

    #[error("Invalid object key: {key}")]
    InvalidKey { key: String },

    #[error("Storage I/O error")]
    Io(#[source] std::io::Error),

    #[error("Storage backend error (status {status}): {message}")]
    Backend { status: u16, message: String },
}

impl StorageError {
    /// Whether a retry can reasonably be expected to succeed.
    ///
    /// Missing objects and denied access are input problems; I/O failures,
    /// throttling, and 5xx responses are collaborator problems.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::NotFound { .. }
            | StorageError::AccessDenied { .. }
            | StorageError::InvalidKey { .. } => false,
            StorageError::Io(_) => true,
            StorageError::Backend { status, .. } => *status == 429 || *status >= 500,
        }
    }

    pub fn from_io(err: std::io::Error, key: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound {
                key: key.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => StorageError::AccessDenied {
                key: key.to_string(),
            },
            _ => StorageError::Io(err),
        }
    }
}

/// Conversion service errors
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Connection failed to converter at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Converter rejected input (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Converter unavailable (status {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Invalid response from converter")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },

    #[error("Unsupported file format: {format}")]
    UnsupportedFormat { format: String },
}

impl ConvertError {
    pub fn is_transient(&self) -> bool {
        match self {
            ConvertError::Connection { .. }
            | ConvertError::Unavailable { .. }
            // A garbled body from the converter is its fault, not the input's.
            | ConvertError::InvalidResponse { .. } => true,
            ConvertError::Rejected { .. } | ConvertError::UnsupportedFormat { .. } => false,
        }
    }
}

impl ServiceError {
    /// Classify a processing failure for the retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Storage(e) => e.is_transient(),
            ServiceError::Convert(e) => e.is_transient(),
            // Local database hiccups should not burn a document permanently.
            ServiceError::Database(_) => true,
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DocumentNotFound { .. } | ServiceError::ObjectNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Convert(ConvertError::UnsupportedFormat { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServiceError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Convert(ConvertError::Connection { .. })
            | ServiceError::Convert(ConvertError::Unavailable { .. }) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::DocumentNotFound { .. } => "document_not_found",
            ServiceError::ObjectNotFound { .. } => "object_not_found",
            ServiceError::Conflict { .. } => "transition_conflict",
            ServiceError::Database(_) => "database_error",
            ServiceError::Storage(StorageError::NotFound { .. }) => "storage_object_not_found",
            ServiceError::Storage(StorageError::AccessDenied { .. }) => "storage_access_denied",
            ServiceError::Storage(_) => "storage_error",
            ServiceError::Convert(ConvertError::Rejected { .. }) => "converter_rejected",
            ServiceError::Convert(ConvertError::UnsupportedFormat { .. }) => "unsupported_format",
            ServiceError::Convert(_) => "converter_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
