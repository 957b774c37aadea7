//! Error types for the file store and the HTTP layer

use hyper::StatusCode;
use thiserror::Error;

/// Boxed error carried by a failing upload stream
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a failed [`FileStore`](crate::storage::FileStore) operation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upload stream failed: {0}")]
    Source(#[source] BoxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request failures, one variant per response status
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Plain-text body sent to the client
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad Request\n",
            Self::Conflict(_) => "Conflict\n",
            Self::NotFound(_) => "File not found\n",
            Self::Internal(_) => "Internal Server Error\n",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(_) | StoreError::Source(_) => Self::BadRequest(err.to_string()),
            StoreError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<multer::Error> for ApiError {
    fn from(err: multer::Error) -> Self {
        Self::BadRequest(format!("Malformed multipart body: {err}"))
    }
}
