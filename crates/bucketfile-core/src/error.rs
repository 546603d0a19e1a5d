//! Error types module
//!
//! Every failed file-service call surfaces exactly one `FileServiceError`. Provider
//! failures are wrapped once at the operation boundary; callers tell them apart
//! only through the error kind and message.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Machine-readable classification of a `FileServiceError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The object targeted by delete/download/presign does not exist
    NotFound,
    /// The caller supplied a request that cannot be stored (e.g. no file extension)
    InvalidData,
    /// Provider, transport or any other failure
    UnexpectedState,
    /// The adapter could not be constructed from its configuration
    InvalidConfig,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidData => "invalid_data",
            ErrorKind::UnexpectedState => "unexpected_state",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidData(String),

    #[error("{0}")]
    UnexpectedState(String),

    #[error("Invalid file service configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for file-service operations
pub type FileServiceResult<T> = Result<T, FileServiceError>;

/// Message used for every failed existence precondition
pub const NOT_FOUND_MESSAGE: &str = "Not found file.";

impl FileServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileServiceError::NotFound(_) => ErrorKind::NotFound,
            FileServiceError::InvalidData(_) => ErrorKind::InvalidData,
            FileServiceError::UnexpectedState(_) => ErrorKind::UnexpectedState,
            FileServiceError::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// The standard NOT_FOUND error raised by existence checks
    pub fn not_found() -> Self {
        FileServiceError::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    /// Wrap an underlying error as UNEXPECTED_STATE.
    ///
    /// The message reads `"{context}: {source}"`. When the source renders as an
    /// empty string the bare `context` is used instead.
    pub fn unexpected(context: &str, source: impl Display) -> Self {
        let detail = source.to_string();
        if detail.trim().is_empty() {
            FileServiceError::UnexpectedState(context.to_string())
        } else {
            FileServiceError::UnexpectedState(format!("{}: {}", context, detail))
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FileServiceError::NotFound(msg)
            | FileServiceError::InvalidData(msg)
            | FileServiceError::UnexpectedState(msg)
            | FileServiceError::InvalidConfig(msg) => msg,
        }
    }
}
