//! Workflow failures, classified for callers.

use serde::Serialize;

use crate::storage::StorageError;

/// Why a workflow operation was refused or failed.
///
/// Everything except [`WorkflowError::Storage`] is detected before any
/// write happens.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing or malformed input, or an unresolvable project reference.
    #[error("{0}")]
    BadRequest(String),

    /// No caller identity.
    #[error("{0}")]
    Unauthorized(String),

    /// Wrong role, or not the identity assigned to that role.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Status precondition violated, duplicate report, or nothing to seal under.
    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(StorageError),

    /// Unreadable or invalid configuration. An operator fault, not the caller's.
    #[error("{0}")]
    Config(String),

    /// A result could not be written out.
    #[error("output failure: {0}")]
    Output(#[from] serde_json::Error),
}

/// The failure classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServerError,
}

/// What a caller sees when an operation fails.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) | Self::Config(_) | Self::Output(_) => ErrorKind::ServerError,
        }
    }

    /// The caller-facing body. Storage and output internals are never exposed;
    /// config faults name the file so the operator can fix it.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            Self::Storage(_) | Self::Output(_) => "server error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            error: self.kind(),
            message,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::ServerError => 1,
            ErrorKind::BadRequest => 2,
            ErrorKind::Unauthorized => 3,
            ErrorKind::Forbidden => 4,
            ErrorKind::NotFound => 5,
            ErrorKind::Conflict => 6,
        }
    }
}

impl From<StorageError> for WorkflowError {
    /// Conditional-write refusals map back to caller errors; anything else
    /// is a server error.
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ReportNotFound(_) => Self::NotFound("Report not found".to_string()),
            StorageError::DuplicateReport { .. } => {
                Self::Conflict("A report already exists for this project and date".to_string())
            }
            StorageError::StatusMismatch { .. } => Self::Conflict(err.to_string()),
            other => Self::Storage(other),
        }
    }
}
