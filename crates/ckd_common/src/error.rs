//! Error types for the CKD pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CkdError {
    #[error("Invalid input for field '{field}': '{value}' is not a number")]
    InvalidInput { field: String, value: String },

    #[error("Unknown category for field '{field}': '{value}'")]
    UnknownCategory { field: String, value: String },

    #[error("Missing input for field '{field}'")]
    MissingField { field: String },

    #[error("Schema mismatch: missing columns {missing:?}, unexpected columns {unexpected:?}")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Unknown class code: {0}")]
    UnknownClassCode(i64),

    #[error("Failed to load model from {origin}: {reason}")]
    ModelLoad { origin: String, reason: String },

    #[error("Invalid model artifact: {0}")]
    InvalidModel(String),
}

impl CkdError {
    pub fn code(&self) -> i32 {
        match self {
            CkdError::InvalidInput { .. } => -32010,
            CkdError::UnknownCategory { .. } => -32011,
            CkdError::MissingField { .. } => -32012,
            CkdError::SchemaMismatch { .. } => -32013,
            CkdError::UnknownClassCode(_) => -32014,
            CkdError::ModelLoad { .. } => -32020,
            CkdError::InvalidModel(_) => -32021,
        }
    }

    /// Field the error refers to, for per-field reporting.
    pub fn field(&self) -> Option<&str> {
        match self {
            CkdError::InvalidInput { field, .. }
            | CkdError::UnknownCategory { field, .. }
            | CkdError::MissingField { field } => Some(field),
            _ => None,
        }
    }

    /// Fatal errors end the session; everything else is scoped to one request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CkdError::ModelLoad { .. } | CkdError::InvalidModel(_))
    }

    pub(crate) fn model_load(origin: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        CkdError::ModelLoad {
            origin: origin.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CkdError>;
