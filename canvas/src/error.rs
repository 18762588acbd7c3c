//! Error taxonomy for graph mutations.
//!
//! Structural errors are returned synchronously by the mutating operation and
//! leave the graph untouched. Rendering anomalies (dangling connections) and
//! out-of-range view parameters are not errors: they are skipped or clamped.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A partial update was malformed: unknown field, wrong type, or bad value.
    #[error("invalid block update: {0}")]
    Validation(String),
    /// An operation referenced a block that does not exist.
    #[error("unknown block: {0}")]
    InvalidReference(Uuid),
}

/// Grepable error code for hosts that surface errors as toasts or logs.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

impl ErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::InvalidReference(_) => "E_INVALID_REFERENCE",
        }
    }
}
