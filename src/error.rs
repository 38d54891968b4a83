//! Error types for folioqp.

use thiserror::Error;

/// Error type for folioqp operations.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Reformulation mode outside `{dense, sparse}`.
    #[error("unsupported reformulation {0:?}: expected \"dense\" or \"sparse\"")]
    UnsupportedReformulation(String),

    /// Backend name with no registered solver adapter.
    #[error("unsupported solver backend {0:?}")]
    UnsupportedSolver(String),

    /// Inconsistent matrix shapes.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    /// Data that is well-shaped but outside its value domain.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type for folioqp operations.
pub type Result<T> = std::result::Result<T, FolioError>;
