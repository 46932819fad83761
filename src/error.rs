//! Error taxonomy for the ingestion pipeline.
//!
//! Every failure is fatal: no stage retries or recovers, and a run either
//! produces both output artifacts or neither.

use thiserror::Error;

/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Source transport file is unreadable, malformed, or not a recognized format.
    #[error("failed to read source file: {message}")]
    SourceRead { message: String },

    /// A row batch arrived with a column set that differs from the first batch.
    #[error("column set changed between chunks: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Column name and type sequences diverged in length. Indicates a
    /// programming defect; never expected in normal operation.
    #[error("column names and types are misaligned: {names} name(s) against {types} type(s)")]
    ShapeMismatch { names: usize, types: usize },

    /// An intermediate artifact is missing, truncated, or unwritable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tabular artifact could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Create a SourceRead error.
    pub fn source_read(message: impl Into<String>) -> Self {
        Self::SourceRead {
            message: message.into(),
        }
    }
}
