//! Error taxonomy for the ingestion, ranking and validation core.
//!
//! | Variant | Meaning | Caller policy |
//! |---------|---------|---------------|
//! | [`RagError::Configuration`] | embedder/generator has no credential or endpoint | fatal, never retried |
//! | [`RagError::Extraction`] | unreadable or corrupt document | fatal, surfaced as-is |
//! | [`RagError::Infrastructure`] | lexical operator unsupported by the store | retry once vector-only |
//! | [`RagError::DimensionMismatch`] | embedding length differs from the corpus | fatal |
//! | [`RagError::Capability`] | embedder/generator call failed at runtime | fatal to the caller |
//! | [`RagError::Storage`] | persistence failure | fatal |
//!
//! Validator sub-scorer failures never surface here: they are recorded as
//! [`Degradation`](crate::validate::Degradation) values on the report.

use thiserror::Error;

/// Extraction failures. Extraction never partially succeeds.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("no extractable text in {0}")]
    Empty(String),
}

/// Main error type for library operations.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("lexical search unavailable: {0}")]
    Infrastructure(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("capability call failed: {0}")]
    Capability(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    /// True for failures the ranking caller may recover from by retrying
    /// without the lexical signal.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, RagError::Infrastructure(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, RagError::Configuration(_))
    }
}

impl From<sqlx::Error> for RagError {
    fn from(e: sqlx::Error) -> Self {
        RagError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(e: reqwest::Error) -> Self {
        RagError::Capability(e.to_string())
    }
}

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, RagError>;
