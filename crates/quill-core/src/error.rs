//! Error types for quill

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for quill
#[derive(Debug, Error)]
pub enum QuillError {
    /// Input failed validation (bad dates, out-of-range scores, missing text)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Post not found
    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// Comment not found
    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    /// Category not found
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Author not found
    #[error("Author not found: {0}")]
    AuthorNotFound(String),

    /// Stored data violates a structural invariant (cyclic or cross-post replies)
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Retryable failure at the storage or analyzer boundary
    #[error("Transient error: {0}")]
    Transient(String),

    /// Optimistic write lost against a concurrent writer
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QuillError>,
    },
}

/// Coarse classification used by callers to pick a propagation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DataIntegrity,
    Transient,
    Conflict,
    Internal,
}

impl QuillError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QuillError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through any context wrappers
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuillError::Validation(_) => ErrorKind::Validation,
            QuillError::PostNotFound(_)
            | QuillError::CommentNotFound(_)
            | QuillError::CategoryNotFound(_)
            | QuillError::AuthorNotFound(_)
            | QuillError::FileNotFound(_) => ErrorKind::NotFound,
            QuillError::DataIntegrity(_) => ErrorKind::DataIntegrity,
            QuillError::Transient(_) => ErrorKind::Transient,
            QuillError::Conflict(_) => ErrorKind::Conflict,
            QuillError::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::WouldBlock
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted => ErrorKind::Transient,
                _ => ErrorKind::Internal,
            },
            QuillError::Serde(_) | QuillError::Toml(_) | QuillError::Config(_) => {
                ErrorKind::Internal
            }
            QuillError::WithContext { source, .. } => source.kind(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::Conflict)
    }
}

/// Result type alias for quill
pub type Result<T> = std::result::Result<T, QuillError>;
