//! Unified error handling for the tourlog library.
//!
//! One error type covers the whole crate. Callers that sit behind an HTTP
//! layer rely on the distinction between [`Error::NotFound`] and
//! [`Error::Forbidden`] to keep their 404/403 split, so the two are never
//! collapsed into each other.

use thiserror::Error;

/// Unified error type for tourlog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed a semantic check. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A lookup by id found nothing.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// The viewer may not read or modify the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Record store I/O failure.
    #[error("store error: {0}")]
    Store(#[from] std::io::Error),

    /// Record (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Shorthand for a [`Error::NotFound`] on a record kind and id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with a formatted message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Error::Forbidden(message.into())
    }
}

/// Result type alias for tourlog operations.
pub type Result<T> = std::result::Result<T, Error>;
