//! Shared primitives for all Rust crates in qatrail.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across qatrail crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant; safe to retry after correction.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state; caller must re-read
    /// current state before retrying.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller identity is missing or unreadable.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is identified but their role does not permit the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Underlying storage is temporarily unavailable; safe to retry with
    /// backoff. No partial writes are visible when this is returned.
    #[error("transient store error: {0}")]
    Transient(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
