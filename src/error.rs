//! Structured error types for tree operations.

use serde::Serialize;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Write refused
    NotMutable,
    PersistenceDisabled,

    // Reload refused
    ShapeMismatch,
    InvalidSkeleton,

    // Addressing errors
    KeyNotFound,
    IndexOutOfRange,
    InvalidKey,
    NotANode,
    WrongContainer,

    // Backing store / conversion errors
    StoreError,
    DeserializeError,
}

/// Errors raised by the configuration tree.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Value {path} is immutable")]
    NotMutable { path: String },

    #[error("Cannot reload {path}: expected {expected} but store has {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Persistence is disabled for {name}")]
    PersistenceDisabled { name: String },

    #[error("Store returned {found}, expected a mapping or a sequence")]
    InvalidSkeleton { found: &'static str },

    #[error("Key not found: {path}")]
    KeyNotFound { path: String },

    #[error("Index {index} out of range for {path} (len {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Invalid sequence index '{key}' in {path}")]
    InvalidKey { path: String, key: String },

    #[error("{path} is a scalar, not a node")]
    NotANode { path: String },

    #[error("Cannot apply {op} to {path}: it is a {found}")]
    WrongContainer {
        path: String,
        op: &'static str,
        found: &'static str,
    },

    /// Errors from `load`, `dump` or `stamp`, passed through unmodified.
    #[error(transparent)]
    Store(#[from] anyhow::Error),

    #[error("Failed to deserialize value: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Error {
    pub fn not_mutable(path: impl Into<String>) -> Self {
        Self::NotMutable { path: path.into() }
    }

    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound { path: path.into() }
    }

    pub fn not_a_node(path: impl Into<String>) -> Self {
        Self::NotANode { path: path.into() }
    }

    /// The programmatic code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotMutable { .. } => ErrorCode::NotMutable,
            Error::ShapeMismatch { .. } => ErrorCode::ShapeMismatch,
            Error::PersistenceDisabled { .. } => ErrorCode::PersistenceDisabled,
            Error::InvalidSkeleton { .. } => ErrorCode::InvalidSkeleton,
            Error::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            Error::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
            Error::InvalidKey { .. } => ErrorCode::InvalidKey,
            Error::NotANode { .. } => ErrorCode::NotANode,
            Error::WrongContainer { .. } => ErrorCode::WrongContainer,
            Error::Store(_) => ErrorCode::StoreError,
            Error::Deserialize(_) => ErrorCode::DeserializeError,
        }
    }
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;
