//! Storage error handling
//!
//! Every backend fault surfaces as a single `StorageError` carrying the
//! native failure kind and a description of the cause. Adapters rewrap
//! native errors at their boundary; nothing above them sees a
//! `rusqlite::Error` or a raw plugin code.

use std::fmt;

use thiserror::Error;

/// Native failure reasons, kept for diagnostics
///
/// The first six mirror the codes reported by the primitive key/value
/// plugin; the rest come from the relational backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeErrorKind {
    NativeWriteFailed,
    ItemNotFound,
    NullReference,
    UndefinedType,
    JsonError,
    WrongParameter,
    /// Database could not be opened
    OpenFailed,
    /// Statement execution failed
    QueryFailed,
    /// Multi-statement transaction failed
    TransactionFailed,
    /// Backend is not reachable (worker gone, lock poisoned)
    Unavailable,
}

impl NativeErrorKind {
    /// Numeric code used by the primitive plugin
    pub fn code(&self) -> Option<u8> {
        match self {
            NativeErrorKind::NativeWriteFailed => Some(1),
            NativeErrorKind::ItemNotFound => Some(2),
            NativeErrorKind::NullReference => Some(3),
            NativeErrorKind::UndefinedType => Some(4),
            NativeErrorKind::JsonError => Some(5),
            NativeErrorKind::WrongParameter => Some(6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeErrorKind::NativeWriteFailed => "NATIVE_WRITE_FAILED",
            NativeErrorKind::ItemNotFound => "ITEM_NOT_FOUND",
            NativeErrorKind::NullReference => "NULL_REFERENCE",
            NativeErrorKind::UndefinedType => "UNDEFINED_TYPE",
            NativeErrorKind::JsonError => "JSON_ERROR",
            NativeErrorKind::WrongParameter => "WRONG_PARAMETER",
            NativeErrorKind::OpenFailed => "OPEN_FAILED",
            NativeErrorKind::QueryFailed => "QUERY_FAILED",
            NativeErrorKind::TransactionFailed => "TRANSACTION_FAILED",
            NativeErrorKind::Unavailable => "UNAVAILABLE",
        }
    }
}

impl fmt::Display for NativeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by the primitive key/value plugin
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("native storage error {code}: {message}")]
pub struct NativeError {
    pub code: NativeErrorKind,
    pub message: String,
}

impl NativeError {
    pub fn new(code: NativeErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == NativeErrorKind::ItemNotFound
    }
}

/// The only error raised by the store
#[derive(Error, Debug)]
#[error("Local storage failed ({kind}): {cause}")]
pub struct StorageError {
    pub kind: NativeErrorKind,
    pub cause: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StorageError {
    pub fn new(kind: NativeErrorKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
            source: None,
        }
    }

    /// Wrap a lower-level error, keeping it as the source
    pub fn with_source<E>(kind: NativeErrorKind, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            cause: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Classify a rusqlite error raised while executing `kind` of work
    pub fn from_sql(kind: NativeErrorKind, error: rusqlite::Error) -> Self {
        Self::with_source(kind, error)
    }
}

impl From<NativeError> for StorageError {
    fn from(error: NativeError) -> Self {
        let kind = error.code;
        Self::with_source(kind, error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_source(NativeErrorKind::JsonError, error)
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::with_source(NativeErrorKind::Unavailable, error)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
